//! Time source for read timestamps and the unread cutoff.

use crate::Score;
use std::sync::atomic::{AtomicI64, Ordering};

/// Supplies "now" in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> Score;
}

/// Wall clock backed by `chrono`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> Score {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: Score) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: Score) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: Score) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> Score {
        self.now.load(Ordering::SeqCst)
    }
}
