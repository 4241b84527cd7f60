//! Unread resolution configuration.

use serde::Deserialize;

use super::types::default_true;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Largest accepted `cutoff_days` (one hundred years).
pub const MAX_CUTOFF_DAYS: i64 = 36_500;

/// Unread resolution configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UnreadConfig {
    /// Topics whose last activity is older than this many days are not
    /// considered recent. Non-positive values fall back to 2.
    #[serde(default = "default_cutoff_days")]
    pub cutoff_days: i64,
    /// Candidate cap applied before per-topic permission checks.
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    /// Push fresh unread counts to the user after a mutation changed state.
    #[serde(default = "default_true")]
    pub push_on_mark: bool,
    /// Re-check unread verdicts in `has_read_topics` against posts from
    /// blocked authors. `true` matches the forum's historical read-status
    /// behaviour; the default skips the extra post lookups.
    #[serde(default)]
    pub block_aware_read_status: bool,
}

impl UnreadConfig {
    /// Cutoff days with the fallback applied.
    pub fn effective_cutoff_days(&self) -> i64 {
        if self.cutoff_days > 0 {
            self.cutoff_days
        } else {
            default_cutoff_days()
        }
    }

    /// The unread cutoff timestamp relative to `now` (epoch millis).
    pub fn cutoff_from(&self, now: i64) -> i64 {
        now.saturating_sub(self.effective_cutoff_days().saturating_mul(MILLIS_PER_DAY))
    }
}

impl Default for UnreadConfig {
    fn default() -> Self {
        Self {
            cutoff_days: default_cutoff_days(),
            max_candidates: default_max_candidates(),
            push_on_mark: true,
            block_aware_read_status: false,
        }
    }
}

fn default_cutoff_days() -> i64 {
    2
}

fn default_max_candidates() -> usize {
    200
}
