//! Telemetry utilities for operation timing and tracing spans.

use std::time::Instant;

/// Guard for timing an operation and recording metrics.
///
/// Records operation latency when dropped.
pub struct OperationTimer {
    operation: &'static str,
    start: Instant,
}

impl OperationTimer {
    /// Start timing an operation.
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }

    /// Record a failure of the timed operation.
    pub fn fail(&self, error_code: &str) {
        crate::metrics::record_operation_error(self.operation, error_code);
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_operation(self.operation, duration);
    }
}

/// Standardized span constructors for unread operations.
pub mod spans {
    use crate::{Tid, Uid};
    use tracing::{Span, info_span};

    /// Span for a read-only query on behalf of `uid`.
    pub fn query(operation: &'static str, uid: Uid, filter: &str) -> Span {
        info_span!("unread_query", operation = operation, uid = uid, filter = %filter)
    }

    /// Span for a read-state mutation.
    pub fn mutation(operation: &'static str, uid: Uid, tids: usize) -> Span {
        info_span!("unread_mutation", operation = operation, uid = uid, tids = tids)
    }

    /// Span for an operation scoped to one topic rather than one user.
    pub fn topic(operation: &'static str, tid: Tid) -> Span {
        info_span!("unread_topic", operation = operation, tid = tid)
    }
}
