//! Prometheus metrics collection for topic-unread.
//!
//! Metrics are no-ops until [`init`] has been called, so library users that
//! do not scrape Prometheus pay nothing beyond a `OnceLock` check.
//!
//! - `unread_operation_total{operation}` - Operations executed by name
//! - `unread_operation_duration_seconds{operation}` - Operation latency histogram
//! - `unread_operation_errors_total{operation,error}` - Failed operations by error code
//! - `unread_topics_marked_read_total` - Topics whose read score advanced
//! - `unread_candidate_set_size` - Candidates surviving the merge stage

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

/// Operations executed by name.
pub static OPERATION_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();

/// Operation latency by name.
pub static OPERATION_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Operation failures by name and error code.
pub static OPERATION_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Topics whose read score was advanced.
pub static TOPICS_MARKED_READ: OnceLock<IntCounter> = OnceLock::new();

/// Size of the merged candidate set before filter narrowing.
pub static CANDIDATE_SET_SIZE: OnceLock<Histogram> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Safe to call more than once; later calls leave existing metrics in place.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            if $metric.get().is_none() {
                match $init {
                    Ok(m) => {
                        if let Err(e) = r.register(Box::new(m.clone())) {
                            tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                        }
                        let _ = $metric.set(m);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                    }
                }
            }
        };
    }

    register!(OPERATION_COUNTER, IntCounterVec::new(Opts::new("unread_operation_total", "Unread operations executed"), &["operation"]));
    register!(OPERATION_LATENCY, HistogramVec::new(
        HistogramOpts::new("unread_operation_duration_seconds", "Unread operation latency")
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["operation"]));
    register!(OPERATION_ERRORS, IntCounterVec::new(Opts::new("unread_operation_errors_total", "Unread operation failures"), &["operation", "error"]));
    register!(TOPICS_MARKED_READ, IntCounter::new("unread_topics_marked_read_total", "Topics marked read"));
    register!(CANDIDATE_SET_SIZE, Histogram::with_opts(
        HistogramOpts::new("unread_candidate_set_size", "Unread candidates after merge and dedupe")
            .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 200.0, 500.0, 1000.0])));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

/// Record an operation execution with latency.
#[inline]
pub fn record_operation(operation: &str, duration_secs: f64) {
    if let Some(c) = OPERATION_COUNTER.get() {
        c.with_label_values(&[operation]).inc();
    }
    if let Some(h) = OPERATION_LATENCY.get() {
        h.with_label_values(&[operation]).observe(duration_secs);
    }
}

/// Record an operation failure.
#[inline]
pub fn record_operation_error(operation: &str, error: &str) {
    if let Some(c) = OPERATION_ERRORS.get() {
        c.with_label_values(&[operation, error]).inc();
    }
}

#[inline]
pub fn record_marked_read(count: usize) {
    if let Some(c) = TOPICS_MARKED_READ.get() {
        c.inc_by(count as u64);
    }
}

#[inline]
pub fn record_candidates(count: usize) {
    if let Some(h) = CANDIDATE_SET_SIZE.get() {
        h.observe(count as f64);
    }
}
