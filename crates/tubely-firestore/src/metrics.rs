//! Firestore metrics collection.
//!
//! Request counters by operation and status, plus latency histograms.

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Total Firestore requests by operation and status.
    pub const REQUESTS_TOTAL: &str = "firestore_requests_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "firestore_latency_seconds";

    /// Updates rejected because the document changed since it was read.
    pub const PRECONDITION_FAILURES_TOTAL: &str = "firestore_precondition_failures_total";
}

/// Record metrics for a completed Firestore request.
pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

pub fn record_precondition_failure(collection: &str) {
    counter!(
        names::PRECONDITION_FAILURES_TOTAL,
        "collection" => collection.to_string()
    )
    .increment(1);
}
