//! Metrics and observability utilities
//!
//! Prometheus metrics for the shelter service, described once at startup
//! and recorded through the `metrics` facade.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all shelter metrics
pub const METRICS_PREFIX: &str = "shelter";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001, // 1ms
    0.005, // 5ms
    0.010, // 10ms
    0.025, // 25ms
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_application_transitions_total", METRICS_PREFIX),
        Unit::Count,
        "Adoption application status changes"
    );

    describe_counter!(
        format!("{}_task_mutations_total", METRICS_PREFIX),
        Unit::Count,
        "Animal task creates and status moves"
    );

    describe_counter!(
        format!("{}_outcomes_total", METRICS_PREFIX),
        Unit::Count,
        "Recorded animal outcomes"
    );

    describe_counter!(
        format!("{}_likes_total", METRICS_PREFIX),
        Unit::Count,
        "Pet like additions and removals"
    );

    describe_counter!(
        format!("{}_cache_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Total view cache hits"
    );

    describe_counter!(
        format!("{}_cache_misses_total", METRICS_PREFIX),
        Unit::Count,
        "Total view cache misses"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

pub fn record_application_transition(from: &str, to: &str) {
    counter!(
        format!("{}_application_transitions_total", METRICS_PREFIX),
        "from" => from.to_string(),
        "to" => to.to_string()
    )
    .increment(1);
}

pub fn record_task_mutation(action: &'static str, status: &str) {
    counter!(
        format!("{}_task_mutations_total", METRICS_PREFIX),
        "action" => action,
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_outcome(outcome_type: &str) {
    counter!(
        format!("{}_outcomes_total", METRICS_PREFIX),
        "type" => outcome_type.to_string()
    )
    .increment(1);
}

/// `changed` is false for an idempotent repeat
pub fn record_like(action: &'static str, changed: bool) {
    counter!(
        format!("{}_likes_total", METRICS_PREFIX),
        "action" => action,
        "changed" => changed.to_string()
    )
    .increment(1);
}

/// Helper to record cache metrics
pub fn record_cache(hit: bool, view: &str) {
    if hit {
        counter!(
            format!("{}_cache_hits_total", METRICS_PREFIX),
            "view" => view.to_string()
        )
        .increment(1);
    } else {
        counter!(
            format!("{}_cache_misses_total", METRICS_PREFIX),
            "view" => view.to_string()
        )
        .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_recorders_without_exporter() {
        // No recorder installed: calls are no-ops
        let metrics = RequestMetrics::start("POST", "/v1/applications");
        metrics.finish(201);
        record_application_transition("PENDING", "REVIEWING");
        record_like("create", false);
        record_cache(true, "pets");
    }
}
