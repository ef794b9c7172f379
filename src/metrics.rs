//! Prometheus metrics for gate observability.
//!
//! # Available Metrics
//!
//! ## Counters
//! - `keygate_decisions_total` - Gate outcomes (label: outcome)
//! - `keygate_rejected_patterns_total` - Path patterns dropped at startup (label: list)
//!
//! ## Histograms
//! - `keygate_request_duration_seconds` - Downstream latency for forwarded
//!   requests (labels: outcome, status)
//!
//! Recording functions are no-ops until a recorder is installed, so the gate
//! can be used without the exporter.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const DECISIONS_TOTAL: &str = "keygate_decisions_total";
    pub const REJECTED_PATTERNS_TOTAL: &str = "keygate_rejected_patterns_total";
    pub const REQUEST_DURATION_SECONDS: &str = "keygate_request_duration_seconds";
}

/// Initialize the Prometheus metrics exporter on `metrics_addr`.
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::DECISIONS_TOTAL,
        "Total number of requests classified by the API key gate"
    );
    describe_counter!(
        names::REJECTED_PATTERNS_TOTAL,
        "Total number of path patterns dropped because they failed to compile"
    );
    describe_histogram!(
        names::REQUEST_DURATION_SECONDS,
        "Downstream duration in seconds for requests the gate forwarded"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

/// Record one gate decision.
pub fn record_gate_decision(outcome: &'static str) {
    counter!(names::DECISIONS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record path patterns dropped while compiling `list`.
pub fn record_rejected_patterns(list: &'static str, count: u64) {
    if count > 0 {
        counter!(names::REJECTED_PATTERNS_TOTAL, "list" => list).increment(count);
    }
}

/// Record downstream duration for a forwarded request.
pub fn record_request_duration(outcome: &'static str, status: &str, duration_secs: f64) {
    histogram!(names::REQUEST_DURATION_SECONDS, "outcome" => outcome, "status" => status.to_string())
        .record(duration_secs);
}
