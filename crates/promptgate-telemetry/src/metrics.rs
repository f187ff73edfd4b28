//! Decision metrics
//!
//! Thin helpers over the `metrics` facade. Nothing is recorded unless a
//! recorder (normally the Prometheus exporter) has been installed.

use promptgate_core::Action;
use std::time::Duration;

pub const REQUESTS_TOTAL: &str = "promptgate_requests_total";
pub const DECISIONS_TOTAL: &str = "promptgate_decisions_total";
pub const EVALUATION_LATENCY_US: &str = "promptgate_evaluation_latency_us";
pub const RELOADS_TOTAL: &str = "promptgate_reloads_total";
pub const ERRORS_TOTAL: &str = "promptgate_errors_total";

/// Front-end that received a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adapter {
    Http,
    Icap,
}

impl Adapter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Icap => "icap",
        }
    }
}

/// Register metric descriptions with the installed recorder
pub fn describe() {
    metrics::describe_counter!(REQUESTS_TOTAL, "Total number of requests received by adapter");
    metrics::describe_counter!(
        DECISIONS_TOTAL,
        "Total number of moderation decisions by adapter and action"
    );
    metrics::describe_histogram!(
        EVALUATION_LATENCY_US,
        metrics::Unit::Microseconds,
        "Policy evaluation latency in microseconds by adapter"
    );
    metrics::describe_counter!(RELOADS_TOTAL, "Policy reload attempts by outcome");
    metrics::describe_counter!(ERRORS_TOTAL, "Total number of errors by adapter and kind");
}

pub fn record_request(adapter: Adapter) {
    metrics::counter!(REQUESTS_TOTAL, "adapter" => adapter.as_str()).increment(1);
}

/// Count one decision and its evaluation latency
pub fn record_decision(adapter: Adapter, action: Action, latency: Duration) {
    metrics::counter!(
        DECISIONS_TOTAL,
        "adapter" => adapter.as_str(),
        "action" => action.as_str()
    )
    .increment(1);
    metrics::histogram!(EVALUATION_LATENCY_US, "adapter" => adapter.as_str())
        .record(latency.as_micros() as f64);
}

pub fn record_reload(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!(RELOADS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_error(adapter: Adapter, kind: &'static str) {
    metrics::counter!(ERRORS_TOTAL, "adapter" => adapter.as_str(), "kind" => kind).increment(1);
}
