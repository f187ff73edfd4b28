//! PromptGate Telemetry
//!
//! Audit history and metrics for PromptGate.
//!
//! Provides:
//! - A bounded, thread-safe history of recent decisions
//! - Prometheus-compatible decision, latency, reload and error metrics

pub mod history;
pub mod metrics;

pub use history::HistoryLog;
pub use metrics::Adapter;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::history::HistoryLog;
    pub use crate::metrics::Adapter;
}
