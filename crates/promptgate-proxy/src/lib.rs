//! PromptGate Proxy
//!
//! Network front-ends for the moderation engine. One [`PolicyEngine`] and
//! one [`HistoryLog`] are shared by:
//!
//! - an HTTP/JSON gateway (`/mitigate`, `/reload`, `/history`)
//! - a single-shot, line-oriented ICAP-style TCP gateway
//!
//! [`PolicyEngine`]: promptgate_policy::PolicyEngine
//! [`HistoryLog`]: promptgate_telemetry::HistoryLog

pub mod config;
pub mod icap;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{ConfigOverrides, ServerConfig};
pub use icap::IcapGateway;
pub use routes::create_router;
pub use server::Gateways;
pub use state::AppState;
