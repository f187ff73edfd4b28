//! PromptGate Core
//!
//! Core types and error handling shared across PromptGate components.
//!
//! This crate provides:
//! - The moderation [`Decision`] and its [`Action`]
//! - Immutable [`HistoryEntry`] records for the audit buffer
//! - Error types and result handling

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Action, Decision, HistoryEntry};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{Action, Decision, HistoryEntry};
}
