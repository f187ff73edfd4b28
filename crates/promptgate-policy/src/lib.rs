//! PromptGate Policy Engine
//!
//! Loads the moderation policy from disk, compiles it into an immutable
//! snapshot and evaluates prompts against it.
//!
//! Evaluation order is fixed:
//! 1. Hard blocks (length, banned keywords)
//! 2. Semantic similarity against banned phrases, when enabled
//! 3. PII redaction
//! 4. Allow
//!
//! The policy file can be reloaded at runtime; an invalid file is rejected
//! and the previous policy keeps serving.

pub mod block;
pub mod config;
pub mod engine;
pub mod store;

pub use block::BlockGate;
pub use config::{PolicyConfig, RedactionToggles, SemanticBlockingConfig};
pub use engine::PolicyEngine;
pub use store::{load, ActivePolicy, RuleStore};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::PolicyConfig;
    pub use crate::engine::PolicyEngine;
    pub use crate::store::{ActivePolicy, RuleStore};
}
