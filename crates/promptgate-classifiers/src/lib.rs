//! PromptGate Classifiers
//!
//! Text checks used by the policy engine, ordered by cost:
//! - Keyword matching (Aho-Corasick, case-insensitive)
//! - PII redaction rules (regex, fixed placeholders)
//! - Semantic similarity against banned phrases (external embedding provider)
//!
//! Keyword and redaction checks are pure and synchronous. The semantic gate
//! is async because it calls out to an embedding provider, and it fails open
//! when that provider is unavailable.

pub mod embedding;
pub mod keywords;
pub mod redaction;
pub mod semantic;

pub use embedding::{
    cosine_similarity, EmbeddingClient, EmbeddingProvider, HashEmbedder, HttpEmbeddingProvider,
};
pub use keywords::KeywordMatcher;
pub use redaction::{RedactionKind, RedactionOutcome, RedactionPipeline, RedactionRule};
pub use semantic::{SemanticGate, SemanticVerdict};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::embedding::{EmbeddingClient, EmbeddingProvider};
    pub use crate::keywords::KeywordMatcher;
    pub use crate::redaction::{RedactionKind, RedactionPipeline};
    pub use crate::semantic::{SemanticGate, SemanticVerdict};
}
