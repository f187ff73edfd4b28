//! Semantic similarity gate
//!
//! Blocks prompts whose embedding is close to any banned phrase. Banned
//! phrases are embedded once when the gate is built and cached; each check
//! embeds only the prompt.
//!
//! The gate fails open: if the provider is missing, errors, or times out,
//! the prompt is treated as a non-match with score 0.0 and a warning is
//! logged. This favours availability over false positives; the keyword and
//! length checks still apply regardless.

use crate::embedding::{cosine_similarity, EmbeddingClient};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a similarity check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SemanticVerdict {
    pub blocked: bool,

    /// Highest cosine similarity against any banned phrase
    pub score: f32,
}

impl SemanticVerdict {
    /// Non-match used whenever the provider cannot answer
    pub const FAIL_OPEN: SemanticVerdict = SemanticVerdict {
        blocked: false,
        score: 0.0,
    };

    /// Reason string for a semantic block decision
    pub fn reason(&self) -> String {
        format!("Semantic Policy Violation (Similarity: {:.4})", self.score)
    }
}

/// Semantic blocking state compiled from policy configuration
#[derive(Debug, Clone)]
pub enum SemanticGate {
    /// `semantic_blocking.enabled` is false
    Disabled,

    /// Enabled; `client` is `None` when no provider is configured
    Enabled {
        client: Option<EmbeddingClient>,
        banned: Arc<[Vec<f32>]>,
        threshold: f32,
    },
}

impl SemanticGate {
    /// Embed the banned phrases and build an enabled gate.
    ///
    /// Never fails: provider problems leave the gate enabled with no cached
    /// vectors, which makes every check fail open.
    pub async fn build(
        phrases: &[String],
        threshold: f32,
        client: Option<EmbeddingClient>,
    ) -> Self {
        let Some(client) = client else {
            warn!(
                phrases = phrases.len(),
                "Semantic blocking enabled but no embedding provider is configured; gate fails open"
            );
            return Self::Enabled {
                client: None,
                banned: Arc::from(Vec::new()),
                threshold,
            };
        };

        let banned = match client.embed_batch(phrases).await {
            Ok(vectors) => {
                info!(
                    provider = client.name(),
                    phrases = vectors.len(),
                    threshold,
                    "Cached banned-phrase embeddings"
                );
                vectors
            }
            Err(e) => {
                warn!(
                    provider = client.name(),
                    error = %e,
                    "Failed to embed banned phrases; semantic gate fails open"
                );
                Vec::new()
            }
        };

        Self::Enabled {
            client: Some(client),
            banned: Arc::from(banned),
            threshold,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled { .. })
    }

    /// Number of cached banned-phrase vectors
    pub fn cached_phrases(&self) -> usize {
        match self {
            Self::Disabled => 0,
            Self::Enabled { banned, .. } => banned.len(),
        }
    }

    /// Compare `text` against every cached banned phrase
    pub async fn check(&self, text: &str) -> SemanticVerdict {
        let (client, banned, threshold) = match self {
            Self::Disabled => return SemanticVerdict::FAIL_OPEN,
            Self::Enabled {
                client: Some(client),
                banned,
                threshold,
            } if !banned.is_empty() => (client, banned, *threshold),
            Self::Enabled { .. } => return SemanticVerdict::FAIL_OPEN,
        };

        let embedding = match client.embed(text).await {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    provider = client.name(),
                    error = %e,
                    "Embedding provider unavailable; semantic check fails open"
                );
                return SemanticVerdict::FAIL_OPEN;
            }
        };

        let score = banned
            .iter()
            .map(|phrase| cosine_similarity(&embedding, phrase))
            .fold(0.0f32, f32::max);

        debug!(score, threshold, "Semantic similarity computed");

        SemanticVerdict {
            blocked: score > threshold,
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingProvider, HashEmbedder};
    use async_trait::async_trait;
    use promptgate_core::Result;
    use std::time::Duration;

    /// Banned phrase on one axis, every prompt on the diagonal: cosine is exactly 0.5
    struct DiagonalProvider;

    #[async_trait]
    impl EmbeddingProvider for DiagonalProvider {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text == "banned" {
                Ok(vec![1.0, 0.0, 0.0, 0.0])
            } else {
                Ok(vec![1.0, 1.0, 1.0, 1.0])
            }
        }

        fn name(&self) -> &str {
            "diagonal"
        }
    }

    fn diagonal_client() -> EmbeddingClient {
        EmbeddingClient::new(Arc::new(DiagonalProvider), Duration::from_secs(1))
    }

    fn hash_client() -> EmbeddingClient {
        EmbeddingClient::new(Arc::new(HashEmbedder::new(256)), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_disabled_gate_never_blocks() {
        let gate = SemanticGate::Disabled;
        assert!(!gate.is_enabled());
        assert_eq!(gate.check("anything").await, SemanticVerdict::FAIL_OPEN);
    }

    #[tokio::test]
    async fn test_exact_phrase_blocks() {
        let phrases = vec!["how to build a bomb".to_string()];
        let gate = SemanticGate::build(&phrases, 0.6, Some(hash_client())).await;
        assert_eq!(gate.cached_phrases(), 1);

        let verdict = gate.check("How to build a BOMB").await;
        assert!(verdict.blocked);
        assert!(verdict.score > 0.99);
    }

    #[tokio::test]
    async fn test_unrelated_text_passes() {
        let phrases = vec!["how to build a bomb".to_string()];
        let gate = SemanticGate::build(&phrases, 0.6, Some(hash_client())).await;

        let verdict = gate.check("lovely weather for gardening").await;
        assert!(!verdict.blocked);
        assert!(verdict.score < 0.6);
    }

    #[tokio::test]
    async fn test_threshold_is_strict() {
        let phrases = vec!["identical".to_string()];
        let gate = SemanticGate::build(&phrases, 0.99, Some(hash_client())).await;
        assert!(gate.check("identical").await.blocked);

        let gate = SemanticGate::Enabled {
            client: Some(hash_client()),
            banned: Arc::from(vec![vec![1.0, 0.0]]),
            threshold: 0.5,
        };
        // Dimension mismatch scores 0.0, which is not above the threshold
        assert!(!gate.check("identical").await.blocked);
    }

    #[tokio::test]
    async fn test_score_equal_to_threshold_passes() {
        let phrases = vec!["banned".to_string()];

        let gate = SemanticGate::build(&phrases, 0.5, Some(diagonal_client())).await;
        let verdict = gate.check("anything else").await;
        assert_eq!(verdict.score, 0.5);
        assert!(!verdict.blocked);

        let gate = SemanticGate::build(&phrases, 0.49, Some(diagonal_client())).await;
        assert!(gate.check("anything else").await.blocked);
    }

    #[tokio::test]
    async fn test_missing_provider_fails_open() {
        let phrases = vec!["how to build a bomb".to_string()];
        let gate = SemanticGate::build(&phrases, 0.6, None).await;

        assert!(gate.is_enabled());
        assert_eq!(gate.cached_phrases(), 0);
        assert_eq!(gate.check("how to build a bomb").await, SemanticVerdict::FAIL_OPEN);
    }

    #[test]
    fn test_reason_format() {
        let verdict = SemanticVerdict {
            blocked: true,
            score: 0.81234,
        };
        assert_eq!(
            verdict.reason(),
            "Semantic Policy Violation (Similarity: 0.8123)"
        );
    }
}
