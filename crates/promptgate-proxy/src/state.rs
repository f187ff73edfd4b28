//! Shared gateway state

use crate::config::{EmbeddingConfig, EmbeddingProviderKind, ServerConfig};
use anyhow::{Context, Result};
use promptgate_classifiers::{
    EmbeddingClient, EmbeddingProvider, HashEmbedder, HttpEmbeddingProvider,
};
use promptgate_core::{Decision, HistoryEntry};
use promptgate_policy::PolicyEngine;
use promptgate_telemetry::{metrics, Adapter, HistoryLog};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// State shared by the HTTP and ICAP gateways
#[derive(Clone)]
pub struct AppState {
    /// Policy engine evaluating every prompt
    pub engine: Arc<PolicyEngine>,

    /// Decision history, appended to by both gateways
    pub history: Arc<HistoryLog>,
}

impl AppState {
    pub fn new(engine: PolicyEngine, history: HistoryLog) -> Self {
        Self {
            engine: Arc::new(engine),
            history: Arc::new(history),
        }
    }

    /// Build the embedding client, load the policy and allocate the history buffer
    pub async fn from_config(config: &ServerConfig) -> Result<Self> {
        let embedder = build_embedder(&config.embedding)?;
        let engine = PolicyEngine::open(&config.policy_path, embedder)
            .await
            .with_context(|| format!("Failed to load policy from {}", config.policy_path))?;

        Ok(Self::new(engine, HistoryLog::new(config.history_capacity)))
    }

    /// Evaluate `prompt`, record the decision in history and metrics
    pub async fn moderate(&self, adapter: Adapter, user_id: &str, prompt: &str) -> Decision {
        metrics::record_request(adapter);

        let start = Instant::now();
        let decision = self.engine.evaluate(prompt).await;
        metrics::record_decision(adapter, decision.action, start.elapsed());

        self.history.append(HistoryEntry::new(user_id, prompt, &decision));
        decision
    }
}

/// Construct the configured embedding provider, if any
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Option<EmbeddingClient>> {
    let provider: Arc<dyn EmbeddingProvider> = match config.provider {
        EmbeddingProviderKind::None => return Ok(None),
        EmbeddingProviderKind::Hash => Arc::new(HashEmbedder::new(config.dimensions)),
        EmbeddingProviderKind::Http => {
            let base_url = config
                .base_url
                .as_deref()
                .context("embedding.base_url is required for the http provider")?;
            Arc::new(HttpEmbeddingProvider::new(
                base_url,
                config.model.clone(),
                config.api_key.clone(),
            )?)
        }
    };

    info!(
        provider = provider.name(),
        timeout_ms = config.timeout_ms,
        "Embedding provider configured"
    );
    Ok(Some(EmbeddingClient::new(provider, config.timeout())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_provider() {
        assert!(build_embedder(&EmbeddingConfig::default()).unwrap().is_none());
    }

    #[test]
    fn test_hash_provider() {
        let config = EmbeddingConfig {
            provider: EmbeddingProviderKind::Hash,
            timeout_ms: 500,
            ..Default::default()
        };
        let client = build_embedder(&config).unwrap().unwrap();
        assert_eq!(client.name(), "hash");
        assert_eq!(client.timeout().as_millis(), 500);
    }

    #[test]
    fn test_http_provider_requires_base_url() {
        let config = EmbeddingConfig {
            provider: EmbeddingProviderKind::Http,
            ..Default::default()
        };
        assert!(build_embedder(&config).is_err());
    }
}
