//! Policy evaluation engine

use crate::store::{ActivePolicy, RuleStore};
use promptgate_classifiers::EmbeddingClient;
use promptgate_core::{Decision, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Evaluates prompts against the active policy
///
/// Checks run in strict priority order: hard blocks, semantic similarity,
/// redaction, then allow. The first check that produces a decision wins.
#[derive(Debug)]
pub struct PolicyEngine {
    store: RuleStore,
}

impl PolicyEngine {
    pub fn new(store: RuleStore) -> Self {
        Self { store }
    }

    /// Load the policy at `path` and build an engine around it
    pub async fn open(path: impl Into<PathBuf>, embedder: Option<EmbeddingClient>) -> Result<Self> {
        Ok(Self::new(RuleStore::open(path, embedder).await?))
    }

    /// Evaluate one prompt. Always returns exactly one decision.
    pub async fn evaluate(&self, prompt: &str) -> Decision {
        let policy = self.store.current();
        let decision = evaluate_with(&policy, prompt).await;

        debug!(
            generation = policy.generation(),
            chars = prompt.chars().count(),
            action = %decision.action,
            "Prompt evaluated"
        );
        if !decision.is_allowed() {
            info!(action = %decision.action, reason = %decision.reason, "Prompt moderated");
        }

        decision
    }

    /// Reload the policy file; the previous policy stays active on failure
    pub async fn reload(&self) -> Result<()> {
        self.store.reload().await
    }

    pub fn current(&self) -> Arc<ActivePolicy> {
        self.store.current()
    }

    pub fn policy_path(&self) -> &Path {
        self.store.policy_path()
    }
}

async fn evaluate_with(policy: &ActivePolicy, prompt: &str) -> Decision {
    if let Some(decision) = policy.block_gate().check(prompt) {
        return decision;
    }

    let verdict = policy.semantic().check(prompt).await;
    if verdict.blocked {
        return Decision::block(prompt, verdict.reason());
    }

    let outcome = policy.redaction().redact(prompt);
    if outcome.changed() {
        let reason = outcome.reason();
        return Decision::redact(outcome.text, reason);
    }

    Decision::allow(prompt)
}
