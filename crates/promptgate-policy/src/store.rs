//! Policy loading and hot reload
//!
//! [`RuleStore`] owns the active [`ActivePolicy`] snapshot. A reload parses,
//! validates and compiles a complete replacement before taking the write
//! lock, so readers either see the old snapshot or the new one, never a mix.
//! When any step fails the previous snapshot stays active.

use crate::block::BlockGate;
use crate::config::PolicyConfig;
use parking_lot::RwLock;
use promptgate_classifiers::{EmbeddingClient, RedactionPipeline, SemanticGate};
use promptgate_core::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Parse and validate a policy file.
///
/// `.yaml` and `.yml` files are read as YAML, everything else as JSON.
pub fn load(path: impl AsRef<Path>) -> Result<PolicyConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "Failed to read policy file {}: {}",
            path.display(),
            e
        ))
    })?;

    let config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => PolicyConfig::from_yaml(&content)?,
        _ => PolicyConfig::from_json(&content)?,
    };

    config.validate()?;
    Ok(config)
}

/// A compiled, immutable policy snapshot
#[derive(Debug)]
pub struct ActivePolicy {
    config: PolicyConfig,
    block: BlockGate,
    redaction: RedactionPipeline,
    semantic: SemanticGate,
    generation: u64,
}

impl ActivePolicy {
    /// Compile matchers and embed banned phrases for `config`
    pub async fn compile(
        config: PolicyConfig,
        embedder: Option<EmbeddingClient>,
        generation: u64,
    ) -> Result<Self> {
        config.validate()?;

        let block = BlockGate::new(config.max_prompt_chars, &config.banned_keywords)?;
        let redaction = RedactionPipeline::new(&config.redaction_rules.enabled_kinds())?;

        let semantic_config = &config.semantic_blocking;
        let semantic = if semantic_config.enabled {
            SemanticGate::build(
                &semantic_config.banned_phrases,
                semantic_config.threshold,
                embedder,
            )
            .await
        } else {
            SemanticGate::Disabled
        };

        Ok(Self {
            config,
            block,
            redaction,
            semantic,
            generation,
        })
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn block_gate(&self) -> &BlockGate {
        &self.block
    }

    pub fn redaction(&self) -> &RedactionPipeline {
        &self.redaction
    }

    pub fn semantic(&self) -> &SemanticGate {
        &self.semantic
    }

    /// 1 for the policy loaded at startup, incremented by each successful reload
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Owner of the active policy snapshot
pub struct RuleStore {
    path: PathBuf,
    embedder: Option<EmbeddingClient>,
    active: RwLock<Arc<ActivePolicy>>,
    reload_lock: tokio::sync::Mutex<()>,
}

impl RuleStore {
    /// Load and compile the policy at `path`. Fails if the file is unusable.
    pub async fn open(path: impl Into<PathBuf>, embedder: Option<EmbeddingClient>) -> Result<Self> {
        let path = path.into();
        let config = load(&path)?;
        let policy = ActivePolicy::compile(config, embedder.clone(), 1).await?;

        info!(
            path = %path.display(),
            keywords = policy.block.keywords().len(),
            redaction_rules = policy.redaction.kinds().len(),
            semantic_phrases = policy.semantic.cached_phrases(),
            "Policy loaded"
        );

        Ok(Self {
            path,
            embedder,
            active: RwLock::new(Arc::new(policy)),
            reload_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Re-read the policy file and swap it in if it is valid.
    ///
    /// Concurrent reloads run one at a time.
    pub async fn reload(&self) -> Result<()> {
        let _guard = self.reload_lock.lock().await;

        let next_generation = self.current().generation + 1;
        let compiled = match load(&self.path) {
            Ok(config) => {
                ActivePolicy::compile(config, self.embedder.clone(), next_generation).await
            }
            Err(e) => Err(e),
        };

        let policy = match compiled {
            Ok(policy) => policy,
            Err(e) => {
                error!(
                    path = %self.path.display(),
                    error = %e,
                    "Policy reload failed; keeping previous policy"
                );
                return Err(e);
            }
        };

        info!(
            path = %self.path.display(),
            generation = policy.generation,
            keywords = policy.block.keywords().len(),
            redaction_rules = policy.redaction.kinds().len(),
            semantic_phrases = policy.semantic.cached_phrases(),
            "Policy reloaded"
        );

        *self.active.write() = Arc::new(policy);
        Ok(())
    }

    /// The active snapshot; the read lock is released before returning
    pub fn current(&self) -> Arc<ActivePolicy> {
        self.active.read().clone()
    }

    pub fn policy_path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for RuleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleStore")
            .field("path", &self.path)
            .field("embedder", &self.embedder)
            .field("generation", &self.current().generation)
            .finish()
    }
}
