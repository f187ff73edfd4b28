//! Server configuration
//!
//! Values are layered, later sources winning:
//! 1. Built-in defaults
//! 2. Optional config file (YAML, JSON or TOML, chosen by extension)
//! 3. Environment variables `PROMPTGATE__<SECTION>__<KEY>`, e.g.
//!    `PROMPTGATE__HTTP__LISTEN=127.0.0.1:9000`
//! 4. Command-line overrides

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const ENV_PREFIX: &str = "PROMPTGATE";

/// Top-level server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Moderation policy file (JSON, or YAML for .yaml/.yml)
    #[serde(default = "default_policy_path")]
    pub policy_path: String,

    /// Decisions retained in the history buffer
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub icap: IcapConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            policy_path: default_policy_path(),
            history_capacity: default_history_capacity(),
            http: HttpConfig::default(),
            icap: IcapConfig::default(),
            embedding: EmbeddingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub policy_path: Option<String>,
    pub http_listen: Option<String>,
    pub icap_listen: Option<String>,
}

impl ServerConfig {
    /// Load configuration from defaults, an optional file, the environment
    /// and CLI overrides
    pub fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("policy_path", overrides.policy_path.clone())?
            .set_override_option("http.listen", overrides.http_listen.clone())?
            .set_override_option("icap.listen", overrides.icap_listen.clone())?
            .build()
            .context("Failed to build server configuration")?;

        config
            .try_deserialize()
            .context("Invalid server configuration")
    }
}

/// HTTP gateway settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_listen")]
    pub listen: String,

    /// Larger request bodies are rejected with 413
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Slower requests are answered with 408
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen: default_http_listen(),
            max_body_bytes: default_max_body_bytes(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// ICAP gateway settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IcapConfig {
    #[serde(default = "default_icap_listen")]
    pub listen: String,

    /// Longest request line accepted, excluding the terminator
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,

    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    /// Connections handled at once; further connections are dropped
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl IcapConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

impl Default for IcapConfig {
    fn default() -> Self {
        Self {
            listen: default_icap_listen(),
            max_line_bytes: default_max_line_bytes(),
            read_timeout_secs: default_read_timeout_secs(),
            max_connections: default_max_connections(),
        }
    }
}

/// Which embedding provider backs semantic blocking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Semantic blocking fails open
    #[default]
    None,
    /// Offline feature-hashing embedder
    Hash,
    /// OpenAI-compatible embeddings endpoint
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProviderKind,

    /// Vector size for the hash provider
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// API root for the http provider, e.g. `https://api.openai.com/v1`
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Budget per embedding call; slower calls fail open
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            dimensions: default_dimensions(),
            base_url: None,
            model: default_embedding_model(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Prometheus exporter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Address of the exporter's own HTTP listener
    #[serde(default = "default_metrics_listen")]
    pub listen: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_metrics_listen(),
        }
    }
}

fn default_policy_path() -> String {
    "policy.json".to_string()
}

fn default_history_capacity() -> usize {
    100
}

fn default_http_listen() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_icap_listen() -> String {
    "0.0.0.0:1344".to_string()
}

fn default_max_line_bytes() -> usize {
    64 * 1024
}

fn default_read_timeout_secs() -> u64 {
    10
}

fn default_max_connections() -> usize {
    256
}

fn default_dimensions() -> usize {
    384
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_timeout_ms() -> u64 {
    2000
}

fn default_metrics_listen() -> String {
    "127.0.0.1:9100".to_string()
}
