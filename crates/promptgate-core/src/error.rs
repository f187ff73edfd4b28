//! Error types for PromptGate

/// Result type alias using PromptGate's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for PromptGate operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Policy file missing, unparsable, or failing validation
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed caller request (bad JSON, missing fields)
    #[error("invalid request: {0}")]
    Request(String),

    /// Embedding provider unreachable or returning garbage
    #[error("embedding provider error: {0}")]
    Provider(String),

    /// Malformed ICAP line or stream failure
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Timeout errors
    #[error("operation timed out")]
    Timeout,

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new request error
    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }

    /// Create a new provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a new protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Request(_) => "request",
            Self::Provider(_) => "provider",
            Self::Protocol(_) => "protocol",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Timeout => "timeout",
            Self::Internal(_) => "internal",
        }
    }
}
