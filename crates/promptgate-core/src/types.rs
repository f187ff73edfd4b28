//! Core types for PromptGate

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason attached to prompts that pass every check
pub const SAFE_REASON: &str = "Safe, no action required";

/// Moderation outcome for a single prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Forward the prompt unchanged
    Allow,
    /// Refuse the prompt
    Block,
    /// Forward the prompt with sensitive spans replaced
    Redact,
}

impl Action {
    /// Wire name of the action
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Block => "block",
            Self::Redact => "redact",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of evaluating one prompt against the active policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// The single action taken
    pub action: Action,

    /// Text to forward: transformed for redact, original for allow and block
    pub prompt_out: String,

    /// Human-readable explanation
    pub reason: String,
}

impl Decision {
    /// Prompt passes unchanged
    pub fn allow(prompt: impl Into<String>) -> Self {
        Self {
            action: Action::Allow,
            prompt_out: prompt.into(),
            reason: SAFE_REASON.to_string(),
        }
    }

    /// Prompt is refused; `prompt_out` keeps the original text
    pub fn block(prompt: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            action: Action::Block,
            prompt_out: prompt.into(),
            reason: reason.into(),
        }
    }

    /// Prompt is forwarded with redactions applied
    pub fn redact(redacted: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            action: Action::Redact,
            prompt_out: redacted.into(),
            reason: reason.into(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.action == Action::Allow
    }
}

/// One audited decision, immutable once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// RFC 3339 UTC timestamp of the evaluation
    pub timestamp: String,

    /// Caller identity as supplied by the adapter
    pub user_id: String,

    /// Original, unredacted prompt
    pub prompt_in: String,

    pub action: Action,

    pub reason: String,
}

impl HistoryEntry {
    /// Record a decision made now
    pub fn new(user_id: impl Into<String>, prompt_in: impl Into<String>, decision: &Decision) -> Self {
        Self::at(Utc::now(), user_id, prompt_in, decision)
    }

    /// Record a decision with an explicit timestamp
    pub fn at(
        when: DateTime<Utc>,
        user_id: impl Into<String>,
        prompt_in: impl Into<String>,
        decision: &Decision,
    ) -> Self {
        Self {
            timestamp: when.to_rfc3339_opts(SecondsFormat::Millis, true),
            user_id: user_id.into(),
            prompt_in: prompt_in.into(),
            action: decision.action,
            reason: decision.reason.clone(),
        }
    }
}
