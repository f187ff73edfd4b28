//! Policy file schema and validation

use promptgate_classifiers::RedactionKind;
use promptgate_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Moderation policy as read from disk
///
/// Unknown top-level keys are ignored. `banned_keywords` has no default: a
/// file without it is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Case-insensitive substrings that block a prompt
    pub banned_keywords: Vec<String>,

    /// Longest prompt accepted, in characters
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,

    #[serde(default)]
    pub redaction_rules: RedactionToggles,

    #[serde(default)]
    pub semantic_blocking: SemanticBlockingConfig,
}

/// Per-rule redaction switches; everything is off unless enabled
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionToggles {
    #[serde(default)]
    pub redact_emails: bool,

    #[serde(default)]
    pub redact_phone_numbers: bool,

    #[serde(default)]
    pub redact_secrets: bool,

    #[serde(default)]
    pub redact_credit_cards: bool,
}

impl RedactionToggles {
    /// Enabled rules in pipeline order
    pub fn enabled_kinds(&self) -> Vec<RedactionKind> {
        RedactionKind::ALL
            .into_iter()
            .filter(|kind| self.is_enabled(*kind))
            .collect()
    }

    pub fn is_enabled(&self, kind: RedactionKind) -> bool {
        match kind {
            RedactionKind::Email => self.redact_emails,
            RedactionKind::Phone => self.redact_phone_numbers,
            RedactionKind::Secret => self.redact_secrets,
            RedactionKind::CreditCard => self.redact_credit_cards,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticBlockingConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub banned_phrases: Vec<String>,

    /// Similarity above which a prompt is blocked, exclusive
    #[serde(default = "default_threshold")]
    pub threshold: f32,
}

impl Default for SemanticBlockingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            banned_phrases: Vec::new(),
            threshold: default_threshold(),
        }
    }
}

fn default_max_prompt_chars() -> usize {
    200
}

fn default_threshold() -> f32 {
    0.6
}

impl PolicyConfig {
    /// Parse a policy from JSON
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::config(format!("Invalid policy JSON: {}", e)))
    }

    /// Parse a policy from YAML
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::config(format!("Invalid policy YAML: {}", e)))
    }

    /// Reject configurations that cannot be applied as a whole
    pub fn validate(&self) -> Result<()> {
        if self.banned_keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(Error::config("banned_keywords must not contain blank entries"));
        }

        if self.max_prompt_chars == 0 {
            return Err(Error::config("max_prompt_chars must be positive"));
        }

        let semantic = &self.semantic_blocking;
        if !(semantic.threshold > 0.0 && semantic.threshold < 1.0) {
            return Err(Error::config(format!(
                "semantic_blocking.threshold must be between 0 and 1 (exclusive), got {}",
                semantic.threshold
            )));
        }

        if semantic.enabled {
            if semantic.banned_phrases.is_empty() {
                return Err(Error::config(
                    "semantic_blocking is enabled but banned_phrases is empty",
                ));
            }
            if semantic.banned_phrases.iter().any(|p| p.trim().is_empty()) {
                return Err(Error::config(
                    "semantic_blocking.banned_phrases must not contain blank entries",
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let config = PolicyConfig::from_json(r#"{"banned_keywords": []}"#).unwrap();

        assert_eq!(config.max_prompt_chars, 200);
        assert_eq!(config.redaction_rules, RedactionToggles::default());
        assert!(!config.semantic_blocking.enabled);
        assert!((config.semantic_blocking.threshold - 0.6).abs() < f32::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_banned_keywords_rejected() {
        let err = PolicyConfig::from_json(r#"{"max_prompt_chars": 50}"#).unwrap_err();
        assert!(err.to_string().contains("banned_keywords"));
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let config =
            PolicyConfig::from_json(r#"{"banned_keywords": ["x"], "owner": "secops"}"#).unwrap();
        assert_eq!(config.banned_keywords, vec!["x"]);
    }

    #[test]
    fn test_yaml_policy() {
        let yaml = r#"
banned_keywords:
  - kill
  - bomb
max_prompt_chars: 120
redaction_rules:
  redact_emails: true
  redact_secrets: true
semantic_blocking:
  enabled: true
  banned_phrases: ["how to build a weapon"]
  threshold: 0.75
"#;
        let config = PolicyConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.banned_keywords.len(), 2);
        assert_eq!(config.max_prompt_chars, 120);
        assert_eq!(
            config.redaction_rules.enabled_kinds(),
            vec![RedactionKind::Email, RedactionKind::Secret]
        );
        assert!(config.semantic_blocking.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_failures() {
        let cases = [
            r#"{"banned_keywords": ["ok", " "]}"#,
            r#"{"banned_keywords": [], "max_prompt_chars": 0}"#,
            r#"{"banned_keywords": [], "semantic_blocking": {"threshold": 1.0}}"#,
            r#"{"banned_keywords": [], "semantic_blocking": {"threshold": 0.0}}"#,
            r#"{"banned_keywords": [], "semantic_blocking": {"enabled": true}}"#,
            r#"{"banned_keywords": [], "semantic_blocking": {"enabled": true, "banned_phrases": [""]}}"#,
        ];

        for case in cases {
            let config = PolicyConfig::from_json(case).unwrap();
            assert!(config.validate().is_err(), "expected rejection: {}", case);
        }
    }

    #[test]
    fn test_negative_length_rejected_at_parse() {
        assert!(PolicyConfig::from_json(r#"{"banned_keywords": [], "max_prompt_chars": -5}"#).is_err());
    }

    #[test]
    fn test_all_toggles_in_pipeline_order() {
        let toggles = RedactionToggles {
            redact_emails: true,
            redact_phone_numbers: true,
            redact_secrets: true,
            redact_credit_cards: true,
        };
        assert_eq!(toggles.enabled_kinds(), RedactionKind::ALL.to_vec());
    }
}
