//! PII redaction rules and pipeline

use promptgate_core::Result;
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};

/// The closed set of redaction rules, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedactionKind {
    Email,
    Phone,
    Secret,
    CreditCard,
}

impl RedactionKind {
    /// Declaration order; the pipeline always applies rules in this order
    pub const ALL: [RedactionKind; 4] = [
        RedactionKind::Email,
        RedactionKind::Phone,
        RedactionKind::Secret,
        RedactionKind::CreditCard,
    ];

    /// Name reported in redaction reasons
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Email => "Email",
            Self::Phone => "Phone",
            Self::Secret => "Secret",
            Self::CreditCard => "CreditCard",
        }
    }

    /// Fixed token substituted for each match
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Email => "<EMAIL>",
            Self::Phone => "<PHONE>",
            Self::Secret => "<SECRET>",
            Self::CreditCard => "<CARD>",
        }
    }

    // Placeholders contain no '@', no digits and no "SECRET{", so no rule
    // matches its own output.
    fn pattern(&self) -> &'static str {
        match self {
            Self::Email => r"[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+",
            Self::Phone => r"\b[0-9]{3}[-.]?[0-9]{3}[-.]?[0-9]{4}\b",
            Self::Secret => r"SECRET\{[^}]*\}",
            Self::CreditCard => r"\b(?:[0-9][ -]*?){13,16}\b",
        }
    }
}

/// A single compiled rule: replaces every match with the kind's placeholder
#[derive(Debug, Clone)]
pub struct RedactionRule {
    kind: RedactionKind,
    regex: Regex,
}

impl RedactionRule {
    /// Compile the rule for `kind`
    pub fn new(kind: RedactionKind) -> Result<Self> {
        let regex = Regex::new(kind.pattern()).map_err(|e| {
            promptgate_core::Error::internal(format!(
                "Failed to compile {} regex: {}",
                kind.display_name(),
                e
            ))
        })?;

        Ok(Self { kind, regex })
    }

    pub fn kind(&self) -> RedactionKind {
        self.kind
    }

    /// Replace every matched span; returns the input unchanged when nothing matches
    pub fn apply(&self, text: &str) -> String {
        self.regex
            .replace_all(text, NoExpand(self.kind.placeholder()))
            .into_owned()
    }
}

/// Result of running the pipeline over a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactionOutcome {
    /// Text after every enabled rule ran
    pub text: String,

    /// Rules whose output differed from their input, in application order
    pub applied: Vec<RedactionKind>,
}

impl RedactionOutcome {
    pub fn changed(&self) -> bool {
        !self.applied.is_empty()
    }

    /// Reason string for a redact decision
    pub fn reason(&self) -> String {
        let names: Vec<&str> = self.applied.iter().map(|k| k.display_name()).collect();
        format!("P.I.I detected and redacted: {}", names.join(", "))
    }
}

/// Ordered composition of the enabled redaction rules
#[derive(Debug, Clone, Default)]
pub struct RedactionPipeline {
    rules: Vec<RedactionRule>,
}

impl RedactionPipeline {
    /// Build a pipeline from the enabled kinds.
    ///
    /// The caller's ordering is ignored: rules always run in
    /// [`RedactionKind::ALL`] order so overlaps resolve deterministically.
    pub fn new(enabled: &[RedactionKind]) -> Result<Self> {
        let rules = RedactionKind::ALL
            .iter()
            .filter(|kind| enabled.contains(kind))
            .map(|kind| RedactionRule::new(*kind))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules })
    }

    /// Pipeline with every rule enabled
    pub fn all() -> Result<Self> {
        Self::new(&RedactionKind::ALL)
    }

    pub fn kinds(&self) -> Vec<RedactionKind> {
        self.rules.iter().map(|r| r.kind()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply each rule in turn to the output of the previous one.
    ///
    /// A later rule can expose a match for an earlier one (a phone number
    /// glued to `SECRET{..}` only becomes word-bounded once the secret is
    /// replaced), so passes repeat until one changes nothing. Every change
    /// removes at least one digit, `@` or `SECRET{` opener, so this terminates.
    pub fn redact(&self, text: &str) -> RedactionOutcome {
        let mut current = text.to_string();
        let mut applied = Vec::new();

        loop {
            let mut pass_changed = false;

            for rule in &self.rules {
                let next = rule.apply(&current);
                if next != current {
                    if !applied.contains(&rule.kind()) {
                        applied.push(rule.kind());
                    }
                    current = next;
                    pass_changed = true;
                }
            }

            if !pass_changed {
                break;
            }
        }

        RedactionOutcome {
            text: current,
            applied,
        }
    }
}
