//! Hard block checks: prompt length and banned keywords

use promptgate_classifiers::KeywordMatcher;
use promptgate_core::{Decision, Result};

/// Length and keyword checks, evaluated before anything else
#[derive(Debug, Clone)]
pub struct BlockGate {
    max_prompt_chars: usize,
    keywords: KeywordMatcher,
}

impl BlockGate {
    pub fn new<I, S>(max_prompt_chars: usize, banned_keywords: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            max_prompt_chars,
            keywords: KeywordMatcher::new(banned_keywords)?,
        })
    }

    pub fn max_prompt_chars(&self) -> usize {
        self.max_prompt_chars
    }

    pub fn keywords(&self) -> &KeywordMatcher {
        &self.keywords
    }

    /// Returns a block decision, or `None` when neither check fires
    pub fn check(&self, prompt: &str) -> Option<Decision> {
        if prompt.chars().count() > self.max_prompt_chars {
            return Some(Decision::block(
                prompt,
                format!(
                    "Prompt is too long. Max length is {} characters.",
                    self.max_prompt_chars
                ),
            ));
        }

        let found = self.keywords.find_all(prompt);
        if !found.is_empty() {
            return Some(Decision::block(
                prompt,
                format!("Found blocked keywords: {}", found.join(", ")),
            ));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptgate_core::Action;

    #[test]
    fn test_length_boundary() {
        let gate = BlockGate::new(200, Vec::<String>::new()).unwrap();

        assert!(gate.check(&"a".repeat(200)).is_none());

        let decision = gate.check(&"a".repeat(201)).unwrap();
        assert_eq!(decision.action, Action::Block);
        assert_eq!(
            decision.reason,
            "Prompt is too long. Max length is 200 characters."
        );
        assert_eq!(decision.prompt_out.len(), 201);
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let gate = BlockGate::new(4, Vec::<String>::new()).unwrap();
        // 4 chars, 8 bytes
        assert!(gate.check("éééé").is_none());
        assert!(gate.check("ééééé").is_some());
    }

    #[test]
    fn test_keywords_listed_in_config_order() {
        let gate = BlockGate::new(200, ["kill", "bomb"]).unwrap();

        let decision = gate.check("a BOMB could kill").unwrap();
        assert_eq!(decision.reason, "Found blocked keywords: kill, bomb");
        assert_eq!(decision.prompt_out, "a BOMB could kill");
    }

    #[test]
    fn test_length_checked_before_keywords() {
        let gate = BlockGate::new(5, ["kill"]).unwrap();
        let decision = gate.check("kill kill").unwrap();
        assert!(decision.reason.contains("too long"));
    }

    #[test]
    fn test_clean_prompt_passes() {
        let gate = BlockGate::new(200, ["kill"]).unwrap();
        assert!(gate
            .check("i woke up in the morning and ate breakfast")
            .is_none());
    }
}
