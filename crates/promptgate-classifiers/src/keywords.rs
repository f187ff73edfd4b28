//! Banned-keyword matching

use aho_corasick::AhoCorasick;
use promptgate_core::Result;

/// Case-insensitive substring matcher over a fixed keyword set
///
/// Keywords are case-folded and de-duplicated at construction. Matching
/// folds the input the same way and reports every keyword that occurs,
/// including keywords overlapping one another.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    automaton: AhoCorasick,
    keywords: Vec<String>,
}

impl KeywordMatcher {
    /// Build a matcher. Blank keywords are rejected since they would match every prompt.
    pub fn new<I, S>(keywords: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut folded: Vec<String> = Vec::new();
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if keyword.is_empty() {
                return Err(promptgate_core::Error::config(
                    "banned keywords must not be blank",
                ));
            }
            if !folded.contains(&keyword) {
                folded.push(keyword);
            }
        }

        let automaton = AhoCorasick::new(&folded).map_err(|e| {
            promptgate_core::Error::config(format!("Failed to build keyword matcher: {}", e))
        })?;

        Ok(Self {
            automaton,
            keywords: folded,
        })
    }

    /// All keywords present in `text`, in configuration order, each once
    pub fn find_all(&self, text: &str) -> Vec<&str> {
        if self.keywords.is_empty() {
            return Vec::new();
        }

        let folded = text.to_lowercase();
        let mut hit = vec![false; self.keywords.len()];
        for mat in self.automaton.find_overlapping_iter(&folded) {
            hit[mat.pattern().as_usize()] = true;
        }

        self.keywords
            .iter()
            .zip(hit)
            .filter_map(|(keyword, found)| found.then_some(keyword.as_str()))
            .collect()
    }

    /// The case-folded keyword set
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}
