//! Reference vocabularies used by priority scoring.
//!
//! Kept apart from the scoring formula so the term lists can be tested and
//! extended without touching the weights.

use std::collections::HashSet;

/// Political terms that raise topic relevance.
pub const POLITICAL_KEYWORDS: &[&str] = &[
    "election",
    "vote",
    "government",
    "president",
    "senate",
    "senator",
    "parliament",
    "governor",
    "policy",
    "corruption",
    "protest",
    "referendum",
];

/// Security terms that raise topic relevance.
pub const SECURITY_KEYWORDS: &[&str] = &[
    "security",
    "attack",
    "violence",
    "terror",
    "kidnapping",
    "bandit",
    "military",
    "police",
    "riot",
    "conflict",
];

/// Economic terms that raise topic relevance.
pub const ECONOMIC_KEYWORDS: &[&str] = &[
    "economy",
    "inflation",
    "unemployment",
    "tax",
    "fuel",
    "subsidy",
    "price",
    "budget",
    "debt",
    "salary",
];

/// Emotions that push emotion intensity to its highest tier.
pub const HIGH_INTENSITY_EMOTIONS: &[&str] = &["anger", "fear", "rage", "panic"];

/// Case-insensitive keyword and emotion sets.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    keywords: HashSet<String>,
    high_intensity_emotions: HashSet<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new(
            POLITICAL_KEYWORDS
                .iter()
                .chain(SECURITY_KEYWORDS)
                .chain(ECONOMIC_KEYWORDS)
                .copied(),
            HIGH_INTENSITY_EMOTIONS.iter().copied(),
        )
    }
}

impl Vocabulary {
    pub fn new<K, E, S, T>(keywords: K, high_intensity_emotions: E) -> Self
    where
        K: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Self {
            keywords: keywords.into_iter().map(|k| normalize(k.as_ref())).collect(),
            high_intensity_emotions: high_intensity_emotions
                .into_iter()
                .map(|e| normalize(e.as_ref()))
                .collect(),
        }
    }

    /// Add reference keywords on top of the current set.
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.keywords
            .extend(keywords.into_iter().map(|k| normalize(k.as_ref())));
        self
    }

    pub fn is_reference_keyword(&self, keyword: &str) -> bool {
        self.keywords.contains(&normalize(keyword))
    }

    pub fn matches_any_keyword<S: AsRef<str>>(&self, keywords: &[S]) -> bool {
        keywords.iter().any(|k| self.is_reference_keyword(k.as_ref()))
    }

    pub fn is_high_intensity(&self, emotion: &str) -> bool {
        self.high_intensity_emotions.contains(&normalize(emotion))
    }

    pub fn keyword_count(&self) -> usize {
        self.keywords.len()
    }
}

/// Lowercased, trimmed form used for every comparison.
pub fn normalize(term: &str) -> String {
    term.trim().to_lowercase()
}
