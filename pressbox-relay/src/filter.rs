//! Keyword relevance test.
use std::collections::HashSet;

/// Case-insensitive substring match against a fixed keyword list.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    keywords: Vec<String>,
}

impl RelevanceFilter {
    /// Keywords are trimmed and lower-cased; blank and repeated ones are
    /// dropped, first occurrence wins.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty() && seen.insert(k.clone()))
            .collect();
        Self { keywords }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn matches(&self, text: &str) -> bool {
        self.matched_keyword(text).is_some()
    }

    /// First keyword found in `text`, for logging why an item was kept.
    pub fn matched_keyword(&self, text: &str) -> Option<&str> {
        let haystack = text.to_lowercase();
        self.keywords
            .iter()
            .find(|k| haystack.contains(k.as_str()))
            .map(String::as_str)
    }
}
