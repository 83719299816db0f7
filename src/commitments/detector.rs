//! Promise detection over outbound text
//!
//! Patterns are tried in declaration order and the first one that matches
//! wins, regardless of where in the text it matched. `regex` guarantees
//! linear-time matching so arbitrary input length is safe.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CommitmentError, Result};

/// Default commitment phrases, highest priority first.
pub const DEFAULT_PROMISE_PATTERNS: &[&str] = &[
    r"(?i)I['’]ll\s+(follow up|check on|get back to you|look into|let you know|check back)",
    r"(?i)I\s+will\s+(follow up|check on|get back to you|look into|let you know|check back)",
    r"(?i)Let\s+me\s+(follow up|check on|get back to you|look into|check back)",
    r"(?i)I['’]ll\s+have\s+(that|this|it)\s+(ready|done|finished)",
    r"(?i)I['’]ll\s+(remind|ping|message|text|notify)\s+(you|him|her|them)",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromiseMatch {
    /// Substring matched by the winning pattern.
    pub fragment: String,
    /// Sentence that carries the promise, or `fragment` if none qualifies.
    pub sentence: String,
    /// Index of the winning pattern in the table.
    pub pattern_index: usize,
}

#[derive(Debug, Clone)]
pub struct PromiseDetector {
    patterns: Vec<Regex>,
}

impl PromiseDetector {
    pub fn new(patterns: Vec<Regex>) -> Self {
        Self { patterns }
    }

    /// Compile a pattern table, keeping its order.
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let compiled = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|source| CommitmentError::Pattern {
                    pattern: p.as_ref().to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(compiled))
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn detect(&self, text: &str) -> Option<PromiseMatch> {
        let (pattern_index, fragment) = self
            .patterns
            .iter()
            .enumerate()
            .find_map(|(i, p)| p.find(text).map(|m| (i, m.as_str().to_string())))?;

        let sentence = self
            .promise_sentence(text)
            .unwrap_or_else(|| fragment.clone());

        Some(PromiseMatch {
            fragment,
            sentence,
            pattern_index,
        })
    }

    /// First `.`/`!`/`?`-delimited sentence that matches any pattern.
    pub fn promise_sentence(&self, text: &str) -> Option<String> {
        text.split(['.', '!', '?'])
            .find(|sentence| self.patterns.iter().any(|p| p.is_match(sentence)))
            .map(|sentence| sentence.trim().to_string())
    }
}

impl Default for PromiseDetector {
    fn default() -> Self {
        let patterns = DEFAULT_PROMISE_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();
        Self::new(patterns)
    }
}
