//! Rule-based removal of low-value review comments

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::collector::ReviewComment;

/// Characters stripped from both ends of each word before phrase matching
const TRIMMED_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':'];

const DEFAULT_EXCLUDE_PHRASES: &[&str] = &[
    "lgtm",
    "looks good to me",
    "approved",
    "👍",
    "✅",
    "+1",
    "thanks",
    "thank you",
    "done",
    "fixed",
    "ok",
    "sure",
    "yes",
    "no",
    "nope",
    "agree",
    "agreed",
    "automatically generated",
    "bumps version",
    "dependency update",
];

const DEFAULT_EXCLUDE_AUTHORS: &[&str] = &[
    "github-actions[bot]",
    "dependabot[bot]",
    "renovate[bot]",
    "codecov[bot]",
];

/// Tunable inputs of [`CommentFilter`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Minimum trimmed body length, in characters
    pub min_length: usize,

    /// Bodies equal to, or made up only of, these phrases are dropped
    pub exclude_phrases: Vec<String>,

    /// Authors whose comments are always dropped (case-insensitive)
    pub exclude_authors: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_length: 10,
            exclude_phrases: DEFAULT_EXCLUDE_PHRASES.iter().map(|s| s.to_string()).collect(),
            exclude_authors: DEFAULT_EXCLUDE_AUTHORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Decides whether a review comment is worth analyzing
#[derive(Debug, Clone)]
pub struct CommentFilter {
    min_length: usize,
    phrases: HashSet<String>,
    /// Tokenized phrases, longest first
    phrase_words: Vec<Vec<String>>,
    authors: HashSet<String>,
}

impl CommentFilter {
    pub fn new(config: FilterConfig) -> Self {
        let phrases: HashSet<String> = config
            .exclude_phrases
            .iter()
            .map(|p| normalize(p))
            .filter(|p| !p.is_empty())
            .collect();

        let mut phrase_words: Vec<Vec<String>> = phrases
            .iter()
            .map(|p| p.split(' ').map(str::to_string).collect())
            .collect();
        phrase_words.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        Self {
            min_length: config.min_length,
            phrases,
            phrase_words,
            authors: config
                .exclude_authors
                .iter()
                .map(|a| a.trim().to_lowercase())
                .collect(),
        }
    }

    /// Check a single comment
    ///
    /// Checks run in order and stop at the first rejection: denylisted
    /// author, too-short body, then low-value phrase.
    pub fn is_useful(&self, comment: &ReviewComment) -> bool {
        if self.is_excluded_author(&comment.author) {
            return false;
        }

        if !self.has_minimum_length(&comment.body) {
            return false;
        }

        !self.is_low_value(&comment.body)
    }

    /// Whether the trimmed body is at least the configured length
    pub fn has_minimum_length(&self, body: &str) -> bool {
        body.trim().chars().count() >= self.min_length
    }

    /// Keep useful comments, preserving order
    pub fn filter_comments(&self, comments: Vec<ReviewComment>) -> Vec<ReviewComment> {
        comments.into_iter().filter(|c| self.is_useful(c)).collect()
    }

    fn is_excluded_author(&self, author: &str) -> bool {
        self.authors.contains(&author.trim().to_lowercase())
    }

    fn is_low_value(&self, body: &str) -> bool {
        let lowered = body.trim().to_lowercase();
        if self.phrases.contains(&lowered) {
            return true;
        }

        let normalized = normalize(&lowered);
        if normalized.is_empty() {
            return false;
        }
        if self.phrases.contains(&normalized) {
            return true;
        }

        // "thanks, done!" is noise; "thanks for catching that ..." is not
        let words: Vec<&str> = normalized.split(' ').collect();
        self.consists_of_phrases(&words)
    }

    /// Whether `words` can be consumed entirely by excluded phrases,
    /// matching the longest phrase first at each position
    fn consists_of_phrases(&self, words: &[&str]) -> bool {
        let mut rest = words;
        while !rest.is_empty() {
            let matched = self.phrase_words.iter().find(|phrase| {
                phrase.len() <= rest.len()
                    && phrase.iter().zip(rest.iter()).all(|(p, w)| p == w)
            });
            match matched {
                Some(phrase) => rest = &rest[phrase.len()..],
                None => return false,
            }
        }
        true
    }
}

impl Default for CommentFilter {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}

/// Lower-case, split on whitespace, strip edge punctuation, re-join with single spaces
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(TRIMMED_PUNCTUATION))
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
