//! Structured analysis results

use serde::{Deserialize, Serialize};

pub use reviewkb_db::CommentType;

use crate::{Error, Result};

/// Maximum number of tags kept from a response
pub const MAX_TAGS: usize = 5;

/// Relevance assigned to degraded results
pub const DEGRADED_RELEVANCE: f64 = 0.3;

/// Classification and summary of one review comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    #[serde(rename = "type")]
    pub comment_type: CommentType,
    pub tags: Vec<String>,
    pub relevance_score: f64,
}

/// Response object as the language model emits it, before validation
#[derive(Debug, Deserialize)]
struct RawAnalysis {
    summary: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    tags: Vec<String>,
    relevance_score: f64,
}

impl AnalysisResult {
    /// Parse and normalise a JSON object produced by an analysis backend
    ///
    /// Tags are trimmed, blanks dropped and the list truncated to
    /// [`MAX_TAGS`]; the relevance score is clamped into `[0, 1]`. An empty
    /// summary or an unknown classification is rejected.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawAnalysis = serde_json::from_str(json)
            .map_err(|e| Error::Parse(format!("invalid analysis JSON: {e}")))?;

        let summary = raw.summary.trim().to_string();
        if summary.is_empty() {
            return Err(Error::Parse("analysis summary is empty".to_string()));
        }

        let comment_type = raw
            .kind
            .parse::<CommentType>()
            .map_err(|_| Error::Parse(format!("unknown classification: {}", raw.kind)))?;

        let tags = raw
            .tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .take(MAX_TAGS)
            .collect();

        let relevance_score = if raw.relevance_score.is_nan() {
            0.0
        } else {
            raw.relevance_score.clamp(0.0, 1.0)
        };

        Ok(Self {
            summary,
            comment_type,
            tags,
            relevance_score,
        })
    }

    /// Low-confidence placeholder used when no backend produced a result
    pub fn degraded(file_path: &str) -> Self {
        Self {
            summary: format!("Review comment about {file_path}"),
            comment_type: CommentType::Explanation,
            tags: vec!["review".to_string(), "feedback".to_string()],
            relevance_score: DEGRADED_RELEVANCE,
        }
    }
}

/// Result of analysing a comment, distinguishing genuine from placeholder output
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Succeeded(AnalysisResult),
    Degraded {
        result: AnalysisResult,
        /// Why every backend failed
        cause: String,
    },
}

impl AnalysisOutcome {
    pub fn result(&self) -> &AnalysisResult {
        match self {
            AnalysisOutcome::Succeeded(result) => result,
            AnalysisOutcome::Degraded { result, .. } => result,
        }
    }

    pub fn into_result(self) -> AnalysisResult {
        match self {
            AnalysisOutcome::Succeeded(result) => result,
            AnalysisOutcome::Degraded { result, .. } => result,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, AnalysisOutcome::Degraded { .. })
    }
}
