//! Data models for database records

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Classification of a review comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentType {
    /// Code improvement suggestions (performance, refactoring, code quality)
    Implementation,
    /// Security concerns
    Security,
    /// Test methods, coverage, test cases
    Testing,
    /// Business logic and domain knowledge
    Business,
    /// Architecture, design patterns, structure
    Design,
    /// Maintainability, readability, naming, style
    Maintenance,
    /// Explanations, questions, information sharing
    Explanation,
    /// Bug reports
    Bug,
    /// Low-value comments
    Noise,
}

impl CommentType {
    /// Every classification, in display order
    pub const ALL: [CommentType; 9] = [
        CommentType::Implementation,
        CommentType::Security,
        CommentType::Testing,
        CommentType::Business,
        CommentType::Design,
        CommentType::Maintenance,
        CommentType::Explanation,
        CommentType::Bug,
        CommentType::Noise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommentType::Implementation => "implementation",
            CommentType::Security => "security",
            CommentType::Testing => "testing",
            CommentType::Business => "business",
            CommentType::Design => "design",
            CommentType::Maintenance => "maintenance",
            CommentType::Explanation => "explanation",
            CommentType::Bug => "bug",
            CommentType::Noise => "noise",
        }
    }
}

impl fmt::Display for CommentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        CommentType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| Error::InvalidData(format!("unknown comment type: {s}")))
    }
}

/// A document to be written; storage assigns the id and timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDocument {
    pub summary: String,
    pub original_comment: String,
    pub thread_context: Option<String>,

    pub file_path: String,
    pub directory_path: String,
    pub language: String,
    pub line_number: Option<i64>,

    pub repository: String,
    pub pr_number: i64,
    pub pr_title: String,
    pub pr_url: String,
    pub comment_url: String,

    pub author: String,
    pub comment_type: CommentType,
    pub tags: Vec<String>,
    pub relevance_score: f64,

    /// When the review comment was written
    pub commented_at: DateTime<Utc>,
}

/// A persisted knowledge document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Surrogate identifier assigned by storage
    pub id: i64,

    pub summary: String,
    pub original_comment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_context: Option<String>,

    pub file_path: String,
    pub directory_path: String,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<i64>,

    pub repository: String,
    pub pr_number: i64,
    pub pr_title: String,
    pub pr_url: String,
    pub comment_url: String,

    pub author: String,
    pub comment_type: CommentType,
    pub tags: Vec<String>,
    pub relevance_score: f64,

    pub commented_at: DateTime<Utc>,
    /// First time this comment was stored; never changes on re-save
    pub collected_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw `documents` row before tags and comment type are decoded
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct DocumentRow {
    pub id: i64,
    pub summary: String,
    pub original_comment: String,
    pub thread_context: Option<String>,
    pub file_path: String,
    pub directory_path: String,
    pub language: String,
    pub line_number: Option<i64>,
    pub repository: String,
    pub pr_number: i64,
    pub pr_title: String,
    pub pr_url: String,
    pub comment_url: String,
    pub author: String,
    pub comment_type: String,
    pub tags: String, // JSON array
    pub relevance_score: f64,
    pub commented_at: DateTime<Utc>,
    pub collected_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DocumentRow> for Document {
    type Error = Error;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        Ok(Document {
            id: row.id,
            summary: row.summary,
            original_comment: row.original_comment,
            thread_context: row.thread_context,
            file_path: row.file_path,
            directory_path: row.directory_path,
            language: row.language,
            line_number: row.line_number,
            repository: row.repository,
            pr_number: row.pr_number,
            pr_title: row.pr_title,
            pr_url: row.pr_url,
            comment_url: row.comment_url,
            author: row.author,
            comment_type: row.comment_type.parse()?,
            tags: serde_json::from_str(&row.tags)?,
            relevance_score: row.relevance_score,
            commented_at: row.commented_at,
            collected_at: row.collected_at,
            updated_at: row.updated_at,
        })
    }
}

/// Checkpoint of collection work for one repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CollectionProgress {
    pub id: i64,
    pub repository: String,
    pub last_pr_number: i64,
    pub last_collected_at: DateTime<Utc>,
    pub total_prs_processed: i64,
    pub total_comments_collected: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Search filters for stored documents
///
/// Empty fields do not constrain the result.
#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    /// Directory substring, also matched against the file path prefix
    pub directory: Option<String>,
    /// File path substring
    pub file: Option<String>,
    /// Comment author substring
    pub author: Option<String>,
    /// Exact classification
    pub comment_type: Option<CommentType>,
    /// Substring of the summary or the original comment
    pub keyword: Option<String>,
    /// Exact repository
    pub repository: Option<String>,
    /// Maximum number of rows
    pub limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_type_round_trip_names() {
        for t in CommentType::ALL {
            assert_eq!(t.as_str().parse::<CommentType>().unwrap(), t);
        }
    }

    #[test]
    fn test_comment_type_parse_is_case_insensitive() {
        assert_eq!(" Security ".parse::<CommentType>().unwrap(), CommentType::Security);
    }

    #[test]
    fn test_comment_type_rejects_unknown() {
        assert!("suggestion".parse::<CommentType>().is_err());
    }

    #[test]
    fn test_comment_type_serde_lowercase() {
        let json = serde_json::to_string(&CommentType::Maintenance).unwrap();
        assert_eq!(json, "\"maintenance\"");
    }
}
