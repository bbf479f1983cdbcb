//! Pull request and review comment types produced by the version-control source

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A merged pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: i64,
    pub title: String,
    pub url: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// One comment from a PR review thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewComment {
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub url: String,
    /// File the enclosing thread is attached to
    pub path: String,
    /// Line of the enclosing thread; outdated threads have none
    pub line: Option<i64>,
    /// Earlier comments of the same thread, oldest first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_context: Option<String>,
}
