//! Version-control source of merged pull requests and their review comments

use async_trait::async_trait;

use super::types::{PullRequest, ReviewComment};
use crate::Result;

/// Parameters for listing merged pull requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrQuery {
    /// Maximum number of pull requests returned
    pub limit: usize,
    /// Only pull requests carrying this label
    pub label: Option<String>,
    /// Drop pull requests authored by bot accounts
    pub exclude_bots: bool,
}

impl PrQuery {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            label: None,
            exclude_bots: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn excluding_bots(mut self) -> Self {
        self.exclude_bots = true;
        self
    }
}

/// Where pull requests and review comments come from
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// Merged pull requests, newest first
    async fn list_merged(&self, repository: &str, query: &PrQuery) -> Result<Vec<PullRequest>>;

    /// A single pull request; `Error::NotFound` if it does not exist
    async fn get_pull_request(&self, repository: &str, number: i64) -> Result<PullRequest>;

    /// Review-thread comments of a pull request, in thread order
    async fn review_comments(&self, repository: &str, number: i64)
        -> Result<Vec<ReviewComment>>;
}
