//! Listing and viewing merged pull requests

use chrono::{DateTime, Utc};
use reviewkb_core::collector::{PrQuery, PullRequest};
use serde::Deserialize;
use tracing::{debug, info};

use crate::client::is_missing_pr;
use crate::{Error, GhClient, Repository, Result};

/// Fields requested from `gh pr list` / `gh pr view`
const PR_FIELDS: &str = "number,title,url,createdAt,author";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhPullRequest {
    number: i64,
    title: String,
    url: String,
    created_at: DateTime<Utc>,
    author: Option<GhActor>,
    #[serde(default)]
    labels: Vec<GhLabel>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GhActor {
    pub(crate) login: String,
}

#[derive(Debug, Deserialize)]
struct GhLabel {
    name: String,
}

/// Login shown by GitHub for deleted accounts
pub(crate) const GHOST_LOGIN: &str = "ghost";

pub(crate) fn login_of(actor: Option<GhActor>) -> String {
    actor
        .map(|a| a.login)
        .unwrap_or_else(|| GHOST_LOGIN.to_string())
}

impl From<GhPullRequest> for PullRequest {
    fn from(pr: GhPullRequest) -> Self {
        PullRequest {
            number: pr.number,
            title: pr.title,
            url: pr.url,
            author: login_of(pr.author),
            created_at: pr.created_at,
            labels: pr.labels.into_iter().map(|l| l.name).collect(),
        }
    }
}

/// Search qualifiers for `gh pr list --search`
fn search_terms(query: &PrQuery, bot_authors: &[String]) -> Option<String> {
    let mut terms = Vec::new();

    if let Some(label) = &query.label {
        if label.contains(char::is_whitespace) {
            terms.push(format!("label:\"{label}\""));
        } else {
            terms.push(format!("label:{label}"));
        }
    }

    if query.exclude_bots {
        terms.extend(bot_authors.iter().map(|bot| format!("-author:{bot}")));
    }

    (!terms.is_empty()).then(|| terms.join(" "))
}

impl GhClient {
    /// Merged pull requests of `repo`, newest first
    pub async fn merged_pull_requests(
        &self,
        repo: &Repository,
        query: &PrQuery,
    ) -> Result<Vec<PullRequest>> {
        let mut args = vec![
            "pr".to_string(),
            "list".to_string(),
            "--repo".to_string(),
            repo.to_string(),
            "--state".to_string(),
            "merged".to_string(),
            "--limit".to_string(),
            query.limit.to_string(),
        ];
        if let Some(search) = search_terms(query, self.bot_authors()) {
            args.push("--search".to_string());
            args.push(search);
        }
        args.push("--json".to_string());
        args.push(format!("{PR_FIELDS},labels"));

        let stdout = self.run_ok(args).await?;
        let prs: Vec<GhPullRequest> = serde_json::from_str(&stdout)
            .map_err(|e| Error::Parse(format!("gh pr list output: {e}")))?;

        info!(repo = %repo, count = prs.len(), "Listed merged pull requests");
        Ok(prs.into_iter().map(PullRequest::from).collect())
    }

    /// A single pull request by number
    pub async fn pull_request(&self, repo: &Repository, number: i64) -> Result<PullRequest> {
        debug!(repo = %repo, number, "Fetching pull request");

        let args = vec![
            "pr".to_string(),
            "view".to_string(),
            number.to_string(),
            "--repo".to_string(),
            repo.to_string(),
            "--json".to_string(),
            format!("{PR_FIELDS},labels"),
        ];

        let output = self.run(args).await?;
        if is_missing_pr(&output) {
            return Err(Error::PrNotFound(number));
        }

        let stdout = output.into_stdout(self.gh_path())?;
        let pr: GhPullRequest = serde_json::from_str(&stdout)
            .map_err(|e| Error::Parse(format!("gh pr view output: {e}")))?;
        Ok(pr.into())
    }
}
