//! Review-thread comments through `gh api graphql`
//!
//! The REST API flattens review comments and loses thread structure, so
//! threads are fetched through GraphQL to keep path, line and reply order.

use chrono::{DateTime, Utc};
use reviewkb_core::collector::ReviewComment;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::client::is_missing_pr;
use crate::pulls::{login_of, GhActor};
use crate::{Error, GhClient, Repository, Result};

// TODO: paginate with reviewThreads.pageInfo for PRs with more than 100 threads
const REVIEW_THREADS_QUERY: &str = r#"
query($owner: String!, $repo: String!, $number: Int!) {
  repository(owner: $owner, name: $repo) {
    pullRequest(number: $number) {
      reviewThreads(first: 100) {
        nodes {
          path
          line
          comments(first: 50) {
            nodes {
              author { login }
              body
              createdAt
              url
            }
          }
        }
      }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct RepositoryData {
    repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    pull_request: Option<PullRequestNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestNode {
    review_threads: Connection<ThreadNode>,
}

#[derive(Debug, Deserialize)]
struct Connection<T> {
    nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ThreadNode {
    path: String,
    line: Option<i64>,
    comments: Connection<CommentNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentNode {
    author: Option<GhActor>,
    body: String,
    created_at: String,
    url: String,
}

impl GhClient {
    /// Every comment of every review thread on a pull request, thread by thread
    pub async fn review_thread_comments(
        &self,
        repo: &Repository,
        number: i64,
    ) -> Result<Vec<ReviewComment>> {
        let args = vec![
            "api".to_string(),
            "graphql".to_string(),
            "-f".to_string(),
            format!("query={REVIEW_THREADS_QUERY}"),
            "-f".to_string(),
            format!("owner={}", repo.owner),
            "-f".to_string(),
            format!("repo={}", repo.name),
            "-F".to_string(),
            format!("number={number}"),
        ];

        let output = self.run(args).await?;
        if is_missing_pr(&output) {
            return Err(Error::PrNotFound(number));
        }
        let stdout = output.into_stdout(self.gh_path())?;

        let comments = parse_review_threads(&stdout, number)?;
        debug!(repo = %repo, number, count = comments.len(), "Fetched review comments");
        Ok(comments)
    }
}

fn parse_review_threads(json: &str, number: i64) -> Result<Vec<ReviewComment>> {
    let response: GraphQLResponse<RepositoryData> = serde_json::from_str(json)?;

    if let Some(errors) = response.errors.filter(|e| !e.is_empty()) {
        let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
        return Err(Error::Parse(format!("GraphQL errors: {}", messages.join(", "))));
    }

    let pull_request = response
        .data
        .and_then(|d| d.repository)
        .and_then(|r| r.pull_request)
        .ok_or(Error::PrNotFound(number))?;

    let mut comments = Vec::new();
    for thread in pull_request.review_threads.nodes {
        let mut earlier: Vec<String> = Vec::new();

        for node in thread.comments.nodes {
            let Ok(created_at) = DateTime::parse_from_rfc3339(&node.created_at) else {
                warn!(url = %node.url, created_at = %node.created_at, "Skipping comment with invalid timestamp");
                continue;
            };

            let author = login_of(node.author);
            let thread_context = (!earlier.is_empty()).then(|| earlier.join("\n\n"));
            earlier.push(format!("{author}: {}", node.body.trim()));

            comments.push(ReviewComment {
                author,
                body: node.body,
                created_at: created_at.with_timezone(&Utc),
                url: node.url,
                path: thread.path.clone(),
                line: thread.line,
                thread_context,
            });
        }
    }

    Ok(comments)
}

#[cfg(test)]
mod tests {
    use reviewkb_core::collector::PullRequestSource;
    use reviewkb_core::CommandOutput;

    use super::*;
    use crate::client::testing::RecordingExecutor;

    const THREADS_JSON: &str = r#"{
      "data": {"repository": {"pullRequest": {"reviewThreads": {"nodes": [
        {"path": "src/auth/redirect.ts", "line": 14, "comments": {"nodes": [
          {"author": {"login": "carol"}, "body": "Validate the host before redirecting.",
           "createdAt": "2024-03-02T09:00:00Z", "url": "https://github.com/acme/widgets/pull/42#discussion_r1"},
          {"author": {"login": "alice"}, "body": "Good catch, will use an allowlist.",
           "createdAt": "2024-03-02T10:00:00Z", "url": "https://github.com/acme/widgets/pull/42#discussion_r2"},
          {"author": null, "body": "Broken timestamp",
           "createdAt": "yesterday", "url": "https://github.com/acme/widgets/pull/42#discussion_r3"}
        ]}},
        {"path": "go/retry.go", "line": null, "comments": {"nodes": [
          {"author": null, "body": "Extract this into a helper.",
           "createdAt": "2024-03-03T11:15:00+02:00", "url": "https://github.com/acme/widgets/pull/42#discussion_r4"}
        ]}}
      ]}}}}
    }"#;

    #[test]
    fn test_parse_threads_keeps_order_and_context() {
        let comments = parse_review_threads(THREADS_JSON, 42).unwrap();

        assert_eq!(comments.len(), 3);

        assert_eq!(comments[0].author, "carol");
        assert_eq!(comments[0].path, "src/auth/redirect.ts");
        assert_eq!(comments[0].line, Some(14));
        assert_eq!(comments[0].thread_context, None);

        assert_eq!(comments[1].author, "alice");
        assert_eq!(
            comments[1].thread_context.as_deref(),
            Some("carol: Validate the host before redirecting.")
        );

        assert_eq!(comments[2].author, "ghost");
        assert_eq!(comments[2].path, "go/retry.go");
        assert_eq!(comments[2].line, None);
        assert_eq!(comments[2].created_at.to_rfc3339(), "2024-03-03T09:15:00+00:00");
    }

    #[test]
    fn test_null_pull_request_is_not_found() {
        let json = r#"{"data": {"repository": {"pullRequest": null}}}"#;
        assert!(matches!(
            parse_review_threads(json, 9),
            Err(Error::PrNotFound(9))
        ));
    }

    #[test]
    fn test_graphql_errors_are_reported() {
        let json = r#"{"data": null, "errors": [{"message": "Something went wrong"}]}"#;
        match parse_review_threads(json, 9) {
            Err(Error::Parse(msg)) => assert!(msg.contains("Something went wrong")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_review_comments_arguments() {
        let executor = RecordingExecutor::replying(vec![CommandOutput::success(THREADS_JSON)]);
        let client = GhClient::with_executor(executor.clone());

        let comments = client.review_comments("acme/widgets", 42).await.unwrap();
        assert_eq!(comments.len(), 3);

        let (program, args) = executor.calls().remove(0);
        assert_eq!(program, "gh");
        assert_eq!(args[..2], ["api", "graphql"]);
        assert!(args[3].starts_with("query="));
        assert!(args[3].contains("reviewThreads(first: 100)"));
        assert_eq!(
            args[4..],
            ["-f", "owner=acme", "-f", "repo=widgets", "-F", "number=42"]
        );
    }

    #[tokio::test]
    async fn test_missing_pull_request_exit_is_not_found() {
        let executor = RecordingExecutor::replying(vec![CommandOutput::failure(
            1,
            "gh: Could not resolve to a PullRequest with the number of 5000.",
        )]);
        let client = GhClient::with_executor(executor);

        let err = client.review_comments("acme/widgets", 5000).await.unwrap_err();
        assert!(matches!(err, reviewkb_core::Error::NotFound(_)));
    }
}
