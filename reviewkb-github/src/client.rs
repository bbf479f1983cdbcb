//! GitHub access through the `gh` command-line tool

use std::sync::Arc;

use async_trait::async_trait;
use reviewkb_core::collector::{PrQuery, PullRequest, PullRequestSource, ReviewComment};
use reviewkb_core::{CommandExecutor, CommandOutput, FilterConfig, ProcessExecutor};
use tracing::debug;

use crate::{Repository, Result};

/// GitHub client that shells out to an authenticated `gh`
#[derive(Clone)]
pub struct GhClient {
    gh_path: String,
    executor: Arc<dyn CommandExecutor>,
    bot_authors: Vec<String>,
}

impl GhClient {
    /// Client running `gh` from `PATH` as a real process
    pub fn new() -> Self {
        Self::with_executor(Arc::new(ProcessExecutor::new()))
    }

    pub fn with_executor(executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            gh_path: "gh".to_string(),
            executor,
            bot_authors: FilterConfig::default().exclude_authors,
        }
    }

    pub fn with_gh_path(mut self, gh_path: impl Into<String>) -> Self {
        self.gh_path = gh_path.into();
        self
    }

    /// Accounts excluded from listings when a query asks to skip bots
    pub fn with_bot_authors(mut self, authors: Vec<String>) -> Self {
        self.bot_authors = authors;
        self
    }

    pub fn gh_path(&self) -> &str {
        &self.gh_path
    }

    pub(crate) fn bot_authors(&self) -> &[String] {
        &self.bot_authors
    }

    /// Whether `gh` can be started at all
    pub async fn is_available(&self) -> bool {
        ProcessExecutor::check_available(&self.gh_path).await
    }

    /// Run `gh` and return its raw output, successful or not
    pub(crate) async fn run(&self, args: Vec<String>) -> Result<CommandOutput> {
        debug!(gh = %self.gh_path, ?args, "Running gh");
        Ok(self.executor.run(&self.gh_path, &args, None).await?)
    }

    /// Run `gh` and return stdout, failing on a non-zero exit
    pub(crate) async fn run_ok(&self, args: Vec<String>) -> Result<String> {
        let output = self.run(args).await?;
        Ok(output.into_stdout(&self.gh_path)?)
    }
}

impl Default for GhClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GhClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GhClient")
            .field("gh_path", &self.gh_path)
            .field("bot_authors", &self.bot_authors)
            .finish_non_exhaustive()
    }
}

/// `gh` reports a missing pull request on stderr rather than with a distinct exit code
pub(crate) fn is_missing_pr(output: &CommandOutput) -> bool {
    !output.is_success()
        && (output.stderr.contains("Could not resolve to a PullRequest")
            || output.stdout.contains("Could not resolve to a PullRequest"))
}

#[async_trait]
impl PullRequestSource for GhClient {
    async fn list_merged(
        &self,
        repository: &str,
        query: &PrQuery,
    ) -> reviewkb_core::Result<Vec<PullRequest>> {
        let repo = Repository::parse(repository)?;
        Ok(self.merged_pull_requests(&repo, query).await?)
    }

    async fn get_pull_request(
        &self,
        repository: &str,
        number: i64,
    ) -> reviewkb_core::Result<PullRequest> {
        let repo = Repository::parse(repository)?;
        Ok(self.pull_request(&repo, number).await?)
    }

    async fn review_comments(
        &self,
        repository: &str,
        number: i64,
    ) -> reviewkb_core::Result<Vec<ReviewComment>> {
        let repo = Repository::parse(repository)?;
        Ok(self.review_thread_comments(&repo, number).await?)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Executor that records invocations and replays canned outputs
    #[derive(Default)]
    pub struct RecordingExecutor {
        responses: Mutex<VecDeque<CommandOutput>>,
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl RecordingExecutor {
        pub fn replying(responses: Vec<CommandOutput>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        pub fn calls(&self) -> Vec<(String, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandExecutor for RecordingExecutor {
        async fn run(
            &self,
            program: &str,
            args: &[String],
            _stdin: Option<&str>,
        ) -> reviewkb_core::Result<CommandOutput> {
            self.calls
                .lock()
                .unwrap()
                .push((program.to_string(), args.to_vec()));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| reviewkb_core::Error::Other("no canned response left".to_string()))
        }
    }
}
