//! Fetch, filter, analyze and persist review comments of merged pull requests

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use reviewkb_db::NewDocument;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::batch::run_bounded;
use super::source::{PrQuery, PullRequestSource};
use super::store::DocumentStore;
use super::types::{PullRequest, ReviewComment};
use crate::analysis::{AnalysisOutcome, AnalysisResult, FallbackAnalyzer, PromptBuilder};
use crate::file_info::{directory_for, language_for};
use crate::filter::CommentFilter;
use crate::{Error, Result};

/// What to collect in one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectOptions {
    /// Repository in `owner/repo` form
    pub repository: String,
    /// Maximum number of merged PRs to list
    pub limit: usize,
    /// Only PRs carrying this label
    pub label: Option<String>,
    /// Exclude PRs authored by bots at query time
    pub exclude_bots: bool,
    /// Skip PRs that already have stored documents
    pub skip_processed: bool,
}

impl CollectOptions {
    pub fn new(repository: impl Into<String>, limit: usize) -> Self {
        Self {
            repository: repository.into(),
            limit,
            label: None,
            exclude_bots: true,
            skip_processed: true,
        }
    }

    fn query(&self) -> PrQuery {
        PrQuery {
            limit: self.limit,
            label: self.label.clone(),
            exclude_bots: self.exclude_bots,
        }
    }
}

/// Counters describing a collection run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    pub prs_listed: usize,
    pub prs_skipped_processed: usize,
    pub prs_processed: usize,
    pub prs_failed: usize,
    pub comments_fetched: usize,
    pub comments_kept: usize,
    pub documents_saved: usize,
    pub documents_degraded: usize,
    pub documents_failed: usize,
    /// Highest PR number whose comments were fetched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_pr_number: Option<i64>,
}

/// Drop PRs whose numbers are in `processed`, keeping the rest in order
pub fn skip_processed(prs: Vec<PullRequest>, processed: &BTreeSet<i64>) -> Vec<PullRequest> {
    prs.into_iter()
        .filter(|pr| !processed.contains(&pr.number))
        .collect()
}

/// Run `fut` unless `cancel` fires first
async fn guarded<T>(cancel: &CancellationToken, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = fut => result,
    }
}

/// Orchestrates one collection run
#[derive(Clone)]
pub struct Collector {
    source: Arc<dyn PullRequestSource>,
    store: Arc<dyn DocumentStore>,
    analyzer: Arc<FallbackAnalyzer>,
    filter: CommentFilter,
    parallel: usize,
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("analyzer", &self.analyzer)
            .field("filter", &self.filter)
            .field("parallel", &self.parallel)
            .finish()
    }
}

impl Collector {
    pub fn new(
        source: Arc<dyn PullRequestSource>,
        store: Arc<dyn DocumentStore>,
        analyzer: FallbackAnalyzer,
        filter: CommentFilter,
    ) -> Self {
        Self {
            source,
            store,
            analyzer: Arc::new(analyzer),
            filter,
            parallel: 1,
        }
    }

    /// Analyze up to `parallel` comments of a PR at once
    pub fn with_parallelism(mut self, parallel: usize) -> Self {
        self.parallel = parallel.max(1);
        self
    }

    /// Collect documents from the merged PRs described by `options`
    ///
    /// Only a failure to list PRs (or cancellation) fails the run; per-PR and
    /// per-document failures are counted in the report.
    pub async fn collect(
        &self,
        options: &CollectOptions,
        cancel: &CancellationToken,
    ) -> Result<CollectionReport> {
        let repository = options.repository.as_str();
        let mut report = CollectionReport::default();

        info!(
            repository,
            limit = options.limit,
            label = options.label.as_deref().unwrap_or(""),
            exclude_bots = options.exclude_bots,
            "Fetching merged pull requests"
        );
        let mut prs = guarded(cancel, self.source.list_merged(repository, &options.query())).await?;
        report.prs_listed = prs.len();

        if options.skip_processed && !prs.is_empty() {
            match self.store.processed_pr_numbers(repository).await {
                Ok(processed) => {
                    let before = prs.len();
                    prs = skip_processed(prs, &processed);
                    report.prs_skipped_processed = before - prs.len();
                    if report.prs_skipped_processed > 0 {
                        info!(
                            repository,
                            skipped = report.prs_skipped_processed,
                            "Skipping already processed pull requests"
                        );
                    }
                }
                Err(e) => {
                    warn!(repository, error = %e, "Could not load processed PRs, processing all");
                }
            }
        }

        for (index, pr) in prs.iter().enumerate() {
            info!(
                repository,
                pr = pr.number,
                progress = format!("{}/{}", index + 1, prs.len()),
                title = %pr.title,
                "Processing pull request"
            );
            self.process_pr(repository, pr, &mut report, cancel).await?;
        }

        self.finish(repository, &report).await;
        Ok(report)
    }

    /// Replace the documents of one PR with freshly collected ones
    ///
    /// The PR and its comments are fetched, then every stored document of
    /// the PR is deleted before the comments are processed again. The
    /// skip-processed check does not apply. A missing PR or failed fetch
    /// fails the call and leaves stored documents untouched.
    pub async fn reprocess_pr(
        &self,
        repository: &str,
        pr_number: i64,
        cancel: &CancellationToken,
    ) -> Result<CollectionReport> {
        let mut report = CollectionReport::default();

        let pr = guarded(cancel, self.source.get_pull_request(repository, pr_number)).await?;
        report.prs_listed = 1;
        let comments = guarded(cancel, self.source.review_comments(repository, pr_number)).await?;

        let deleted = self.store.delete_by_pr(repository, pr_number).await?;
        info!(repository, pr = pr_number, deleted, "Removed existing documents for reprocessing");

        self.process_comments(repository, &pr, comments, &mut report, cancel)
            .await?;

        self.finish(repository, &report).await;
        Ok(report)
    }

    /// Fetch and handle one PR; only cancellation is returned as an error
    async fn process_pr(
        &self,
        repository: &str,
        pr: &PullRequest,
        report: &mut CollectionReport,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let comments =
            match guarded(cancel, self.source.review_comments(repository, pr.number)).await {
                Ok(comments) => comments,
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    warn!(repository, pr = pr.number, error = %e, "Failed to fetch review comments");
                    report.prs_failed += 1;
                    return Ok(());
                }
            };

        self.process_comments(repository, pr, comments, report, cancel)
            .await
    }

    async fn process_comments(
        &self,
        repository: &str,
        pr: &PullRequest,
        comments: Vec<ReviewComment>,
        report: &mut CollectionReport,
        cancel: &CancellationToken,
    ) -> Result<()> {
        report.prs_processed += 1;
        report.last_pr_number = report.last_pr_number.max(Some(pr.number));
        report.comments_fetched += comments.len();

        if comments.is_empty() {
            info!(repository, pr = pr.number, "No review comments");
            return Ok(());
        }

        let kept = self.filter.filter_comments(comments);
        report.comments_kept += kept.len();
        if kept.is_empty() {
            info!(repository, pr = pr.number, "No useful comments after filtering");
            return Ok(());
        }
        debug!(repository, pr = pr.number, kept = kept.len(), "Analyzing comments");

        let outcomes = self.analyze_all(repository, pr, &kept, cancel).await?;

        for (comment, outcome) in kept.iter().zip(outcomes) {
            if let AnalysisOutcome::Degraded { cause, .. } = &outcome {
                warn!(
                    repository,
                    pr = pr.number,
                    comment = %comment.url,
                    cause = %cause,
                    "Analysis failed, storing degraded document"
                );
                report.documents_degraded += 1;
            }

            let document = build_document(repository, pr, comment, outcome.into_result());
            match self.store.upsert(&document).await {
                Ok(saved) => {
                    debug!(id = saved.id, comment = %saved.comment_url, "Document saved");
                    report.documents_saved += 1;
                }
                Err(e) => {
                    warn!(
                        repository,
                        pr = pr.number,
                        comment = %comment.url,
                        error = %e,
                        "Failed to save document"
                    );
                    report.documents_failed += 1;
                }
            }
        }

        Ok(())
    }

    /// Analyze every comment, bounded by the configured parallelism
    ///
    /// Outcomes are returned in comment order.
    async fn analyze_all(
        &self,
        repository: &str,
        pr: &PullRequest,
        comments: &[ReviewComment],
        cancel: &CancellationToken,
    ) -> Result<Vec<AnalysisOutcome>> {
        let jobs: Vec<(String, String)> = comments
            .iter()
            .map(|comment| {
                let prompt = PromptBuilder::new()
                    .pull_request(repository, pr)
                    .comment(comment, language_for(&comment.path))
                    .build();
                (prompt, comment.path.clone())
            })
            .collect();

        let analyzer = self.analyzer.clone();
        let token = cancel.clone();
        let results = run_bounded(jobs, self.parallel, move |(prompt, path)| {
            let analyzer = analyzer.clone();
            let token = token.clone();
            async move {
                guarded(&token, async {
                    Ok(analyzer.analyze_or_degrade(&prompt, &path).await)
                })
                .await
            }
        })
        .await;

        let mut outcomes = Vec::with_capacity(results.len());
        for (comment, result) in comments.iter().zip(results) {
            // Flatten the task result and the guarded analysis result
            match result.and_then(|inner| inner) {
                Ok(outcome) => outcomes.push(outcome),
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => outcomes.push(AnalysisOutcome::Degraded {
                    result: AnalysisResult::degraded(&comment.path),
                    cause: e.to_string(),
                }),
            }
        }
        Ok(outcomes)
    }

    /// Best-effort progress checkpoint and run summary
    async fn finish(&self, repository: &str, report: &CollectionReport) {
        if let Some(last_pr) = report.last_pr_number {
            if let Err(e) = self
                .store
                .record_progress(
                    repository,
                    last_pr,
                    report.prs_processed as i64,
                    report.documents_saved as i64,
                )
                .await
            {
                warn!(repository, error = %e, "Failed to record collection progress");
            }
        }

        info!(
            repository,
            prs_processed = report.prs_processed,
            prs_failed = report.prs_failed,
            comments_kept = report.comments_kept,
            documents_saved = report.documents_saved,
            documents_degraded = report.documents_degraded,
            documents_failed = report.documents_failed,
            "Collection finished"
        );
    }
}

/// Fold a comment and its analysis into a storable document
pub fn build_document(
    repository: &str,
    pr: &PullRequest,
    comment: &ReviewComment,
    result: AnalysisResult,
) -> NewDocument {
    NewDocument {
        summary: result.summary,
        original_comment: comment.body.clone(),
        thread_context: comment.thread_context.clone(),
        file_path: comment.path.clone(),
        directory_path: directory_for(&comment.path),
        language: language_for(&comment.path).to_string(),
        line_number: comment.line,
        repository: repository.to_string(),
        pr_number: pr.number,
        pr_title: pr.title.clone(),
        pr_url: pr.url.clone(),
        comment_url: comment.url.clone(),
        author: comment.author.clone(),
        comment_type: result.comment_type,
        tags: result.tags,
        relevance_score: result.relevance_score,
        commented_at: comment.created_at,
    }
}

impl CollectionReport {
    /// Whether nothing new was stored
    pub fn is_empty(&self) -> bool {
        self.documents_saved == 0
    }

    /// One-line summary for terminal output
    pub fn summary_line(&self) -> String {
        format!(
            "{} PRs processed ({} skipped, {} failed), {} of {} comments kept, {} documents saved ({} degraded, {} failed)",
            self.prs_processed,
            self.prs_skipped_processed,
            self.prs_failed,
            self.comments_kept,
            self.comments_fetched,
            self.documents_saved,
            self.documents_degraded,
            self.documents_failed,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::stub::ScriptedBackend;
    use crate::analysis::{AnalysisBackend, AnalysisDriver};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use reviewkb_db::Database;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const REPO: &str = "acme/widgets";

    #[derive(Default)]
    struct StubSource {
        prs: Vec<PullRequest>,
        comments: HashMap<i64, Vec<ReviewComment>>,
        failing: Vec<i64>,
        comment_calls: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl PullRequestSource for StubSource {
        async fn list_merged(&self, _repository: &str, query: &PrQuery) -> Result<Vec<PullRequest>> {
            Ok(self.prs.iter().take(query.limit).cloned().collect())
        }

        async fn get_pull_request(&self, _repository: &str, number: i64) -> Result<PullRequest> {
            self.prs
                .iter()
                .find(|pr| pr.number == number)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("PR #{number}")))
        }

        async fn review_comments(&self, _repository: &str, number: i64) -> Result<Vec<ReviewComment>> {
            self.comment_calls.lock().unwrap().push(number);
            if self.failing.contains(&number) {
                return Err(Error::Process("gh failed".to_string()));
            }
            Ok(self.comments.get(&number).cloned().unwrap_or_default())
        }
    }

    fn pr(number: i64) -> PullRequest {
        PullRequest {
            number,
            title: format!("Change {number}"),
            url: format!("https://github.com/{REPO}/pull/{number}"),
            author: "alice".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            labels: Vec::new(),
        }
    }

    fn comment(pr: i64, id: u32, author: &str, body: &str) -> ReviewComment {
        ReviewComment {
            author: author.to_string(),
            body: body.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 2, 9, 30, 0).unwrap(),
            url: format!("https://github.com/{REPO}/pull/{pr}#discussion_r{id}"),
            path: "src/handlers/auth.rs".to_string(),
            line: Some(42),
            thread_context: None,
        }
    }

    fn analyzer(backend: ScriptedBackend) -> FallbackAnalyzer {
        FallbackAnalyzer::new(AnalysisDriver::single_attempt(Arc::new(backend)))
    }

    fn collector(source: StubSource, db: &Database, backend: ScriptedBackend) -> Collector {
        Collector::new(
            Arc::new(source),
            Arc::new(db.clone()),
            analyzer(backend),
            CommentFilter::default(),
        )
        .with_parallelism(3)
    }

    #[test]
    fn test_skip_processed_preserves_order() {
        let prs = vec![pr(100), pr(101), pr(102), pr(103)];
        let processed = BTreeSet::from([101, 103]);

        let remaining: Vec<i64> = skip_processed(prs, &processed)
            .into_iter()
            .map(|pr| pr.number)
            .collect();
        assert_eq!(remaining, vec![100, 102]);
    }

    #[test]
    fn test_build_document_derives_file_fields() {
        let result = AnalysisResult::degraded("src/handlers/auth.rs");
        let doc = build_document(REPO, &pr(7), &comment(7, 1, "bob", "Validate input."), result);

        assert_eq!(doc.directory_path, "src/handlers");
        assert_eq!(doc.language, "rust");
        assert_eq!(doc.line_number, Some(42));
        assert_eq!(doc.pr_url, "https://github.com/acme/widgets/pull/7");
        assert_eq!(doc.relevance_score, 0.3);
    }

    #[tokio::test]
    async fn test_collect_isolates_failing_pr() {
        let db = Database::in_memory().await.unwrap();
        let mut source = StubSource {
            prs: vec![pr(1), pr(2)],
            failing: vec![1],
            ..Default::default()
        };
        source.comments.insert(
            2,
            vec![comment(2, 1, "bob", "Wrap this lookup in a transaction to avoid races.")],
        );

        let report = collector(source, &db, ScriptedBackend::always_succeeding("stub"))
            .collect(&CollectOptions::new(REPO, 10), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.prs_listed, 2);
        assert_eq!(report.prs_failed, 1);
        assert_eq!(report.prs_processed, 1);
        assert_eq!(report.documents_saved, 1);
        assert_eq!(db.documents().count_by_repository(REPO).await.unwrap(), 1);

        let progress = db.progress().get(REPO).await.unwrap().unwrap();
        assert_eq!(progress.last_pr_number, 2);
        assert_eq!(progress.total_comments_collected, 1);
    }

    #[tokio::test]
    async fn test_analysis_failure_stores_degraded_document() {
        let db = Database::in_memory().await.unwrap();
        let mut source = StubSource {
            prs: vec![pr(5)],
            ..Default::default()
        };
        source.comments.insert(
            5,
            vec![comment(5, 1, "bob", "This retry loop never gives up on permanent errors.")],
        );

        let report = collector(source, &db, ScriptedBackend::always_failing("stub"))
            .collect(&CollectOptions::new(REPO, 10), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.documents_saved, 1);
        assert_eq!(report.documents_degraded, 1);

        let docs = db.documents().list_by_pr(REPO, 5).await.unwrap();
        assert_eq!(docs[0].summary, "Review comment about src/handlers/auth.rs");
        assert_eq!(docs[0].tags, vec!["review", "feedback"]);
    }

    #[tokio::test]
    async fn test_analysis_keeps_comment_order_under_parallelism() {
        let db = Database::in_memory().await.unwrap();
        let mut source = StubSource {
            prs: vec![pr(9)],
            ..Default::default()
        };
        source.comments.insert(
            9,
            (1..=6)
                .map(|i| comment(9, i, "bob", &format!("Consider caching result number {i} here.")))
                .collect(),
        );

        let report = collector(source, &db, ScriptedBackend::always_succeeding("stub"))
            .collect(&CollectOptions::new(REPO, 10), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.documents_saved, 6);

        // Documents are inserted in comment order, so ids follow comment order
        let mut by_id = db.documents().list_by_pr(REPO, 9).await.unwrap();
        by_id.sort_by_key(|d| d.id);
        let urls: Vec<String> = by_id.into_iter().map(|d| d.comment_url).collect();
        let expected: Vec<String> = (1..=6)
            .map(|i| format!("https://github.com/{REPO}/pull/9#discussion_r{i}"))
            .collect();
        assert_eq!(urls, expected);
    }

    #[tokio::test]
    async fn test_reprocess_pr_replaces_only_that_pr() {
        let db = Database::in_memory().await.unwrap();
        let mut source = StubSource {
            prs: vec![pr(123), pr(124)],
            ..Default::default()
        };
        source.comments.insert(
            123,
            vec![
                comment(123, 1, "bob", "Guard against an empty slice before indexing."),
                comment(123, 2, "carol", "Prefer a bounded channel for backpressure."),
            ],
        );
        source.comments.insert(
            124,
            vec![comment(124, 3, "dave", "This migration needs a down step as well.")],
        );
        let collector = collector(source, &db, ScriptedBackend::always_succeeding("stub"));
        let cancel = CancellationToken::new();

        collector
            .collect(&CollectOptions::new(REPO, 10), &cancel)
            .await
            .unwrap();
        let before_124 = db.documents().list_by_pr(REPO, 124).await.unwrap();
        let before_123 = db.documents().list_by_pr(REPO, 123).await.unwrap();
        assert_eq!(before_123.len(), 2);

        let report = collector.reprocess_pr(REPO, 123, &cancel).await.unwrap();
        assert_eq!(report.documents_saved, 2);

        let after_123 = db.documents().list_by_pr(REPO, 123).await.unwrap();
        assert_eq!(after_123.len(), 2);
        // Re-created rows get new ids
        assert!(after_123.iter().all(|d| before_123.iter().all(|b| b.id != d.id)));
        assert_eq!(db.documents().list_by_pr(REPO, 124).await.unwrap(), before_124);
    }

    #[tokio::test]
    async fn test_reprocess_missing_pr_is_error() {
        let db = Database::in_memory().await.unwrap();
        let collector = collector(
            StubSource::default(),
            &db,
            ScriptedBackend::always_succeeding("stub"),
        );

        let result = collector
            .reprocess_pr(REPO, 404, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_cancelled_run_starts_no_fetches() {
        let db = Database::in_memory().await.unwrap();
        let source = Arc::new(StubSource {
            prs: vec![pr(1)],
            ..Default::default()
        });
        let collector = Collector::new(
            source.clone(),
            Arc::new(db.clone()),
            analyzer(ScriptedBackend::always_succeeding("stub")),
            CommentFilter::default(),
        );

        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = collector.collect(&CollectOptions::new(REPO, 10), &cancel).await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(source.comment_calls.lock().unwrap().is_empty());
    }

    /// Backend whose answer never arrives in test time
    struct HangingBackend;

    #[async_trait]
    impl AnalysisBackend for HangingBackend {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn invoke(&self, _prompt: &str) -> Result<String> {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            Ok(String::new())
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_cancel_during_analysis_aborts_run() {
        let db = Database::in_memory().await.unwrap();
        let mut source = StubSource {
            prs: vec![pr(1), pr(2)],
            ..Default::default()
        };
        source.comments.insert(
            1,
            vec![
                comment(1, 1, "bob", "Guard against an empty slice before indexing."),
                comment(1, 2, "carol", "Prefer a bounded channel for backpressure."),
            ],
        );
        let source = Arc::new(source);
        let collector = Collector::new(
            source.clone(),
            Arc::new(db.clone()),
            FallbackAnalyzer::new(AnalysisDriver::single_attempt(Arc::new(HangingBackend))),
            CommentFilter::default(),
        )
        .with_parallelism(2);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            collector.collect(&CollectOptions::new(REPO, 10), &cancel),
        )
        .await
        .expect("cancelled run must not hang");

        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(db.documents().count_by_repository(REPO).await.unwrap(), 0);
        // The second PR is never reached
        assert_eq!(*source.comment_calls.lock().unwrap(), vec![1]);
    }
}
