//! Collect command - turn merged PR review comments into stored documents

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Args;
use reviewkb_core::collector::DocumentStore;
use reviewkb_core::{
    CollectOptions, CollectionReport, Collector, CommentFilter, Config, FallbackAnalyzer,
    ProcessExecutor,
};
use reviewkb_db::Database;
use reviewkb_github::{parse_pr_url, GhClient, Repository};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Arguments for the collect command
#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Repository as owner/repo or GitHub URL (defaults to the first configured one)
    #[arg(short, long)]
    pub repo: Option<String>,

    /// Maximum number of merged PRs to fetch
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Only PRs carrying this label
    #[arg(long)]
    pub label: Option<String>,

    /// Keep PRs authored by bot accounts
    #[arg(long)]
    pub include_bots: bool,

    /// Process PRs that already have stored documents
    #[arg(long)]
    pub no_skip_processed: bool,

    /// Reprocess a single PR, replacing its stored documents
    #[arg(long, conflicts_with_all = ["repo", "limit", "label"])]
    pub pr_url: Option<String>,
}

impl CollectArgs {
    /// Execute the collect command
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let db_config = config.database_config();
        let db = Database::connect(db_config.clone())
            .await
            .with_context(|| format!("Failed to open database {}", db_config.path.display()))?;
        db.migrate().await.context("Failed to apply database migrations")?;

        let executor = Arc::new(ProcessExecutor::new());
        let gh = GhClient::with_executor(executor.clone())
            .with_gh_path(config.github.gh_path.clone())
            .with_bot_authors(config.filter.exclude_authors.clone());
        if !gh.is_available().await {
            bail!(
                "GitHub CLI not found at '{}'. Install gh and run `gh auth login`",
                gh.gh_path()
            );
        }

        let analyzer = FallbackAnalyzer::from_config(&config.analysis, executor)
            .context("Failed to set up analysis drivers")?;
        info!(drivers = ?analyzer.driver_names(), "Analysis drivers ready");

        let store: Arc<dyn DocumentStore> = Arc::new(db.clone());
        let collector = Collector::new(
            Arc::new(gh),
            store,
            analyzer,
            CommentFilter::new(config.filter.clone()),
        )
        .with_parallelism(config.analysis.parallel);

        let cancel = CancellationToken::new();
        let watchdog = spawn_watchdog(cancel.clone(), config.collection.timeout);

        let result = if let Some(url) = &self.pr_url {
            let (repo, number) = parse_pr_url(url)?;
            println!("Reprocessing {repo}#{number}");
            collector.reprocess_pr(&repo.to_string(), number, &cancel).await
        } else {
            let options = self.options(config)?;
            println!(
                "Collecting up to {} merged PRs from {}",
                options.limit, options.repository
            );
            collector.collect(&options, &cancel).await
        };

        watchdog.abort();

        let report = match result {
            Ok(report) => report,
            Err(reviewkb_core::Error::Cancelled) => {
                db.close().await;
                bail!(
                    "Collection cancelled (interrupted or exceeded {:?})",
                    config.collection.timeout
                );
            }
            Err(e) => {
                db.close().await;
                return Err(e).context("Collection failed");
            }
        };

        print_report(&report);
        db.close().await;
        Ok(())
    }

    fn options(&self, config: &Config) -> anyhow::Result<CollectOptions> {
        let repo = match (&self.repo, config.default_repository()) {
            (Some(repo), _) => repo.as_str(),
            (None, Some(repo)) => repo,
            (None, None) => bail!("No repository given. Pass --repo or set github.repositories"),
        };
        let repo = Repository::parse(repo)?;

        let requested = self.limit.unwrap_or(config.collection.default_limit);
        if requested == 0 {
            bail!("--limit must be at least 1");
        }
        let limit = requested.min(config.collection.max_prs_per_run);
        if limit < requested {
            warn!(
                requested,
                max = config.collection.max_prs_per_run,
                "Limit capped by collection.max_prs_per_run"
            );
        }

        let mut options = CollectOptions::new(repo.to_string(), limit);
        options.label = self.label.clone();
        options.exclude_bots = !self.include_bots;
        options.skip_processed = !self.no_skip_processed;
        Ok(options)
    }
}

/// Cancel the run on Ctrl-C or when the deadline passes
fn spawn_watchdog(cancel: CancellationToken, timeout: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, cancelling collection");
            }
            _ = tokio::time::sleep(timeout) => {
                warn!(timeout = ?timeout, "Collection deadline reached, cancelling");
            }
        }
        cancel.cancel();
    })
}

fn print_report(report: &CollectionReport) {
    println!();
    println!("Collection Summary");
    println!("==================");
    println!("  PRs listed:           {}", report.prs_listed);
    println!("  Skipped (processed):  {}", report.prs_skipped_processed);
    println!("  PRs processed:        {}", report.prs_processed);
    println!("  PRs failed:           {}", report.prs_failed);
    println!(
        "  Comments kept:        {} of {}",
        report.comments_kept, report.comments_fetched
    );
    println!("  Documents saved:      {}", report.documents_saved);
    println!("  Documents degraded:   {}", report.documents_degraded);
    println!("  Documents failed:     {}", report.documents_failed);
    println!();

    if report.is_empty() {
        if report.prs_listed > 0 && report.prs_listed == report.prs_skipped_processed {
            println!("No results: all PRs have already been processed");
            println!("Use --no-skip-processed to reprocess them");
        } else {
            println!("No results: no new documents were collected");
        }
    }
}
