//! Collection progress repository

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::CollectionProgress;

/// Repository for per-repository collection checkpoints
pub struct ProgressRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProgressRepository<'a> {
    /// Create a new progress repository
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Record one collection run, accumulating the running totals
    pub async fn record(
        &self,
        repository: &str,
        last_pr_number: i64,
        prs_processed: i64,
        comments_collected: i64,
    ) -> Result<CollectionProgress> {
        let now = Utc::now();

        let progress = sqlx::query_as::<_, CollectionProgress>(
            r#"
            INSERT INTO collection_progress (
                repository, last_pr_number, last_collected_at,
                total_prs_processed, total_comments_collected, status,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, 'active', ?, ?)
            ON CONFLICT(repository) DO UPDATE SET
                last_pr_number = excluded.last_pr_number,
                last_collected_at = excluded.last_collected_at,
                total_prs_processed = total_prs_processed + excluded.total_prs_processed,
                total_comments_collected = total_comments_collected + excluded.total_comments_collected,
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(repository)
        .bind(last_pr_number)
        .bind(now)
        .bind(prs_processed)
        .bind(comments_collected)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        Ok(progress)
    }

    /// Get the checkpoint for a repository, if any collection has run
    pub async fn get(&self, repository: &str) -> Result<Option<CollectionProgress>> {
        sqlx::query_as::<_, CollectionProgress>(
            "SELECT * FROM collection_progress WHERE repository = ?",
        )
        .bind(repository)
        .fetch_optional(self.pool)
        .await
        .map_err(Into::into)
    }
}
