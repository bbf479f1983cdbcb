//! Persistence seam used by the collector

use std::collections::BTreeSet;

use async_trait::async_trait;
use reviewkb_db::{Database, Document, NewDocument};

use crate::Result;

/// Document storage as seen by the collector
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert or update the document keyed by (repository, PR, comment URL)
    async fn upsert(&self, document: &NewDocument) -> Result<Document>;

    /// PR numbers of `repository` with at least one stored document
    async fn processed_pr_numbers(&self, repository: &str) -> Result<BTreeSet<i64>>;

    /// Remove every document of one PR, returning how many were deleted
    async fn delete_by_pr(&self, repository: &str, pr_number: i64) -> Result<u64>;

    /// Accumulate collection progress for `repository`
    async fn record_progress(
        &self,
        repository: &str,
        last_pr_number: i64,
        prs_processed: i64,
        documents_collected: i64,
    ) -> Result<()>;
}

#[async_trait]
impl DocumentStore for Database {
    async fn upsert(&self, document: &NewDocument) -> Result<Document> {
        Ok(self.documents().upsert(document).await?)
    }

    async fn processed_pr_numbers(&self, repository: &str) -> Result<BTreeSet<i64>> {
        Ok(self.documents().processed_pr_numbers(repository).await?)
    }

    async fn delete_by_pr(&self, repository: &str, pr_number: i64) -> Result<u64> {
        Ok(self.documents().delete_by_pr(repository, pr_number).await?)
    }

    async fn record_progress(
        &self,
        repository: &str,
        last_pr_number: i64,
        prs_processed: i64,
        documents_collected: i64,
    ) -> Result<()> {
        self.progress()
            .record(repository, last_pr_number, prs_processed, documents_collected)
            .await?;
        Ok(())
    }
}
