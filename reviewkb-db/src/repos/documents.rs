//! Document repository: idempotent upsert, processed-PR index, search

use std::collections::BTreeSet;

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Document, DocumentQuery, DocumentRow, NewDocument};

/// Repository for knowledge documents
pub struct DocumentRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> DocumentRepository<'a> {
    /// Create a new document repository
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a document, or update the mutable fields of the existing row
    /// with the same (repository, pr_number, comment_url).
    ///
    /// `id` and `collected_at` of an existing row are left untouched.
    pub async fn upsert(&self, doc: &NewDocument) -> Result<Document> {
        let now = Utc::now();
        let tags_json = serde_json::to_string(&doc.tags)?;

        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            INSERT INTO documents (
                summary, original_comment, thread_context,
                file_path, directory_path, language, line_number,
                repository, pr_number, pr_title, pr_url, comment_url,
                author, comment_type, tags, relevance_score,
                commented_at, collected_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(repository, pr_number, comment_url) DO UPDATE SET
                summary = excluded.summary,
                comment_type = excluded.comment_type,
                tags = excluded.tags,
                relevance_score = excluded.relevance_score,
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(&doc.summary)
        .bind(&doc.original_comment)
        .bind(&doc.thread_context)
        .bind(&doc.file_path)
        .bind(&doc.directory_path)
        .bind(&doc.language)
        .bind(doc.line_number)
        .bind(&doc.repository)
        .bind(doc.pr_number)
        .bind(&doc.pr_title)
        .bind(&doc.pr_url)
        .bind(&doc.comment_url)
        .bind(&doc.author)
        .bind(doc.comment_type.as_str())
        .bind(&tags_json)
        .bind(doc.relevance_score)
        .bind(doc.commented_at)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        debug!(
            id = row.id,
            repository = %doc.repository,
            pr_number = doc.pr_number,
            "Upserted document"
        );

        row.try_into()
    }

    /// Get a document by id
    pub async fn get(&self, id: i64) -> Result<Document> {
        sqlx::query_as::<_, DocumentRow>("SELECT * FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("document {id}")))?
            .try_into()
    }

    /// Get a document by its natural key
    pub async fn get_by_key(
        &self,
        repository: &str,
        pr_number: i64,
        comment_url: &str,
    ) -> Result<Option<Document>> {
        sqlx::query_as::<_, DocumentRow>(
            "SELECT * FROM documents WHERE repository = ? AND pr_number = ? AND comment_url = ?",
        )
        .bind(repository)
        .bind(pr_number)
        .bind(comment_url)
        .fetch_optional(self.pool)
        .await?
        .map(Document::try_from)
        .transpose()
    }

    /// Distinct PR numbers that already have at least one document
    pub async fn processed_pr_numbers(&self, repository: &str) -> Result<BTreeSet<i64>> {
        let numbers = sqlx::query_scalar::<_, i64>(
            "SELECT DISTINCT pr_number FROM documents WHERE repository = ?",
        )
        .bind(repository)
        .fetch_all(self.pool)
        .await?;

        Ok(numbers.into_iter().collect())
    }

    /// Delete every document of one pull request, returning how many were removed
    pub async fn delete_by_pr(&self, repository: &str, pr_number: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM documents WHERE repository = ? AND pr_number = ?")
            .bind(repository)
            .bind(pr_number)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// List the documents of one pull request in insertion order
    pub async fn list_by_pr(&self, repository: &str, pr_number: i64) -> Result<Vec<Document>> {
        sqlx::query_as::<_, DocumentRow>(
            "SELECT * FROM documents WHERE repository = ? AND pr_number = ? ORDER BY id ASC",
        )
        .bind(repository)
        .bind(pr_number)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(Document::try_from)
        .collect()
    }

    /// Count documents for a repository
    pub async fn count_by_repository(&self, repository: &str) -> Result<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM documents WHERE repository = ?")
                .bind(repository)
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }

    /// Search documents, most relevant and most recent first
    pub async fn search(&self, query: &DocumentQuery) -> Result<Vec<Document>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM documents WHERE 1=1");

        if let Some(dir) = non_empty(&query.directory) {
            qb.push(" AND (directory_path LIKE ")
                .push_bind(format!("%{dir}%"))
                .push(" OR file_path LIKE ")
                .push_bind(format!("%{dir}/%"))
                .push(")");
        }
        if let Some(file) = non_empty(&query.file) {
            qb.push(" AND file_path LIKE ").push_bind(format!("%{file}%"));
        }
        if let Some(author) = non_empty(&query.author) {
            qb.push(" AND author LIKE ").push_bind(format!("%{author}%"));
        }
        if let Some(comment_type) = query.comment_type {
            qb.push(" AND comment_type = ").push_bind(comment_type.as_str());
        }
        if let Some(keyword) = non_empty(&query.keyword) {
            let pattern = format!("%{keyword}%");
            qb.push(" AND (summary LIKE ")
                .push_bind(pattern.clone())
                .push(" OR original_comment LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(repository) = non_empty(&query.repository) {
            qb.push(" AND repository = ").push_bind(repository.to_string());
        }

        qb.push(" ORDER BY relevance_score DESC, commented_at DESC");

        if let Some(limit) = query.limit {
            qb.push(" LIMIT ").push_bind(i64::from(limit));
        }

        qb.build_query_as::<DocumentRow>()
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(Document::try_from)
            .collect()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::CommentType;
    use chrono::{Duration, TimeZone};

    fn doc(pr_number: i64, comment: &str) -> NewDocument {
        NewDocument {
            summary: format!("Summary for {comment}"),
            original_comment: format!("Original {comment}"),
            thread_context: None,
            file_path: "src/payments/charge.rb".to_string(),
            directory_path: "src/payments".to_string(),
            language: "ruby".to_string(),
            line_number: Some(42),
            repository: "owner/repo".to_string(),
            pr_number,
            pr_title: format!("PR {pr_number}"),
            pr_url: format!("https://github.com/owner/repo/pull/{pr_number}"),
            comment_url: format!(
                "https://github.com/owner/repo/pull/{pr_number}#discussion_{comment}"
            ),
            author: "reviewer1".to_string(),
            comment_type: CommentType::Implementation,
            tags: vec!["ruby".to_string(), "payments".to_string()],
            relevance_score: 0.8,
            commented_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_upsert_inserts_new_document() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.documents();

        let saved = repo.upsert(&doc(123, "c1")).await.unwrap();

        assert!(saved.id > 0);
        assert_eq!(saved.pr_number, 123);
        assert_eq!(saved.tags, vec!["ruby", "payments"]);
        assert_eq!(saved.comment_type, CommentType::Implementation);
        assert_eq!(saved.line_number, Some(42));
        assert_eq!(saved.collected_at, saved.updated_at);
    }

    #[tokio::test]
    async fn test_upsert_same_key_updates_in_place() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.documents();

        let first = repo.upsert(&doc(123, "c1")).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let mut changed = doc(123, "c1");
        changed.summary = "A better summary".to_string();
        changed.comment_type = CommentType::Security;
        changed.tags = vec!["sql-injection".to_string()];
        changed.relevance_score = 0.95;
        let second = repo.upsert(&changed).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.collected_at, first.collected_at);
        assert!(second.updated_at > first.updated_at);
        assert_eq!(second.summary, "A better summary");
        assert_eq!(second.comment_type, CommentType::Security);
        assert_eq!(second.tags, vec!["sql-injection"]);
        assert_eq!(second.relevance_score, 0.95);
        assert_eq!(repo.count_by_repository("owner/repo").await.unwrap(), 1);

        let stored = repo
            .get_by_key("owner/repo", 123, &changed.comment_url)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, second);
        assert!(repo
            .get_by_key("owner/repo", 124, &changed.comment_url)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_tags_with_delimiters_round_trip() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.documents();

        let mut d = doc(7, "c1");
        d.tags = vec!["a, b".to_string(), "[weird]".to_string(), "quote\"d".to_string()];
        let saved = repo.upsert(&d).await.unwrap();

        let loaded = repo.get(saved.id).await.unwrap();
        assert_eq!(loaded.tags, d.tags);
    }

    #[tokio::test]
    async fn test_processed_pr_numbers() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.documents();

        repo.upsert(&doc(123, "c1")).await.unwrap();
        repo.upsert(&doc(124, "c1")).await.unwrap();
        repo.upsert(&doc(123, "c2")).await.unwrap();

        let mut other = doc(999, "c1");
        other.repository = "someone/else".to_string();
        repo.upsert(&other).await.unwrap();

        let processed = repo.processed_pr_numbers("owner/repo").await.unwrap();
        assert_eq!(processed, BTreeSet::from([123, 124]));

        let none = repo.processed_pr_numbers("empty/repo").await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_delete_by_pr_leaves_other_prs() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.documents();

        repo.upsert(&doc(123, "c1")).await.unwrap();
        repo.upsert(&doc(123, "c2")).await.unwrap();
        repo.upsert(&doc(124, "c1")).await.unwrap();

        let deleted = repo.delete_by_pr("owner/repo", 123).await.unwrap();
        assert_eq!(deleted, 2);

        assert!(repo.list_by_pr("owner/repo", 123).await.unwrap().is_empty());
        assert_eq!(repo.list_by_pr("owner/repo", 124).await.unwrap().len(), 1);
        assert_eq!(repo.delete_by_pr("owner/repo", 123).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_relevance_score_defaults_to_one() {
        let db = Database::in_memory().await.unwrap();

        sqlx::query(
            r#"
            INSERT INTO documents (
                summary, original_comment, file_path, directory_path, language,
                repository, pr_number, pr_title, pr_url, comment_url,
                author, comment_type, commented_at
            )
            VALUES ('s', 'o', 'a.go', '.', 'go', 'owner/repo', 1, 't', 'u', 'c', 'me', 'bug',
                    '2024-05-01T12:00:00Z')
            "#,
        )
        .execute(db.pool())
        .await
        .unwrap();

        let score: f64 = sqlx::query_scalar("SELECT relevance_score FROM documents")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(score, 1.0);
    }

    #[tokio::test]
    async fn test_mandatory_fields_are_enforced() {
        let db = Database::in_memory().await.unwrap();

        let result = sqlx::query(
            "INSERT INTO documents (summary, original_comment) VALUES ('s', 'o')",
        )
        .execute(db.pool())
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_search_filters_and_ordering() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.documents();

        let mut low = doc(1, "low");
        low.relevance_score = 0.2;
        low.author = "alice".to_string();
        repo.upsert(&low).await.unwrap();

        let mut high = doc(1, "high");
        high.relevance_score = 0.9;
        high.comment_type = CommentType::Security;
        high.summary = "Validate input to prevent SQL injection".to_string();
        repo.upsert(&high).await.unwrap();

        let mut elsewhere = doc(2, "web");
        elsewhere.file_path = "web/app.ts".to_string();
        elsewhere.directory_path = "web".to_string();
        elsewhere.commented_at = elsewhere.commented_at + Duration::days(1);
        repo.upsert(&elsewhere).await.unwrap();

        let all = repo.search(&DocumentQuery::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].relevance_score, 0.9);

        let payments = repo
            .search(&DocumentQuery {
                directory: Some("payments".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(payments.len(), 2);

        let security = repo
            .search(&DocumentQuery {
                comment_type: Some(CommentType::Security),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(security.len(), 1);

        let keyword = repo
            .search(&DocumentQuery {
                keyword: Some("injection".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(keyword.len(), 1);

        let by_author = repo
            .search(&DocumentQuery {
                author: Some("ali".to_string()),
                limit: Some(5),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_author.len(), 1);
        assert_eq!(by_author[0].author, "alice");
    }
}
