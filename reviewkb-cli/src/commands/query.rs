//! Query command - search stored knowledge documents

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use reviewkb_core::Config;
use reviewkb_db::{CommentType, Database, Document, DocumentQuery};

/// Arguments for the query command
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Database file (overrides config and env)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Directory, e.g. `payment-service` or `src/auth`
    #[arg(short, long)]
    pub dir: Option<String>,

    /// File path substring, e.g. `Orders.ts`
    #[arg(short, long)]
    pub file: Option<String>,

    /// Reviewer login substring
    #[arg(short, long)]
    pub author: Option<String>,

    /// Classification (implementation, security, testing, business, design,
    /// maintenance, explanation, bug, noise)
    #[arg(short = 't', long = "type")]
    pub comment_type: Option<CommentType>,

    /// Text to look for in the summary and the original comment
    #[arg(short, long)]
    pub keyword: Option<String>,

    /// Only documents from this repository (owner/repo)
    #[arg(long)]
    pub repo: Option<String>,

    /// Maximum number of documents shown
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: u32,

    /// Show the original comment and thread context
    #[arg(short, long)]
    pub verbose: bool,
}

impl QueryArgs {
    /// Execute the query command
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let db_config = config.database_config();
        let db = Database::connect(db_config.clone())
            .await
            .with_context(|| format!("Failed to open database {}", db_config.path.display()))?;
        db.migrate().await.context("Failed to apply database migrations")?;

        let documents = db
            .documents()
            .search(&self.query())
            .await
            .context("Failed to search documents")?;
        db.close().await;

        print!("{}", self.render(&documents));
        Ok(())
    }

    fn query(&self) -> DocumentQuery {
        DocumentQuery {
            directory: self.dir.clone(),
            file: self.file.clone(),
            author: self.author.clone(),
            comment_type: self.comment_type,
            keyword: self.keyword.clone(),
            repository: self.repo.clone(),
            limit: Some(self.limit),
        }
    }

    fn render(&self, documents: &[Document]) -> String {
        let mut out = String::new();

        let mut heading = format!("Found {} documents", documents.len());
        if let Some(dir) = &self.dir {
            heading.push_str(&format!(" in directory: {dir}"));
        }
        if let Some(file) = &self.file {
            heading.push_str(&format!(" matching file: {file}"));
        }
        out.push_str(&heading);
        out.push('\n');

        if documents.is_empty() {
            out.push_str("No results matching the criteria.\n");
            out.push_str("Available types: ");
            let types: Vec<&str> = CommentType::ALL.iter().map(|t| t.as_str()).collect();
            out.push_str(&types.join(", "));
            out.push('\n');
            return out;
        }

        out.push('\n');
        for doc in documents {
            let location = match doc.line_number {
                Some(line) => format!("{}:{line}", doc.file_path),
                None => doc.file_path.clone(),
            };
            out.push_str(&format!("ID: {}\n", doc.id));
            out.push_str(&format!("  File:       {location} ({})\n", doc.language));
            out.push_str(&format!("  Repository: {}\n", doc.repository));
            out.push_str(&format!("  PR:         #{} - {}\n", doc.pr_number, doc.pr_title));
            out.push_str(&format!("  Author:     {}\n", doc.author));
            out.push_str(&format!(
                "  Type:       {} (score: {:.2})\n",
                doc.comment_type, doc.relevance_score
            ));
            if !doc.tags.is_empty() {
                out.push_str(&format!("  Tags:       {}\n", doc.tags.join(", ")));
            }
            out.push_str(&format!(
                "  Date:       {}\n",
                doc.commented_at.format("%Y-%m-%d %H:%M:%S")
            ));
            out.push_str(&format!("  Summary:    {}\n", doc.summary));

            if self.verbose {
                if let Some(context) = &doc.thread_context {
                    out.push_str(&format!("  Thread:\n{}\n", indent(context)));
                }
                out.push_str(&format!("  Comment:\n{}\n", indent(&doc.original_comment)));
                out.push_str(&format!("  Link:       {}\n", doc.comment_url));
            }
            out.push_str("---\n");
        }

        if !self.verbose {
            out.push_str("\nUse -v to see the full comment text\n");
        }
        out
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("    {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
