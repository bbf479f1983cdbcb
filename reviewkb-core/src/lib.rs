//! reviewkb core - review-comment knowledge base pipeline
//!
//! This crate turns code-review comments from merged pull requests into
//! searchable knowledge documents: it filters out noise, classifies file
//! context, asks a language-model CLI to summarize each comment and
//! persists the results.

pub mod analysis;
pub mod collector;
pub mod config;
pub mod error;
pub mod exec;
pub mod file_info;
pub mod filter;

pub use analysis::{AnalysisOutcome, AnalysisResult, CommentType, FallbackAnalyzer, RetryPolicy};
pub use collector::{CollectOptions, CollectionReport, Collector, PullRequest, ReviewComment};
pub use config::Config;
pub use error::{Error, Result};
pub use exec::{CommandExecutor, CommandOutput, ProcessExecutor};
pub use filter::{CommentFilter, FilterConfig};
