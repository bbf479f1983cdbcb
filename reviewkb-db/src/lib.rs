//! Database layer for reviewkb
//!
//! Persists knowledge documents derived from review comments and the
//! per-repository collection checkpoints.

pub mod db;
pub mod error;
pub mod models;
pub mod repos;

pub use db::{Database, DatabaseConfig};
pub use error::{Error, Result};
pub use models::{CollectionProgress, CommentType, Document, DocumentQuery, NewDocument};
pub use repos::{DocumentRepository, ProgressRepository};
