//! Error types for reviewkb

use thiserror::Error;

/// Result type alias for reviewkb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for reviewkb operations
#[derive(Error, Debug)]
pub enum Error {
    /// An external tool could not be started or exited unsuccessfully
    #[error("Process error: {0}")]
    Process(String),

    /// A tool response was not valid JSON or lacked the expected structure
    #[error("Parse error: {0}")]
    Parse(String),

    /// A requested pull request does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Every retry of every configured analysis driver failed
    #[error("Analysis failed: {0}")]
    Analysis(String),

    /// Persistence error
    #[error("Database error: {0}")]
    Database(#[from] reviewkb_db::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The run was cancelled or its deadline passed
    #[error("Operation cancelled")]
    Cancelled,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
