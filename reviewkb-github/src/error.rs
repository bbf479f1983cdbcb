//! Error types for GitHub operations

use thiserror::Error;

/// Result type for GitHub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to GitHub through `gh`
#[derive(Error, Debug)]
pub enum Error {
    /// The `gh` invocation itself failed
    #[error(transparent)]
    Command(#[from] reviewkb_core::Error),

    /// Pull request not found
    #[error("Pull request #{0} not found")]
    PrNotFound(i64),

    /// Repository string is not `owner/name` or a GitHub URL
    #[error("Invalid repository: {0}")]
    InvalidRepository(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

impl From<Error> for reviewkb_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Command(inner) => inner,
            Error::PrNotFound(number) => {
                reviewkb_core::Error::NotFound(format!("pull request #{number}"))
            }
            Error::InvalidRepository(msg) => reviewkb_core::Error::Config(msg),
            Error::Parse(msg) => reviewkb_core::Error::Parse(msg),
        }
    }
}
