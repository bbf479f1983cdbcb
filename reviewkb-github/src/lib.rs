//! reviewkb GitHub - pull requests and review threads via the `gh` CLI
//!
//! [`GhClient`] implements [`reviewkb_core::collector::PullRequestSource`]
//! by running an already-authenticated `gh` and decoding its JSON output.

mod client;
mod error;
mod graphql;
mod pulls;
mod repo;

pub use client::GhClient;
pub use error::{Error, Result};
pub use repo::{parse_pr_url, Repository};
