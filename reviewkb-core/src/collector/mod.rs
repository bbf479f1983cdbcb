//! Collection pipeline: merged PRs in, knowledge documents out

mod batch;
mod pipeline;
mod source;
mod store;
mod types;

pub use batch::run_bounded;
pub use pipeline::{build_document, skip_processed, CollectOptions, CollectionReport, Collector};
pub use source::{PrQuery, PullRequestSource};
pub use store::DocumentStore;
pub use types::{PullRequest, ReviewComment};
