//! CLI command implementations

pub mod collect;
pub mod config;
pub mod query;

pub use collect::CollectArgs;
pub use query::QueryArgs;
