//! Comment analysis through language-model CLIs
//!
//! [`FallbackAnalyzer`] tries an ordered list of [`AnalysisDriver`]s, each
//! wrapping an [`AnalysisBackend`] with a [`RetryPolicy`]. Responses are
//! located in free-form output and validated into an [`AnalysisResult`].

mod backends;
mod driver;
mod extract;
mod fallback;
mod prompts;
mod retry;
mod types;

#[cfg(test)]
pub(crate) mod stub;

pub use backends::{
    backend_from_config, AnalysisBackend, ClaudeBackend, CommandBackend, CursorBackend,
};
pub use driver::AnalysisDriver;
pub use extract::{balanced_object, json_candidates, parse_analysis};
pub use fallback::FallbackAnalyzer;
pub use prompts::{render_template, PromptBuilder, PromptContext, ANALYZE_COMMENT_TEMPLATE};
pub use retry::RetryPolicy;
pub use types::{AnalysisOutcome, AnalysisResult, CommentType, DEGRADED_RELEVANCE, MAX_TAGS};
