//! Analysis prompt template
//!
//! The template uses `{{VARIABLE}}` placeholders that are rendered from a
//! [`PromptContext`].

use std::collections::HashMap;

use crate::collector::{PullRequest, ReviewComment};

/// Embedded template for analysing one review comment
pub const ANALYZE_COMMENT_TEMPLATE: &str = include_str!("prompts/analyze_comment.md");

/// Variable substitutions for a template
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    variables: HashMap<String, String>,
}

impl PromptContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Set a variable value (builder pattern)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }
}

/// Substitute `{{NAME}}` placeholders in one pass
///
/// Substituted values are never re-scanned, so a comment that itself
/// contains `{{...}}` is kept verbatim. Unset uppercase placeholders become
/// `(not specified)`.
pub fn render_template(template: &str, context: &PromptContext) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];

        let Some(end) = after_open.find("}}") else {
            result.push_str(&rest[start..]);
            return result;
        };

        let name = &after_open[..end];
        let is_placeholder =
            !name.is_empty() && name.chars().all(|c| c.is_ascii_uppercase() || c == '_');

        if is_placeholder {
            result.push_str(context.get(name).unwrap_or("(not specified)"));
            rest = &after_open[end + 2..];
        } else {
            result.push_str("{{");
            rest = after_open;
        }
    }

    result.push_str(rest);
    result
}

/// Builds the analysis prompt for one comment
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    context: PromptContext,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository and pull request the comment belongs to
    pub fn pull_request(mut self, repository: &str, pr: &PullRequest) -> Self {
        self.context = self
            .context
            .with("REPOSITORY", repository)
            .with("PR_NUMBER", pr.number.to_string())
            .with("PR_TITLE", pr.title.as_str());
        self
    }

    /// The comment itself plus its file context
    pub fn comment(mut self, comment: &ReviewComment, language: &str) -> Self {
        let line = match comment.line {
            Some(line) => format!("line {line}"),
            None => "no line".to_string(),
        };

        self.context = self
            .context
            .with("FILE_PATH", comment.path.as_str())
            .with("LINE", line)
            .with("LANGUAGE", language)
            .with("AUTHOR", comment.author.as_str())
            .with("COMMENT", comment.body.trim())
            .with(
                "THREAD_CONTEXT",
                comment.thread_context.as_deref().unwrap_or("(first comment)"),
            );
        self
    }

    /// Build the final prompt
    pub fn build(self) -> String {
        render_template(ANALYZE_COMMENT_TEMPLATE, &self.context)
    }
}
