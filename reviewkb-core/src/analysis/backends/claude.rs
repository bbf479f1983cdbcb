//! Claude Code backend implementation

use std::sync::Arc;

use async_trait::async_trait;

use super::{run_cli, AnalysisBackend};
use crate::exec::{CommandExecutor, ProcessExecutor};
use crate::Result;

/// Claude Code in print mode
#[derive(Clone)]
pub struct ClaudeBackend {
    claude_path: String,
    model: Option<String>,
    extra_args: Vec<String>,
    executor: Arc<dyn CommandExecutor>,
}

impl std::fmt::Debug for ClaudeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeBackend")
            .field("claude_path", &self.claude_path)
            .field("model", &self.model)
            .field("extra_args", &self.extra_args)
            .finish()
    }
}

impl ClaudeBackend {
    /// Create a new Claude backend with default settings
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            claude_path: "claude".to_string(),
            model: None,
            extra_args: Vec::new(),
            executor,
        }
    }

    /// Create a Claude backend with custom path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.claude_path = path.into();
        self
    }

    /// Create a Claude backend with a specific model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Append arguments after the built-in flags
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Command-line arguments; the prompt itself goes to stdin
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "--print".to_string(),
            "--output-format".to_string(),
            "text".to_string(),
        ];

        if let Some(ref model) = self.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }

        args.extend(self.extra_args.iter().cloned());
        args
    }
}

#[async_trait]
impl AnalysisBackend for ClaudeBackend {
    fn name(&self) -> &str {
        "claude"
    }

    async fn invoke(&self, prompt: &str) -> Result<String> {
        run_cli(
            self.executor.as_ref(),
            self.name(),
            &self.claude_path,
            &self.build_args(),
            prompt,
        )
        .await
    }

    fn is_available(&self) -> bool {
        ProcessExecutor::is_available(&self.claude_path)
    }
}
