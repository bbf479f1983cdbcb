//! Cursor agent backend implementation

use std::sync::Arc;

use async_trait::async_trait;

use super::{run_cli, AnalysisBackend};
use crate::exec::{CommandExecutor, ProcessExecutor};
use crate::Result;

/// `cursor-agent` in print mode
#[derive(Clone)]
pub struct CursorBackend {
    cursor_path: String,
    model: Option<String>,
    extra_args: Vec<String>,
    executor: Arc<dyn CommandExecutor>,
}

impl std::fmt::Debug for CursorBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorBackend")
            .field("cursor_path", &self.cursor_path)
            .field("model", &self.model)
            .finish()
    }
}

impl CursorBackend {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            cursor_path: "cursor-agent".to_string(),
            model: None,
            extra_args: Vec::new(),
            executor,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.cursor_path = path.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

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
impl AnalysisBackend for CursorBackend {
    fn name(&self) -> &str {
        "cursor"
    }

    async fn invoke(&self, prompt: &str) -> Result<String> {
        run_cli(
            self.executor.as_ref(),
            self.name(),
            &self.cursor_path,
            &self.build_args(),
            prompt,
        )
        .await
    }

    fn is_available(&self) -> bool {
        ProcessExecutor::is_available(&self.cursor_path)
    }
}
