//! Backend for an arbitrary configured command

use std::sync::Arc;

use async_trait::async_trait;

use super::{run_cli, AnalysisBackend};
use crate::exec::{CommandExecutor, ProcessExecutor};
use crate::Result;

/// Runs `command args...` with the prompt on stdin
#[derive(Clone)]
pub struct CommandBackend {
    name: String,
    command: String,
    args: Vec<String>,
    executor: Arc<dyn CommandExecutor>,
}

impl std::fmt::Debug for CommandBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBackend")
            .field("name", &self.name)
            .field("command", &self.command)
            .field("args", &self.args)
            .finish()
    }
}

impl CommandBackend {
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        args: Vec<String>,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args,
            executor,
        }
    }
}

#[async_trait]
impl AnalysisBackend for CommandBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, prompt: &str) -> Result<String> {
        run_cli(
            self.executor.as_ref(),
            &self.name,
            &self.command,
            &self.args,
            prompt,
        )
        .await
    }

    fn is_available(&self) -> bool {
        ProcessExecutor::is_available(&self.command)
    }
}
