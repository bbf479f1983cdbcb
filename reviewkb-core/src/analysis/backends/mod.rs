//! Analysis backend abstraction
//!
//! A backend is a language-model CLI that receives a prompt on stdin and
//! prints its answer on stdout.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::config::DriverConfig;
use crate::exec::CommandExecutor;
use crate::Result;

mod claude;
mod command;
mod cursor;

pub use claude::ClaudeBackend;
pub use command::CommandBackend;
pub use cursor::CursorBackend;

/// Trait for language-model CLIs
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Get the name of this backend
    fn name(&self) -> &str;

    /// Send `prompt` and return the raw response text
    async fn invoke(&self, prompt: &str) -> Result<String>;

    /// Check if this backend is available on the system
    fn is_available(&self) -> bool;
}

/// Run a CLI with the prompt on stdin and return its stdout
pub(crate) async fn run_cli(
    executor: &dyn CommandExecutor,
    backend: &str,
    program: &str,
    args: &[String],
    prompt: &str,
) -> Result<String> {
    debug!(backend, program, prompt_len = prompt.len(), "Invoking analysis backend");
    let output = executor.run(program, args, Some(prompt)).await?;
    let stdout = output.into_stdout(program)?;
    debug!(backend, response_len = stdout.len(), "Analysis backend responded");
    Ok(stdout)
}

/// Build a backend from its configuration entry
///
/// `claude` and `cursor` get their dedicated implementations; any other
/// name runs the configured command verbatim.
pub fn backend_from_config(
    name: &str,
    config: &DriverConfig,
    executor: Arc<dyn CommandExecutor>,
) -> Arc<dyn AnalysisBackend> {
    match name {
        "claude" => {
            let mut backend = ClaudeBackend::new(executor)
                .with_path(non_empty_or(&config.command, "claude"))
                .with_extra_args(config.args.clone());
            if let Some(model) = &config.model {
                backend = backend.with_model(model.clone());
            }
            Arc::new(backend)
        }
        "cursor" => {
            let mut backend = CursorBackend::new(executor)
                .with_path(non_empty_or(&config.command, "cursor-agent"))
                .with_extra_args(config.args.clone());
            if let Some(model) = &config.model {
                backend = backend.with_model(model.clone());
            }
            Arc::new(backend)
        }
        _ => Arc::new(CommandBackend::new(
            name,
            config.command.clone(),
            config.args.clone(),
            executor,
        )),
    }
}

fn non_empty_or(value: &str, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}
