//! External command execution
//!
//! Both the GitHub CLI and the analysis drivers are reached through
//! [`CommandExecutor`], so tests can substitute canned output for real
//! processes.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::trace;

use crate::{Error, Result};

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was terminated by a signal
    pub status_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// A successful run that printed `stdout`
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A run that exited with `code` and printed `stderr`
    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            status_code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == Some(0)
    }

    /// Return stdout, or a process error carrying stderr if the run failed
    pub fn into_stdout(self, program: &str) -> Result<String> {
        if self.is_success() {
            return Ok(self.stdout);
        }

        let status = self
            .status_code
            .map(|c| format!("exit code {c}"))
            .unwrap_or_else(|| "terminated by signal".to_string());
        let detail = if self.stderr.trim().is_empty() {
            self.stdout.trim().to_string()
        } else {
            self.stderr.trim().to_string()
        };
        Err(Error::Process(format!("{program} failed ({status}): {detail}")))
    }
}

/// Runs external programs
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `program` with `args`, optionally writing `stdin` to it, and wait
    /// for it to exit
    async fn run(&self, program: &str, args: &[String], stdin: Option<&str>)
        -> Result<CommandOutput>;
}

/// Executor backed by real OS processes
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Check whether `program` can be started at all
    pub fn is_available(program: &str) -> bool {
        std::process::Command::new(program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    }

    /// Like [`is_available`](Self::is_available), without blocking the runtime
    pub async fn check_available(program: &str) -> bool {
        Command::new(program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .is_ok()
    }
}

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        stdin: Option<&str>,
    ) -> Result<CommandOutput> {
        trace!(program, ?args, "Running command");

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A dropped future (timeout, cancellation) must not leave the child running
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Process(format!("executable not found: '{program}'"))
            } else {
                Error::Io(e)
            }
        })?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            // A child that exits without reading stdin is judged by its exit status
            if let Err(e) = pipe.write_all(input.as_bytes()).await {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(Error::Io(e));
                }
            }
            // Close stdin so the child sees EOF
            drop(pipe);
        }

        let output = child.wait_with_output().await?;

        Ok(CommandOutput {
            status_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
