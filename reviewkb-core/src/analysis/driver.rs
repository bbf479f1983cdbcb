//! A single analysis backend wrapped with retry and response parsing

use std::sync::Arc;

use tracing::{debug, warn};

use super::backends::AnalysisBackend;
use super::extract::parse_analysis;
use super::retry::RetryPolicy;
use super::types::AnalysisResult;
use crate::{Error, Result};

/// Invokes one backend, retrying failed or unparseable responses
#[derive(Clone)]
pub struct AnalysisDriver {
    backend: Arc<dyn AnalysisBackend>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for AnalysisDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisDriver")
            .field("backend", &self.backend.name())
            .field("retry", &self.retry)
            .finish()
    }
}

impl AnalysisDriver {
    pub fn new(backend: Arc<dyn AnalysisBackend>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    /// A driver that makes exactly one attempt
    pub fn single_attempt(backend: Arc<dyn AnalysisBackend>) -> Self {
        Self::new(backend, RetryPolicy::no_retry())
    }

    pub fn name(&self) -> &str {
        self.backend.name()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Analyze `prompt`, retrying with exponential backoff
    ///
    /// A blank prompt is rejected before any backend call. Returns the
    /// error of the final attempt once all attempts have failed.
    pub async fn analyze(&self, prompt: &str) -> Result<AnalysisResult> {
        if prompt.trim().is_empty() {
            return Err(Error::Analysis("prompt cannot be empty".to_string()));
        }

        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.attempt(prompt).await {
                Ok(result) => {
                    debug!(driver = self.name(), attempt, "Analysis succeeded");
                    return Ok(result);
                }
                Err(e) if attempt >= max_attempts => return Err(e),
                Err(e) => {
                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        driver = self.name(),
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Analysis attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(&self, prompt: &str) -> Result<AnalysisResult> {
        let output = self.backend.invoke(prompt).await?;
        parse_analysis(&output)
    }
}
