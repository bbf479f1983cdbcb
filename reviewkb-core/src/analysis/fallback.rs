//! Ordered multi-driver analysis with a degraded last resort

use std::sync::Arc;

use tracing::{info, warn};

use super::backends::backend_from_config;
use super::driver::AnalysisDriver;
use super::types::{AnalysisOutcome, AnalysisResult};
use crate::config::AnalysisConfig;
use crate::exec::CommandExecutor;
use crate::{Error, Result};

/// Tries the primary driver (with retries), then each fallback once, in order
#[derive(Debug, Clone)]
pub struct FallbackAnalyzer {
    drivers: Vec<AnalysisDriver>,
}

impl FallbackAnalyzer {
    pub fn new(primary: AnalysisDriver) -> Self {
        Self {
            drivers: vec![primary],
        }
    }

    /// Append a fallback driver; it is tried after every driver added before it
    pub fn with_fallback(mut self, driver: AnalysisDriver) -> Self {
        self.drivers.push(driver);
        self
    }

    /// Build the driver chain described by the analysis configuration
    ///
    /// The primary driver uses the configured retry policy; fallbacks make a
    /// single attempt each.
    pub fn from_config(config: &AnalysisConfig, executor: Arc<dyn CommandExecutor>) -> Result<Self> {
        let mut drivers = Vec::new();

        for (position, name) in config.driver_order().iter().enumerate() {
            let driver_config = config
                .drivers
                .get(name)
                .ok_or_else(|| Error::Config(format!("unknown analysis driver: {name}")))?;
            let backend = backend_from_config(name, driver_config, executor.clone());

            drivers.push(if position == 0 {
                AnalysisDriver::new(backend, config.retry)
            } else {
                AnalysisDriver::single_attempt(backend)
            });
        }

        Ok(Self { drivers })
    }

    /// Driver names in the order they are tried
    pub fn driver_names(&self) -> Vec<&str> {
        self.drivers.iter().map(|d| d.name()).collect()
    }

    /// First successful result, or an aggregate of every driver's failure
    pub async fn analyze(&self, prompt: &str) -> Result<AnalysisResult> {
        if prompt.trim().is_empty() {
            return Err(Error::Analysis("prompt cannot be empty".to_string()));
        }

        let mut failures = Vec::with_capacity(self.drivers.len());

        for (position, driver) in self.drivers.iter().enumerate() {
            match driver.analyze(prompt).await {
                Ok(result) => {
                    if position > 0 {
                        info!(driver = driver.name(), "Fallback analysis driver succeeded");
                    }
                    return Ok(result);
                }
                Err(e) => {
                    warn!(driver = driver.name(), error = %e, "Analysis driver failed");
                    failures.push(format!("{}: {}", driver.name(), e));
                }
            }
        }

        Err(Error::Analysis(format!(
            "all analysis drivers failed ({})",
            failures.join("; ")
        )))
    }

    /// Like [`analyze`](Self::analyze), but substitutes the placeholder
    /// result for `file_path` instead of failing
    pub async fn analyze_or_degrade(&self, prompt: &str, file_path: &str) -> AnalysisOutcome {
        match self.analyze(prompt).await {
            Ok(result) => AnalysisOutcome::Succeeded(result),
            Err(e) => AnalysisOutcome::Degraded {
                result: AnalysisResult::degraded(file_path),
                cause: e.to_string(),
            },
        }
    }
}
