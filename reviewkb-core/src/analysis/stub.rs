//! Scripted backend for tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;

use super::backends::AnalysisBackend;
use crate::{Error, Result};

pub(crate) const VALID_RESPONSE: &str = r#"```json
{"summary": "Check the error path.", "type": "bug", "tags": ["errors"], "relevance_score": 0.8}
```"#;

/// Replays queued responses, then repeats a fixed one
pub(crate) struct ScriptedBackend {
    name: String,
    script: Mutex<VecDeque<std::result::Result<String, String>>>,
    otherwise: std::result::Result<String, String>,
    calls: Mutex<Vec<Instant>>,
}

impl ScriptedBackend {
    pub(crate) fn new(name: &str, script: Vec<std::result::Result<String, String>>) -> Self {
        Self {
            name: name.to_string(),
            script: Mutex::new(script.into()),
            otherwise: Err("script exhausted".to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn always_failing(name: &str) -> Self {
        let mut backend = Self::new(name, Vec::new());
        backend.otherwise = Err(format!("{name} is unavailable"));
        backend
    }

    pub(crate) fn always_succeeding(name: &str) -> Self {
        let mut backend = Self::new(name, Vec::new());
        backend.otherwise = Ok(VALID_RESPONSE.to_string());
        backend
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisBackend for ScriptedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, _prompt: &str) -> Result<String> {
        self.calls.lock().unwrap().push(Instant::now());
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.otherwise.clone());
        next.map_err(Error::Process)
    }

    fn is_available(&self) -> bool {
        true
    }
}
