//! Configuration management for reviewkb
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (REVIEWKB_*)
//! 3. Config file (~/.config/reviewkb/config.toml)
//! 4. Default values

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reviewkb_db::DatabaseConfig;
use serde::{Deserialize, Serialize};

use crate::analysis::RetryPolicy;
use crate::filter::FilterConfig;
use crate::{Error, Result};

/// GitHub-related configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Repositories to collect from (`owner/repo`); the first is the default
    pub repositories: Vec<String>,

    /// Path to the gh executable
    pub gh_path: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            repositories: Vec::new(),
            gh_path: "gh".to_string(),
        }
    }
}

/// One analysis driver: an LLM CLI invoked with the prompt on stdin
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Executable to run
    pub command: String,

    /// Extra arguments; the built-in `claude` and `cursor` drivers add
    /// their own print-mode flags before these
    pub args: Vec<String>,

    /// Model override, for drivers that support one
    pub model: Option<String>,
}

impl DriverConfig {
    pub fn new(command: impl Into<String>, args: &[&str]) -> Self {
        Self {
            command: command.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            model: None,
        }
    }
}

/// Analysis-related configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Name of the primary driver
    pub primary: String,

    /// Fallback drivers in the order they are tried.
    ///
    /// When empty, every other configured driver is used in name order.
    pub fallbacks: Vec<String>,

    /// Maximum number of concurrent analysis invocations
    pub parallel: usize,

    /// Retry policy applied to the primary driver
    pub retry: RetryPolicy,

    /// Available drivers keyed by name
    pub drivers: BTreeMap<String, DriverConfig>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let mut drivers = BTreeMap::new();
        drivers.insert("claude".to_string(), DriverConfig::new("claude", &[]));
        drivers.insert("cursor".to_string(), DriverConfig::new("cursor-agent", &[]));

        Self {
            primary: "claude".to_string(),
            fallbacks: Vec::new(),
            parallel: 3,
            retry: RetryPolicy::default(),
            drivers,
        }
    }
}

impl AnalysisConfig {
    /// Driver names in the order they should be tried: primary first
    pub fn driver_order(&self) -> Vec<String> {
        let mut order = vec![self.primary.clone()];
        if self.fallbacks.is_empty() {
            order.extend(self.drivers.keys().filter(|n| **n != self.primary).cloned());
        } else {
            for name in &self.fallbacks {
                if !order.contains(name) {
                    order.push(name.clone());
                }
            }
        }
        order
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Path to the SQLite file (defaults to ~/.cache/reviewkb/knowledge.db)
    pub path: Option<PathBuf>,

    /// Maximum pool size
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: 5,
        }
    }
}

/// Collection run limits
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// PRs fetched when no limit is given on the command line
    pub default_limit: usize,

    /// Upper bound for the PR limit of one run
    pub max_prs_per_run: usize,

    /// Deadline for a whole collection run
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_prs_per_run: 100,
            timeout: Duration::from_secs(5 * 60),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub github: GitHubConfig,
    pub analysis: AnalysisConfig,
    pub database: DatabaseSettings,
    pub collection: CollectionConfig,
    pub filter: FilterConfig,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        match Self::default_config_path() {
            Some(path) if path.exists() => Self::load_from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/reviewkb/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("reviewkb").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - REVIEWKB_DB_PATH: SQLite database file
    /// - REVIEWKB_PRIMARY_DRIVER: name of the primary analysis driver
    /// - REVIEWKB_GH_PATH: path to the gh executable
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = std::env::var("REVIEWKB_DB_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }

        if let Ok(primary) = std::env::var("REVIEWKB_PRIMARY_DRIVER") {
            self.analysis.primary = primary;
        }

        if let Ok(gh_path) = std::env::var("REVIEWKB_GH_PATH") {
            self.github.gh_path = gh_path;
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, db_path: Option<PathBuf>, primary: Option<String>) -> Self {
        if let Some(path) = db_path {
            self.database.path = Some(path);
        }

        if let Some(p) = primary {
            self.analysis.primary = p;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(
        config_path: Option<&Path>,
        db_path: Option<PathBuf>,
        primary: Option<String>,
    ) -> Result<Self> {
        let base = match config_path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load()?,
        };

        let config = base
            .with_env_overrides()
            .with_cli_overrides(db_path, primary);
        config.validate()?;
        Ok(config)
    }

    /// Check values that would make a run impossible
    pub fn validate(&self) -> Result<()> {
        if self.analysis.parallel == 0 {
            return Err(Error::Config("analysis.parallel must be at least 1".to_string()));
        }
        if self.analysis.retry.max_attempts == 0 {
            return Err(Error::Config(
                "analysis.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.analysis.retry.initial_delay > self.analysis.retry.max_delay {
            return Err(Error::Config(
                "analysis.retry.initial_delay must not exceed max_delay".to_string(),
            ));
        }
        for name in self.analysis.driver_order() {
            if !self.analysis.drivers.contains_key(&name) {
                return Err(Error::Config(format!("unknown analysis driver: {name}")));
            }
        }
        if self.collection.max_prs_per_run == 0 {
            return Err(Error::Config(
                "collection.max_prs_per_run must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Database settings resolved to a connection config
    pub fn database_config(&self) -> DatabaseConfig {
        let path = self
            .database
            .path
            .clone()
            .unwrap_or_else(DatabaseConfig::default_path);
        DatabaseConfig::new(path).with_max_connections(self.database.max_connections)
    }

    /// The repository used when none is given explicitly
    pub fn default_repository(&self) -> Option<&str> {
        self.github.repositories.first().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.analysis.primary, "claude");
        assert_eq!(config.analysis.parallel, 3);
        assert_eq!(config.analysis.retry.max_attempts, 3);
        assert_eq!(config.analysis.retry.initial_delay, Duration::from_secs(1));
        assert_eq!(config.analysis.retry.max_delay, Duration::from_secs(10));
        assert_eq!(config.collection.max_prs_per_run, 100);
        assert_eq!(config.github.gh_path, "gh");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_overrides() {
        let config = Config::default()
            .with_cli_overrides(Some(PathBuf::from("/tmp/kb.db")), Some("cursor".to_string()));

        assert_eq!(config.database.path, Some(PathBuf::from("/tmp/kb.db")));
        assert_eq!(config.analysis.primary, "cursor");
        assert_eq!(config.database_config().path, PathBuf::from("/tmp/kb.db"));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[github]
repositories = ["acme/widgets", "acme/gadgets"]

[analysis]
primary = "local"
fallbacks = ["claude"]
parallel = 5

[analysis.retry]
max_attempts = 4
initial_delay = "500ms"
max_delay = "8s"

[analysis.drivers.local]
command = "llm"
args = ["--json"]

[analysis.drivers.claude]
command = "/opt/bin/claude"
model = "sonnet"

[collection]
timeout = "10m"

[filter]
min_length = 20
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.default_repository(), Some("acme/widgets"));
        assert_eq!(config.analysis.primary, "local");
        assert_eq!(config.analysis.parallel, 5);
        assert_eq!(config.analysis.retry.max_attempts, 4);
        assert_eq!(config.analysis.retry.initial_delay, Duration::from_millis(500));
        assert_eq!(config.analysis.drivers["local"].args, vec!["--json"]);
        assert_eq!(config.collection.timeout, Duration::from_secs(600));
        assert_eq!(config.filter.min_length, 20);
        // Unspecified filter lists keep their curated defaults
        assert!(config.filter.exclude_phrases.contains(&"lgtm".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_driver_order_defaults_to_name_order() {
        let config = AnalysisConfig::default();
        assert_eq!(config.driver_order(), vec!["claude", "cursor"]);

        let cursor_first = AnalysisConfig {
            primary: "cursor".to_string(),
            ..AnalysisConfig::default()
        };
        assert_eq!(cursor_first.driver_order(), vec!["cursor", "claude"]);
    }

    #[test]
    fn test_driver_order_explicit_fallbacks() {
        let config = AnalysisConfig {
            fallbacks: vec!["cursor".to_string(), "claude".to_string()],
            ..AnalysisConfig::default()
        };
        // Primary is not repeated
        assert_eq!(config.driver_order(), vec!["claude", "cursor"]);
    }

    #[test]
    fn test_validate_rejects_unknown_primary() {
        let config = Config::default().with_cli_overrides(None, Some("nope".to_string()));
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_parallelism() {
        let mut config = Config::default();
        config.analysis.parallel = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
