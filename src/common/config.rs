//! Configuration handling
//!
//! Settings come from two layers: an optional `config.toml` holding file-level
//! defaults, and the command line, which always wins. The merged result is a
//! [`RunConfig`] that stays immutable for the rest of the run.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Default user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!("apicheck/", env!("CARGO_PKG_VERSION"));

/// How tests are grouped into batches for the worker pool
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Every test is an independent unit of work
    #[default]
    PerTest,
    /// Each file is one ordered batch run by a single worker
    PerFile,
}

/// File-level configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Request defaults
    #[serde(default)]
    pub defaults: Defaults,

    /// Worker pool settings
    #[serde(default)]
    pub execution: ExecutionConfig,
}

/// Request defaults applied to servers that don't set their own
#[derive(Debug, Deserialize)]
pub struct Defaults {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// User agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Content-Type header for servers without default headers
    #[serde(default = "default_json_mime")]
    pub content_type: String,

    /// Accept header for servers without default headers
    #[serde(default = "default_json_mime")]
    pub accept: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            content_type: default_json_mime(),
            accept: default_json_mime(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_json_mime() -> String {
    "application/json".to_string()
}

/// Worker pool settings
#[derive(Debug, Deserialize, Default)]
pub struct ExecutionConfig {
    /// Pool size; defaults to the number of available CPUs
    pub workers: Option<usize>,

    /// Dispatch policy
    #[serde(default)]
    pub mode: DispatchMode,
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| super::Error::file_read(path, &e))?;
        toml::from_str(&content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}

/// Fully merged settings for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Path to the server profiles file
    pub servers_file: PathBuf,
    /// Directory holding the `*.test.json` files
    pub tests_dir: PathBuf,
    /// Dispatch policy
    pub mode: DispatchMode,
    /// Pool size, at least 1
    pub workers: usize,
    /// Print passing tests and files too
    pub verbose: bool,
    /// Only run this file
    pub file: Option<String>,
    /// Only run this test
    pub test: Option<String>,
    /// Default request timeout
    pub timeout: Duration,
    /// Default user agent
    pub user_agent: String,
    /// Default Content-Type header
    pub content_type: String,
    /// Default Accept header
    pub accept: String,
}

impl RunConfig {
    /// Build a run configuration from file defaults alone
    pub fn new(servers_file: impl Into<PathBuf>, tests_dir: impl Into<PathBuf>) -> Self {
        Self::from_config(&Config::default(), servers_file, tests_dir)
    }

    /// Build a run configuration seeded from a loaded config file
    pub fn from_config(
        config: &Config,
        servers_file: impl Into<PathBuf>,
        tests_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            servers_file: servers_file.into(),
            tests_dir: tests_dir.into(),
            mode: config.execution.mode,
            workers: config.execution.workers.unwrap_or_else(available_workers).max(1),
            verbose: false,
            file: None,
            test: None,
            timeout: Duration::from_secs(config.defaults.timeout_secs),
            user_agent: config.defaults.user_agent.clone(),
            content_type: config.defaults.content_type.clone(),
            accept: config.defaults.accept.clone(),
        }
    }
}

fn available_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::new("servers.json", "tests");
        assert_eq!(config.mode, DispatchMode::PerTest);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.content_type, "application/json");
        assert_eq!(config.accept, "application/json");
        assert!(config.workers >= 1);
        assert!(config.user_agent.starts_with("apicheck/"));
    }

    #[test]
    fn test_parse_config_file() {
        let config: Config = toml::from_str(
            r#"
            [defaults]
            timeout_secs = 5
            accept = "text/plain"

            [execution]
            workers = 0
            mode = "per_file"
            "#,
        )
        .unwrap();

        let run = RunConfig::from_config(&config, "s.json", "dir");
        assert_eq!(run.timeout, Duration::from_secs(5));
        assert_eq!(run.accept, "text/plain");
        assert_eq!(run.content_type, "application/json");
        assert_eq!(run.mode, DispatchMode::PerFile);
        // a zero-sized pool would never drain the queue
        assert_eq!(run.workers, 1);
    }

    #[test]
    fn test_load_from_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[execution\nworkers = ").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(crate::Error::ConfigParse(_))
        ));
    }
}
