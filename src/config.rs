//! Configuration loader and validator for the page message harvester.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::harvest::HarvestOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub server: Server,
    pub graph: Graph,
    pub harvest: Harvest,
}

/// HTTP serving settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Server {
    pub bind_addr: String,
    pub allowed_origins: Vec<String>,
}

/// Graph API transport settings. Credentials are deliberately absent: they
/// arrive with each request and are never written to disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Graph {
    pub api_version: String,
    pub timeout_seconds: u64,
}

/// Harvest defaults; `window_days` can be overridden per request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Harvest {
    pub window_days: i64,
    pub thread_limit: u32,
    pub message_limit: u32,
    pub max_pages: u32,
    pub fetch_concurrency: usize,
}

impl Harvest {
    pub fn options(&self) -> HarvestOptions {
        HarvestOptions {
            window_days: self.window_days,
            thread_limit: self.thread_limit,
            message_limit: self.message_limit,
            max_pages: self.max_pages,
            fetch_concurrency: self.fetch_concurrency,
        }
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.server.bind_addr.trim().is_empty() {
        return Err(ConfigError::Invalid("server.bind_addr must be non-empty"));
    }
    if cfg.server.allowed_origins.iter().any(|o| o.trim().is_empty()) {
        return Err(ConfigError::Invalid("server.allowed_origins entries must be non-empty"));
    }

    if cfg.graph.api_version.trim().is_empty() {
        return Err(ConfigError::Invalid("graph.api_version must be non-empty"));
    }
    if cfg.graph.timeout_seconds == 0 {
        return Err(ConfigError::Invalid("graph.timeout_seconds must be > 0"));
    }

    if cfg.harvest.window_days <= 0 {
        return Err(ConfigError::Invalid("harvest.window_days must be > 0"));
    }
    if cfg.harvest.thread_limit == 0 {
        return Err(ConfigError::Invalid("harvest.thread_limit must be > 0"));
    }
    if cfg.harvest.message_limit == 0 {
        return Err(ConfigError::Invalid("harvest.message_limit must be > 0"));
    }
    if cfg.harvest.max_pages == 0 {
        return Err(ConfigError::Invalid("harvest.max_pages must be >= 1"));
    }
    if cfg.harvest.fetch_concurrency == 0 {
        return Err(ConfigError::Invalid("harvest.fetch_concurrency must be >= 1"));
    }

    Ok(())
}

/// Example configuration document, kept in sync with the schema.
pub fn example() -> &'static str {
    r#"server:
  bind_addr: "127.0.0.1:8080"
  allowed_origins:
    - "http://localhost:3000"

graph:
  api_version: "v18.0"
  timeout_seconds: 10

harvest:
  window_days: 30
  thread_limit: 25
  message_limit: 100
  max_pages: 1
  fetch_concurrency: 1
"#
}
