//! Configuration management for db-scout.
//!
//! Handles loading configuration from TOML files and environment variables.
//! A missing config file is not an error; defaults plus environment
//! variables are enough to run the server.

use crate::error::{Result, ScoutError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for db-scout.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Query execution settings.
    #[serde(default)]
    pub query: QueryConfig,

    /// LLM provider configuration.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Path of the local state database. Defaults to the platform config
    /// directory when unset.
    pub state_db_path: Option<PathBuf>,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_http_port")]
    pub port: u16,

    /// Origins allowed by CORS. Empty means same-origin only.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_http_port(),
            cors_origins: Vec::new(),
        }
    }
}

/// Query execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Statement and wall-clock timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// LIMIT applied to unbounded SELECTs.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_results() -> usize {
    1000
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_results: default_max_results(),
        }
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// LLM provider: "openai" or "mock".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,

    /// API key. Usually supplied via OPENAI_API_KEY instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
        }
    }
}

impl Config {
    /// Loads configuration: file (when present) first, environment second.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default = Self::default_path();
                if default.exists() {
                    Self::from_file(&default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parses a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScoutError::configuration(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        toml::from_str(&content)
            .map_err(|e| ScoutError::configuration(format!("Invalid config file: {e}")))
    }

    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("db-scout")
            .join("config.toml")
    }

    /// Applies environment variables over whatever the file provided.
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("DBSCOUT_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("DBSCOUT_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(origins) = std::env::var("DBSCOUT_CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(secs) = std::env::var("DBSCOUT_QUERY_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                self.query.timeout_secs = secs;
            }
        }
        if let Ok(max) = std::env::var("DBSCOUT_MAX_QUERY_RESULTS") {
            if let Ok(max) = max.parse() {
                self.query.max_results = max;
            }
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            // Accept both a bare path and a sqlite: URL for the state store.
            let path = url.strip_prefix("sqlite:").unwrap_or(&url);
            self.state_db_path = Some(PathBuf::from(path));
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
    }
}
