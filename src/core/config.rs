//! Configuration management for the agency engine
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/agency/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::error::{AgencyError, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Whether to show debug output
    #[serde(default)]
    pub debug: bool,
    /// Reasoning backend configuration
    #[serde(default)]
    pub backend: BackendConfig,
    /// Run loop timing and bounds
    #[serde(default)]
    pub run: RunConfig,
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Persistence configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Reasoning backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the Assistants API
    pub base_url: String,
    /// API key; usually taken from OPENAI_API_KEY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Run loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Delay between two run status polls
    /// Default: 1000
    pub poll_interval_ms: u64,
    /// Delay before retrying a failed run
    /// Default: 30
    pub retry_backoff_secs: u64,
    /// Runs attempted per turn before giving up
    /// Default: 3
    pub max_attempts: u32,
    /// Maximum nesting of agent-to-agent delegation
    /// Default: 8
    pub max_delegation_depth: usize,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (default: 0.0.0.0)
    pub host: String,
    /// Port number (default: 3001)
    pub port: u16,
}

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding agents.json, conversations.json and messages.json
    pub db_path: PathBuf,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            api_key: env::var("OPENAI_API_KEY").ok(),
            timeout_secs: 120,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            retry_backoff_secs: 30,
            max_attempts: 3,
            max_delegation_depth: 8,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: env::var("AGENCY_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: env::var("AGENCY_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("db")),
        }
    }
}

impl RunConfig {
    /// Delay between two run status polls
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Delay before retrying a failed run
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("agency")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > config file > env vars > defaults
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        let mut config = Self::load_from_file().unwrap_or_default();

        if env::var("AGENCY_DEBUG")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false)
        {
            config.debug = true;
        }

        // The key is a secret; only fall back to the environment when the file omits it
        if config.backend.api_key.is_none() {
            config.backend.api_key = env::var("OPENAI_API_KEY").ok();
        }

        config
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(AgencyError::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| AgencyError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| AgencyError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the run loop cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.run.max_attempts == 0 {
            return Err(AgencyError::config("run.max_attempts must be at least 1"));
        }
        if self.run.max_delegation_depth == 0 {
            return Err(AgencyError::config(
                "run.max_delegation_depth must be at least 1",
            ));
        }
        Ok(())
    }

    /// Socket address the HTTP server binds to
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Generate a default config file content for display
    pub fn default_config_toml() -> String {
        let mut config = Config::default();
        config.backend.api_key = None;
        toml::to_string_pretty(&config)
            .unwrap_or_else(|_| String::from("# Error generating config"))
    }
}
