//! Configuration management for colorin
//!
//! Configuration is loaded from a TOML file or from `COLORIN_*` environment
//! variables and checked with [`Config::validate`]. Every section has
//! defaults, so a partial file is enough.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::models::DEFAULT_ROLE;
use crate::utils::retry::RetryConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Assignment engine configuration
    #[serde(default)]
    pub engine: EngineConfig,

    /// Reference store configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Server
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_address: SocketAddr,

    /// Enable CORS for API
    pub enable_cors: bool,

    /// Enable request logging
    pub enable_request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            enable_cors: true,
            enable_request_logging: true,
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Tuning of the assignment engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Role given to auto-assigned teachers and to requests without one
    pub default_role: String,

    /// Extra attempts after a lost write race
    pub conflict_retries: u32,

    /// How long a writer waits for an event's write scope
    pub lock_timeout_ms: u64,

    /// Longest accepted role label, in characters
    pub max_role_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_role: DEFAULT_ROLE.to_string(),
            conflict_retries: 1,
            lock_timeout_ms: 5000,
            max_role_len: 50,
        }
    }
}

impl EngineConfig {
    /// Create a new config builder
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let role = self.default_role.trim();
        if role.is_empty() {
            return Err(ConfigError::invalid("default_role", "Must not be empty"));
        }
        if role.chars().count() > self.max_role_len {
            return Err(ConfigError::invalid(
                "default_role",
                format!("Longer than max_role_len ({})", self.max_role_len),
            ));
        }
        if self.lock_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "lock_timeout_ms",
                "Must be greater than 0",
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Backoff used when re-running a lost write race
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::with_delays(self.conflict_retries, 10, 200)
    }
}

/// Builder for EngineConfig
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    default_role: Option<String>,
    conflict_retries: Option<u32>,
    lock_timeout_ms: Option<u64>,
    max_role_len: Option<usize>,
}

impl EngineConfigBuilder {
    pub fn default_role(mut self, role: impl Into<String>) -> Self {
        self.default_role = Some(role.into());
        self
    }

    pub fn conflict_retries(mut self, retries: u32) -> Self {
        self.conflict_retries = Some(retries);
        self
    }

    pub fn lock_timeout_ms(mut self, ms: u64) -> Self {
        self.lock_timeout_ms = Some(ms);
        self
    }

    pub fn max_role_len(mut self, len: usize) -> Self {
        self.max_role_len = Some(len);
        self
    }

    /// Build the config
    pub fn build(self) -> std::result::Result<EngineConfig, ConfigError> {
        let defaults = EngineConfig::default();
        let config = EngineConfig {
            default_role: self.default_role.unwrap_or(defaults.default_role),
            conflict_retries: self.conflict_retries.unwrap_or(defaults.conflict_retries),
            lock_timeout_ms: self.lock_timeout_ms.unwrap_or(defaults.lock_timeout_ms),
            max_role_len: self.max_role_len.unwrap_or(defaults.max_role_len),
        };

        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Storage and Logging
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON snapshot loaded into the in-memory store at startup
    pub seed_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let bind_address = match std::env::var("COLORIN_BIND_ADDRESS") {
            Ok(addr) => addr
                .parse()
                .with_context(|| format!("Invalid COLORIN_BIND_ADDRESS: {addr}"))?,
            Err(_) => defaults.server.bind_address,
        };

        let enable_cors =
            env_parse("COLORIN_ENABLE_CORS").unwrap_or(defaults.server.enable_cors);

        let enable_request_logging = env_parse("COLORIN_ENABLE_REQUEST_LOGGING")
            .unwrap_or(defaults.server.enable_request_logging);

        let default_role =
            std::env::var("COLORIN_DEFAULT_ROLE").unwrap_or(defaults.engine.default_role);

        let conflict_retries =
            env_parse("COLORIN_CONFLICT_RETRIES").unwrap_or(defaults.engine.conflict_retries);

        let lock_timeout_ms =
            env_parse("COLORIN_LOCK_TIMEOUT_MS").unwrap_or(defaults.engine.lock_timeout_ms);

        let max_role_len =
            env_parse("COLORIN_MAX_ROLE_LEN").unwrap_or(defaults.engine.max_role_len);

        let seed_path = std::env::var("COLORIN_DATA_PATH").ok().map(PathBuf::from);

        let level = std::env::var("COLORIN_LOG_LEVEL").unwrap_or(defaults.logging.level);

        let format = std::env::var("COLORIN_LOG_FORMAT").unwrap_or(defaults.logging.format);

        Ok(Self {
            server: ServerConfig {
                bind_address,
                enable_cors,
                enable_request_logging,
            },
            engine: EngineConfig {
                default_role,
                conflict_retries,
                lock_timeout_ms,
                max_role_len,
            },
            storage: StorageConfig { seed_path },
            logging: LoggingConfig { level, format },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("logging.format must be 'text' or 'json'");
        }

        Ok(())
    }
}
