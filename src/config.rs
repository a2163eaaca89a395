//! Configuration types for httpspy

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::{Result, SpyError};

/// How captured request bodies are stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyParsing {
    /// Parse JSON when the body is valid JSON, otherwise keep it as text
    #[default]
    Auto,
    /// Always keep the body as text
    Text,
}

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Mock server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Capture behaviour
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Mock server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind; a random local port is used when absent
    #[serde(default)]
    pub listen_addr: Option<SocketAddr>,
}

/// Capture configuration
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Body parsing strategy
    #[serde(default)]
    pub body_parsing: BodyParsing,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, overridden by `RUST_LOG` when set
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "httpspy=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SpyError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    ///
    /// # Errors
    ///
    /// Returns error if the string is not valid configuration
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| SpyError::ConfigError(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self) -> Result<()> {
        if self.logging.filter.trim().is_empty() {
            return Err(SpyError::ConfigError(
                "logging.filter cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
