//! Configuration management for the Trellis runner.
//!
//! Settings are read from a TOML file. Every section falls back to its
//! defaults when omitted, and a missing file is created with the defaults.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;
use trellis_events::{EmitterConfig, RegistryConfig};

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

fn default_log_level() -> String {
    "info".to_string()
}

/// Top-level runner configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging output settings
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Defaults for every component emitter
    #[serde(default)]
    pub events: EmitterConfig,
    /// Native listener registry settings
    #[serde(default)]
    pub registry: RegistryConfig,
}

/// Logging system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, writes the default configuration to `path`
    /// and returns it.
    pub async fn load_from_file(path: &Path) -> Result<Self, AppError> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("📝 Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Validates the configuration settings
    pub fn validate(&self) -> Result<(), String> {
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {VALID_LOG_LEVELS:?}",
                self.logging.level
            ));
        }

        if self.registry.handle_prefix.trim().is_empty() {
            return Err("registry.handle_prefix cannot be empty".to_string());
        }

        if self.events.native_events.is_empty() {
            return Err("events.native_events must list at least one event".to_string());
        }

        if let Some(name) = self
            .events
            .native_events
            .iter()
            .find(|name| name.is_empty() || name.contains(char::is_whitespace))
        {
            return Err(format!("Invalid native event name: {name:?}"));
        }

        Ok(())
    }
}
