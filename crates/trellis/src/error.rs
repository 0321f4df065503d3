//! Runner error type.

use thiserror::Error;
use trellis_class::ClassError;

/// Errors that stop the runner
#[derive(Debug, Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Configuration validation failed: {0}")]
    Validation(String),
    #[error("Scenario error: {0}")]
    Scenario(String),
    #[error("Component error: {0}")]
    Component(#[from] ClassError),
    #[error("Failed to setup logging: {0}")]
    Logging(String),
}
