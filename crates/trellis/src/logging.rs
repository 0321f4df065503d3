//! Logging system setup.
//!
//! `RUST_LOG` takes precedence over the configured level when set.

use crate::config::LoggingSettings;
use crate::error::AppError;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global tracing subscriber.
///
/// # Arguments
///
/// * `config` - Logging configuration from the config file
/// * `json_format` - Force JSON output regardless of `config.json_format`
///
/// # Returns
///
/// `Ok(())` once the subscriber is installed, or [`AppError::Logging`] when a
/// global subscriber was already set.
pub fn setup_logging(config: &LoggingSettings, json_format: bool) -> Result<(), AppError> {
    let log_level = config.level.as_str();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);

    let installed = if json_format || config.json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_file(false)
                    .with_line_number(false)
                    .with_thread_names(true),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_file(false)
                    .with_line_number(false)
                    .with_target(false),
            )
            .try_init()
    };
    installed.map_err(|e| AppError::Logging(e.to_string()))?;

    info!("🔧 Logging initialized with level: {}", log_level);
    Ok(())
}

/// Logs the startup banner
pub fn display_banner() {
    info!("╔══════════════════════════════════════╗");
    info!("║           🌿 TRELLIS RUNNER          ║");
    info!("║  runner v{:<8}   events v{:<8} ║", env!("CARGO_PKG_VERSION"), trellis_events::VERSION);
    info!("╚══════════════════════════════════════╝");
}
