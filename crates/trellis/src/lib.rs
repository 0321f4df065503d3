//! # Trellis Runner
//!
//! Mounts Trellis components on a headless page, replays scripted native
//! input through them and unloads the page on shutdown.
//!
//! ## Quick Start
//!
//! ```bash
//! # Create trellis.toml with defaults and exit
//! trellis
//!
//! # Replay a scenario with debug logging
//! trellis --scenario touch.toml --log-level debug
//!
//! # Keep the page mounted until Ctrl+C, JSON logs
//! trellis --scenario touch.toml --wait-for-signal --json-logs
//! ```
//!
//! ## Configuration
//!
//! The runner loads configuration from a TOML file (default: `trellis.toml`).
//! If the file doesn't exist, a default configuration will be created.
//!
//! ## Signal Handling
//!
//! With `--wait-for-signal` the page stays mounted until SIGINT or SIGTERM,
//! after which every native binding is released.

use tracing::{error, info};

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod page;
pub mod scenario;
pub mod signals;

pub use app::Application;
pub use cli::CliArgs;
pub use config::{AppConfig, LoggingSettings};
pub use error::AppError;
pub use page::{Page, ReplayReport};
pub use scenario::Scenario;

/// Runs the full runner lifecycle.
///
/// Exit codes: 0 on success, 1 when startup, configuration or the run fails.
pub async fn init() -> Result<(), AppError> {
    let args = CliArgs::parse();

    let mut config = match AppConfig::load_from_file(&args.config_path).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load {}: {e}", args.config_path.display());
            std::process::exit(1);
        }
    };
    app::apply_overrides(&mut config, &args);

    if let Err(e) = logging::setup_logging(&config.logging, args.json_logs) {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }
    info!("🔧 Loaded configuration from: {}", args.config_path.display());

    match Application::new(config, args) {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {e}");
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e}");
            std::process::exit(1);
        }
    }

    Ok(())
}
