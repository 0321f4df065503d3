//! Application lifecycle: configuration, page mount, replay and teardown.

use crate::cli::CliArgs;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::logging::display_banner;
use crate::page::Page;
use crate::scenario::Scenario;
use crate::signals::wait_for_shutdown;
use tracing::info;

/// The runner application.
///
/// Holds the validated configuration and the command-line options that
/// decide what happens once the page is mounted.
pub struct Application {
    config: AppConfig,
    args: CliArgs,
}

impl Application {
    /// Validates a loaded configuration that already carries the CLI
    /// overrides.
    ///
    /// # Arguments
    ///
    /// * `config` - Settings read by [`AppConfig::load_from_file`] with
    ///   [`apply_overrides`] applied
    /// * `args` - Parsed command-line options
    ///
    /// # Returns
    ///
    /// The application, or [`AppError::Validation`] when a setting is invalid.
    pub fn new(config: AppConfig, args: CliArgs) -> Result<Self, AppError> {
        config.validate().map_err(AppError::Validation)?;
        info!("✅ Configuration loaded and validated successfully");

        display_banner();
        Ok(Self { config, args })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Mounts the page, replays the scenario if one was given, optionally
    /// waits for a shutdown signal and finally tears the page down.
    pub async fn run(self) -> Result<(), AppError> {
        self.log_configuration_summary();
        let mut page = Page::new(&self.config);

        if let Some(path) = &self.args.scenario_path {
            info!("📜 Loading scenario from: {}", path.display());
            let scenario = Scenario::load(path).await?;
            page.mount(&scenario)?;

            let report = page.replay(&scenario.events);
            info!("📊 Replay Summary:");
            info!("  - Native events dispatched: {}", report.dispatched);
            info!("  - Custom events delivered: {}", report.delivered);
            info!("  - Native events stopped: {}", report.stopped);
            info!("  - Unhandled native events: {}", report.unhandled);
        }

        if self.args.wait_for_signal {
            info!(
                "✅ Page mounted with {} components on {} elements",
                page.component_count(),
                page.registry().element_count()
            );
            info!("🛑 Press Ctrl+C to unload the page");
            wait_for_shutdown().await?;
        }

        let released = page.teardown();
        info!("👋 Trellis runner finished ({} bindings released on unload)", released);
        Ok(())
    }

    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("  🔊 Log level: {}", self.config.logging.level);
        info!("  🖱️ Native events: {}", self.config.events.native_events.len());
        info!("  🌊 Fall through: {}", self.config.events.fall_through);
        info!("  🏷️ Handle prefix: {}", self.config.registry.handle_prefix);
    }
}

/// Applies command-line overrides on top of file settings
pub fn apply_overrides(config: &mut AppConfig, args: &CliArgs) {
    if let Some(log_level) = &args.log_level {
        config.logging.level = log_level.clone();
    }
    if args.json_logs {
        config.logging.json_format = true;
    }
}
