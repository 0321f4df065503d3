//! Command-line interface handling for the Trellis runner.

use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

const DEFAULT_CONFIG_PATH: &str = "trellis.toml";

/// Command line arguments parsed from user input.
///
/// Options given here override the matching configuration file settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Scenario to replay against the headless page
    pub scenario_path: Option<PathBuf>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Keep the page mounted until a shutdown signal arrives
    pub wait_for_signal: bool,
}

impl CliArgs {
    /// Parses the process arguments, exiting with usage on error
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    /// Parses an explicit argument list
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::from_matches(&command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
            scenario_path: matches.get_one::<String>("scenario").map(PathBuf::from),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            wait_for_signal: matches.get_flag("wait-for-signal"),
        }
    }
}

fn command() -> Command {
    Command::new("Trellis")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Headless runner for Trellis UI components and their event plumbing")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value(DEFAULT_CONFIG_PATH),
        )
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("Scenario file with elements, components and scripted native events"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("wait-for-signal")
                .short('w')
                .long("wait-for-signal")
                .help("Keep the page mounted until Ctrl+C or SIGTERM, then release every listener")
                .action(ArgAction::SetTrue),
        )
}
