//! mapsync CLI - replay source lifecycle scenarios
//!
//! Runs scripted host and engine actions against the in-memory engine and
//! prints what the engine holds afterwards, together with the added/loaded
//! notifications the components emitted.

mod commands;
mod error;
mod scenario;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use mapsync::config::LogConfig;
use mapsync::logging::init_logging;
use mapsync::SyncConfig;

use crate::commands::replay::ReplayArgs;
use crate::error::CliError;

#[derive(Debug, Parser)]
#[command(name = "mapsync", version, about = "Replay map source lifecycle scenarios")]
struct Cli {
    /// Configuration file ([sync] and [logging] sections)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Replay a JSON scenario against the in-memory engine
    Replay {
        /// Scenario file
        scenario: PathBuf,

        /// Record failing steps and continue instead of stopping
        #[arg(long)]
        keep_going: bool,
    },

    /// Print the effective configuration as INI
    Config,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();

    let mut log_config = match config_path {
        Some(path) => LogConfig::load(path)?,
        None => LogConfig::default(),
    };
    match cli.verbose {
        0 => {}
        1 => log_config = log_config.with_filter("mapsync=debug"),
        _ => log_config = log_config.with_filter("mapsync=trace"),
    }
    let _guard = init_logging(&log_config);

    match cli.command {
        Commands::Replay {
            scenario,
            keep_going,
        } => {
            let sync_config = match config_path {
                Some(path) => SyncConfig::load(path)?,
                None => SyncConfig::default(),
            };
            commands::replay::run(
                ReplayArgs {
                    scenario,
                    keep_going,
                },
                sync_config,
            )
        }
        Commands::Config => commands::config::run(config_path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_replay_with_flags() {
        let cli = Cli::parse_from(["mapsync", "-vv", "replay", "scenario.json", "--keep-going"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Commands::Replay { keep_going: true, .. }
        ));
    }
}
