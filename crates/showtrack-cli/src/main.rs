//! showtrack CLI
//!
//! Command-line interface for showtrack - offline TV program tracking with
//! multi-device sync.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use showtrack_core::{Config, Store};

mod commands;
mod output;
mod ui;

use commands::episode::NewEpisode;
use output::{Output, OutputFormat};
use ui::ConsoleUi;

#[derive(Parser)]
#[command(name = "showtrack")]
#[command(about = "showtrack - Offline TV program tracking with multi-device sync")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Answer yes to every confirmation prompt
    #[arg(short, long, global = true)]
    yes: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage programs
    Program {
        #[command(subcommand)]
        command: ProgramCommands,
    },
    /// Manage series
    Series {
        #[command(subcommand)]
        command: SeriesCommands,
    },
    /// Manage episodes
    Episode {
        #[command(subcommand)]
        command: EpisodeCommands,
    },
    /// Device registration
    Device {
        #[command(subcommand)]
        command: Option<DeviceCommands>,
    },
    /// Push local changes to the sync server
    Export,
    /// Pull changes from the sync server
    Import {
        /// Only fetch documents pending for this device
        #[arg(long)]
        fast: bool,
        /// Replace all local data, even when fast_import is configured
        #[arg(long, conflicts_with = "fast")]
        full: bool,
    },
    /// Export, then import
    Sync {
        /// Use a fast import after the export
        #[arg(long)]
        fast: bool,
        /// Use a full import after the export, even when fast_import is configured
        #[arg(long, conflicts_with = "fast")]
        full: bool,
    },
    /// Show status (device, last sync, pending changes)
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ProgramCommands {
    /// Add a program
    Add {
        /// Program name
        name: String,
    },
    /// List all programs
    #[command(alias = "ls")]
    List,
    /// Delete a program
    #[command(alias = "rm")]
    Delete {
        /// Program ID (full ID or prefix)
        id: String,
    },
}

#[derive(Subcommand)]
enum SeriesCommands {
    /// Add a series to a program
    Add {
        /// Series name
        name: String,
        /// Program ID (full ID or prefix)
        #[arg(short, long)]
        program: String,
        /// Day of the week the series is showing on
        #[arg(long)]
        now_showing: Option<u32>,
    },
    /// List series
    #[command(alias = "ls")]
    List {
        /// Only series of this program
        #[arg(short, long)]
        program: Option<String>,
    },
    /// Delete a series
    #[command(alias = "rm")]
    Delete {
        /// Series ID (full ID or prefix)
        id: String,
    },
}

#[derive(Subcommand)]
enum EpisodeCommands {
    /// Add an episode to a series
    Add {
        /// Episode name
        name: String,
        /// Series ID (full ID or prefix)
        #[arg(short, long)]
        series: String,
        /// Watched, recorded, expected or missed
        #[arg(long)]
        status: Option<String>,
        /// Date the status applies to
        #[arg(long)]
        date: Option<String>,
        /// Position within the series (defaults to last)
        #[arg(long)]
        sequence: Option<u32>,
    },
    /// List episodes
    #[command(alias = "ls")]
    List {
        /// Only episodes of this series
        #[arg(short, long)]
        series: Option<String>,
    },
    /// Delete an episode
    #[command(alias = "rm")]
    Delete {
        /// Episode ID (full ID or prefix)
        id: String,
    },
}

#[derive(Subcommand, Clone)]
enum DeviceCommands {
    /// Show this device's registration
    Show,
    /// Register this device with the sync server
    Register {
        /// Name for this device
        name: String,
    },
    /// Unregister this device
    Unregister,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, server_url, fast_import, request_timeout_secs, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands work even when the config file is broken
    if let Commands::Config { command } = &cli.command {
        return match command.clone() {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, &output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key, value, config_path, &output)
            }
        };
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config);

    let mut store = Store::open(&config).context("Failed to open database")?;

    match cli.command {
        Commands::Program { command } => match command {
            ProgramCommands::Add { name } => commands::program::add(&mut store, name, &output),
            ProgramCommands::List => commands::program::list(&store, &output),
            ProgramCommands::Delete { id } => commands::program::delete(&mut store, id, &output),
        },
        Commands::Series { command } => match command {
            SeriesCommands::Add {
                name,
                program,
                now_showing,
            } => commands::series::add(&mut store, name, program, now_showing, &output),
            SeriesCommands::List { program } => commands::series::list(&store, program, &output),
            SeriesCommands::Delete { id } => commands::series::delete(&mut store, id, &output),
        },
        Commands::Episode { command } => match command {
            EpisodeCommands::Add {
                name,
                series,
                status,
                date,
                sequence,
            } => commands::episode::add(
                &mut store,
                NewEpisode {
                    name,
                    series,
                    status,
                    date,
                    sequence,
                },
                &output,
            ),
            EpisodeCommands::List { series } => commands::episode::list(&store, series, &output),
            EpisodeCommands::Delete { id } => commands::episode::delete(&mut store, id, &output),
        },
        Commands::Status => commands::status::show(&store, &config, &output),
        Commands::Device { command } => match command {
            Some(DeviceCommands::Show) | None => commands::device::show(&store, &output),
            Some(DeviceCommands::Register { name }) => {
                let controller =
                    commands::sync::controller(&config, store, ConsoleUi::new(output, cli.yes))?;
                commands::device::register(&controller, name, &output).await
            }
            Some(DeviceCommands::Unregister) => {
                let controller =
                    commands::sync::controller(&config, store, ConsoleUi::new(output, cli.yes))?;
                commands::device::unregister(&controller, cli.yes, &output).await
            }
        },
        Commands::Export => {
            let controller =
                commands::sync::controller(&config, store, ConsoleUi::new(output, cli.yes))?;
            commands::sync::export(&controller, &output).await
        }
        Commands::Import { fast, full } => {
            let fast = commands::sync::fast_requested(fast, full, &config);
            let controller =
                commands::sync::controller(&config, store, ConsoleUi::new(output, cli.yes))?;
            commands::sync::import(&controller, fast, &output).await
        }
        Commands::Sync { fast, full } => {
            let fast = commands::sync::fast_requested(fast, full, &config);
            let controller =
                commands::sync::controller(&config, store, ConsoleUi::new(output, cli.yes))?;
            commands::sync::sync(&controller, fast, &output).await
        }
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

/// Initialize logging
///
/// Level comes from SHOWTRACK_LOG (default `warn`). Logs go to the
/// configured log file when set, otherwise to stderr.
fn init_logging(config: &Config) {
    let level = std::env::var("SHOWTRACK_LOG").unwrap_or_else(|_| "warn".to_string());
    let env_filter = EnvFilter::try_new(format!(
        "showtrack_core={},showtrack={}",
        level, level
    ))
    .unwrap_or_else(|_| EnvFilter::new("warn"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    // Ignore error if already initialized
    match config.log_file {
        Some(ref log_path) => match File::create(log_path) {
            Ok(file) => {
                let _ = builder.with_ansi(false).with_writer(file).try_init();
                info!("Logging to {:?}", log_path);
            }
            Err(e) => {
                eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
                let _ = builder.with_writer(std::io::stderr).try_init();
            }
        },
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_full_flag() {
        let cli = Cli::try_parse_from(["showtrack", "import", "--full"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Import {
                fast: false,
                full: true
            }
        ));
    }

    #[test]
    fn test_fast_and_full_conflict() {
        assert!(Cli::try_parse_from(["showtrack", "import", "--fast", "--full"]).is_err());
        assert!(Cli::try_parse_from(["showtrack", "sync", "--fast", "--full"]).is_err());
    }
}
