//! Rollup CLI - rollup command

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;
mod locks;
mod system_config;
mod util;
mod zfs;

/// Rollup - tiered retention for ZFS snapshots
#[derive(Parser)]
#[command(name = "rollup")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: <config dir>/rollup/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose output; repeat for more log detail (-vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the tier policy and destroy snapshots no tier keeps
    Prune {
        /// Datasets to prune
        #[arg(required = true)]
        datasets: Vec<String>,
        /// Only display what would be pruned (implies -v)
        #[arg(short, long)]
        test: bool,
        /// Let empty snapshots give way to non-empty ones in the same bucket
        #[arg(short = 'z', long)]
        empty: bool,
        /// Include descendant datasets
        #[arg(short, long)]
        recursive: bool,
        /// Snapshot name prefix to manage (repeatable, default: auto)
        #[arg(short, long = "prefix", value_name = "PREFIX")]
        prefixes: Vec<String>,
        /// Print decisions as JSON
        #[arg(long)]
        json: bool,
        /// Print `zfs destroy` commands instead of destroying
        #[arg(long, conflicts_with = "json")]
        print_commands: bool,
    },
    /// Destroy empty snapshots one at a time until none are left
    ClearEmpty {
        /// Datasets to clear
        #[arg(required = true)]
        datasets: Vec<String>,
        /// Only display what would be destroyed
        #[arg(short, long)]
        test: bool,
        /// Include descendant datasets
        #[arg(short, long)]
        recursive: bool,
        /// Snapshot name prefix to manage (repeatable, default: auto)
        #[arg(short, long = "prefix", value_name = "PREFIX")]
        prefixes: Vec<String>,
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the effective retention tiers
    Tiers,
    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all configuration values
    List,
    /// Show the config file path
    Path {
        /// Create the file with example content if it does not exist
        #[arg(long)]
        create: bool,
    },
    /// Print an example configuration
    Example,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let explicit = cli.config.as_deref();

    match cli.command {
        Commands::Prune {
            datasets,
            test,
            empty,
            recursive,
            prefixes,
            json,
            print_commands,
        } => {
            let config = system_config::load(explicit)?;
            let opts = cmd::prune::PruneOptions {
                datasets,
                test,
                verbose: cli.verbose > 0,
                empty,
                recursive,
                prefixes,
                json,
                print_commands,
            };
            cmd::prune::run(config, opts).await
        }
        Commands::ClearEmpty {
            datasets,
            test,
            recursive,
            prefixes,
            json,
        } => {
            let config = system_config::load(explicit)?;
            let opts = cmd::clear_empty::ClearEmptyOptions {
                datasets,
                test,
                recursive,
                prefixes,
                json,
            };
            cmd::clear_empty::run(config, opts).await
        }
        Commands::Tiers => {
            let config = system_config::load(explicit)?;
            cmd::tiers::run(&config).await
        }
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List => {
                let config = system_config::load(explicit)?;
                cmd::config::run_list(&config, explicit).await
            }
            ConfigCommands::Path { create } => cmd::config::run_path(explicit, create).await,
            ConfigCommands::Example => cmd::config::run_example().await,
        },
    }
}
