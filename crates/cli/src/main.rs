//! gview CLI - review-query tree in the terminal

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gv_state::StateDir;
use std::path::PathBuf;

mod cmd;
mod config;
mod locks;
mod logging;
mod session;
mod util;

/// gview - Group query results into a live, filterable tree
#[derive(Parser)]
#[command(name = "gview")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Debug-level logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize gview in the current directory
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Show configuration
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Run the query once and update the tree
    Refresh,
    /// Print the tree
    Show {
        /// Ignore filters and expansion state
        #[arg(short, long)]
        all: bool,
        /// Print node ids
        #[arg(long)]
        ids: bool,
    },
    /// Manage filters
    #[command(subcommand)]
    Filter(FilterCommands),
    /// Expand a node (id or unique id prefix)
    Expand {
        id: String,
    },
    /// Collapse a node (id or unique id prefix)
    Collapse {
        id: String,
    },
    /// Acknowledge changes on a node and everything below it
    Ack {
        /// Node id or unique id prefix
        id: Option<String>,
        /// Acknowledge every change
        #[arg(long, conflicts_with = "id")]
        all: bool,
    },
    /// Drop the tree and all persisted state (e.g. after a schema change)
    Clear,
    /// Refresh periodically in the foreground
    Watch {
        /// Directory for the daily-rolling log file [default: .gview/logs]
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all configuration values
    List,
    /// Print one value (e.g. query.interval_secs)
    Get {
        key: String,
    },
    /// Print the config file path
    Path,
    /// Print an example configuration
    Example,
}

#[derive(Subcommand)]
enum FilterCommands {
    /// Show nodes whose KEY property matches PATTERN (regex)
    Add {
        key: String,
        pattern: String,
    },
    /// Remove every filter on KEY
    Remove {
        key: String,
    },
    /// Remove all filters, including changed-only
    Clear,
    /// Show only changed entities
    ChangedOnly {
        #[arg(value_enum)]
        state: Toggle,
    },
    /// List active filters
    List,
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

/// `.gview/logs` of the enclosing workspace, if there is one
fn default_log_dir() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    StateDir::discover(&cwd).ok().map(|state| state.logs_dir())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_dir = match &cli.command {
        Commands::Watch { log_dir } => {
            let dir = log_dir.clone().or_else(default_log_dir);
            if let Some(dir) = &dir {
                std::fs::create_dir_all(dir).with_context(|| {
                    format!("Failed to create log directory {}", dir.display())
                })?;
            }
            dir
        }
        _ => None,
    };
    let _log_guard = logging::init(cli.verbose, log_dir.as_deref());

    match cli.command {
        Commands::Init { force } => cmd::init::run(force).await,
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List => cmd::config::run_list().await,
            ConfigCommands::Get { key } => cmd::config::run_get(&key).await,
            ConfigCommands::Path => cmd::config::run_path().await,
            ConfigCommands::Example => cmd::config::run_example().await,
        },
        Commands::Refresh => cmd::refresh::run().await,
        Commands::Show { all, ids } => cmd::show::run(all, ids).await,
        Commands::Filter(filter_cmd) => match filter_cmd {
            FilterCommands::Add { key, pattern } => cmd::filter::run_add(&key, &pattern).await,
            FilterCommands::Remove { key } => cmd::filter::run_remove(&key).await,
            FilterCommands::Clear => cmd::filter::run_clear().await,
            FilterCommands::ChangedOnly { state } => {
                cmd::filter::run_changed_only(matches!(state, Toggle::On)).await
            }
            FilterCommands::List => cmd::filter::run_list().await,
        },
        Commands::Expand { id } => cmd::node::run_expand(&id, true).await,
        Commands::Collapse { id } => cmd::node::run_expand(&id, false).await,
        Commands::Ack { id, all } => cmd::node::run_ack(id.as_deref(), all).await,
        Commands::Clear => cmd::clear::run().await,
        Commands::Watch { .. } => cmd::watch::run().await,
    }
}
