//! Initialize gview in the current directory

use crate::config::example_config;
use anyhow::{Context, Result};
use gv_state::{atomic_write, StateDir};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use std::env;

pub async fn run(force: bool) -> Result<()> {
    let current_dir = env::current_dir().context("Failed to get current directory")?;
    let state = StateDir::init(&current_dir)?;
    let config_path = state.config_path();

    if config_path.exists() && !force {
        anyhow::bail!(
            "gview already initialized at {} (use --force to overwrite the config)",
            state.dir().display()
        );
    }

    atomic_write(&state.tmp_dir(), &config_path, example_config().as_bytes())
        .context("Failed to write config file")?;

    println!(
        "{} Initialized gview at {}",
        "✓".if_supports_color(Stdout, |t| t.green()),
        state.dir().display()
    );
    println!();
    println!("Created .gview/ directory structure:");
    println!("  - .gview/config.toml    (query, tree options and schema)");
    println!("  - .gview/state/         (view state and last batch)");
    println!("  - .gview/locks/         (refresh lock)");
    println!("  - .gview/logs/          (watch logs)");
    println!();
    println!("Next steps:");
    println!("  - Edit [query].command in .gview/config.toml");
    println!("  - Run 'gview refresh' to fetch records");
    println!("  - Run 'gview show' to display the tree");
    Ok(())
}
