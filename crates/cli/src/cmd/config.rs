//! Configuration inspection command

use crate::config::{example_config, policy_name, Config};
use anyhow::{Context, Result};
use gv_state::StateDir;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

fn locate() -> Result<StateDir> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    StateDir::discover(&cwd)
}

/// List all configuration values
pub async fn run_list() -> Result<()> {
    let state = locate()?;
    let config_path = state.config_path();
    let config = Config::load(&config_path)?;

    println!("{}", "Configuration".if_supports_color(Stdout, |t| t.bold()));
    println!(
        "{}: {}\n",
        "Location".if_supports_color(Stdout, |t| t.dimmed()),
        config_path.display().if_supports_color(Stdout, |t| t.dimmed())
    );

    println!("{}", "[query]".if_supports_color(Stdout, |t| t.yellow()));
    println!(
        "  {} = {}",
        "command".if_supports_color(Stdout, |t| t.cyan()),
        config.query.command
    );
    println!(
        "  {} = {} {}",
        "interval_secs".if_supports_color(Stdout, |t| t.cyan()),
        config.query.interval_secs,
        format!("({} min)", config.query.interval_secs / 60)
            .if_supports_color(Stdout, |t| t.dimmed())
    );
    println!(
        "  {} = {} {}",
        "max_output_bytes".if_supports_color(Stdout, |t| t.cyan()),
        config.query.max_output_bytes,
        format!("({} KiB)", config.query.max_output_bytes / 1024)
            .if_supports_color(Stdout, |t| t.dimmed())
    );

    println!("\n{}", "[tree]".if_supports_color(Stdout, |t| t.yellow()));
    println!(
        "  {} = {}",
        "key_field".if_supports_color(Stdout, |t| t.cyan()),
        match &config.tree.key_field {
            Some(key) => key.clone(),
            None => "(none, change detection off)"
                .if_supports_color(Stdout, |t| t.dimmed())
                .to_string(),
        }
    );
    println!(
        "  {} = {}",
        "filter_case_sensitive".if_supports_color(Stdout, |t| t.cyan()),
        config.tree.filter_case_sensitive
    );
    println!(
        "  {} = {}",
        "change_policy".if_supports_color(Stdout, |t| t.cyan()),
        policy_name(config.tree.change_policy)
    );
    println!(
        "  {} = {}",
        "expand_by_default".if_supports_color(Stdout, |t| t.cyan()),
        config.tree.expand_by_default
    );

    println!("\n{}", "[schema]".if_supports_color(Stdout, |t| t.yellow()));
    for (index, level) in config.schema.levels.iter().enumerate() {
        let fields: Vec<String> = level
            .children
            .iter()
            .map(|entry| match entry {
                gv_core::FieldEntry::Property(property) => property.clone(),
                gv_core::FieldEntry::Spec(spec) => spec.property.clone(),
            })
            .collect();
        match &level.parent {
            Some(parent) => println!(
                "  level {}: {} {}",
                index,
                fields.join(", ").if_supports_color(Stdout, |t| t.cyan()),
                format!("(under {})", parent).if_supports_color(Stdout, |t| t.dimmed())
            ),
            None => println!(
                "  level {}: {}",
                index,
                fields.join(", ").if_supports_color(Stdout, |t| t.cyan())
            ),
        }
    }

    println!("\n{}", "Valid Ranges:".if_supports_color(Stdout, |t| t.bold()));
    println!("  interval_secs: 10-86400");
    println!("  max_output_bytes: >= 1024");
    println!("  change_policy: acknowledge | auto-clear");

    Ok(())
}

/// Get a single configuration value
pub async fn run_get(key: &str) -> Result<()> {
    let state = locate()?;
    let config = Config::load(&state.config_path())?;
    println!("{}", config.get(key)?);
    Ok(())
}

/// Show the config file path
pub async fn run_path() -> Result<()> {
    let state = locate()?;
    println!("{}", state.config_path().display());
    Ok(())
}

/// Show example configuration
pub async fn run_example() -> Result<()> {
    println!("{}", example_config());
    Ok(())
}
