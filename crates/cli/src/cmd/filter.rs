//! Manage tree filters
//!
//! Filters persist across invocations; `show` and `watch` apply them.

use crate::cmd::show::describe_filters;
use crate::session::Session;
use anyhow::{Context, Result};
use gv_core::RootsView;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

fn finish(session: &Session, message: String) -> Result<()> {
    session.save_filters()?;
    println!("{} {}", "✓".if_supports_color(Stdout, |t| t.green()), message);

    match session.engine.visible_roots() {
        RootsView::Nodes(keys) => println!("  {} top-level nodes visible", keys.len()),
        RootsView::AllHidden => println!(
            "  {}",
            "Nothing matches the active filters".if_supports_color(Stdout, |t| t.yellow())
        ),
        RootsView::Empty => {}
    }
    Ok(())
}

pub async fn run_add(key: &str, pattern: &str) -> Result<()> {
    let mut session = Session::open().await?;
    session
        .engine
        .add_filter(key, pattern)
        .context("Failed to add filter")?;
    let key = key.if_supports_color(Stdout, |t| t.cyan());
    finish(&session, format!("Filter added: {}=~{}", key, pattern))
}

pub async fn run_remove(key: &str) -> Result<()> {
    let mut session = Session::open().await?;
    let removed = session.engine.remove_filter(key);
    if removed == 0 {
        anyhow::bail!("No filter on '{}'", key);
    }
    let key = key.if_supports_color(Stdout, |t| t.cyan());
    finish(&session, format!("Removed {} filter(s) on {}", removed, key))
}

pub async fn run_clear() -> Result<()> {
    let mut session = Session::open().await?;
    session.engine.clear_filters();
    session.engine.set_changed_only(false);
    finish(&session, "Filters cleared".to_string())
}

pub async fn run_changed_only(enabled: bool) -> Result<()> {
    let mut session = Session::open().await?;
    session.engine.set_changed_only(enabled);
    let state = if enabled { "on" } else { "off" };
    finish(&session, format!("Changed-only {}", state.if_supports_color(Stdout, |t| t.cyan())))
}

pub async fn run_list() -> Result<()> {
    let session = Session::open().await?;
    let filters = session.engine.filter_state();
    if !filters.is_active() {
        println!("{}", "No active filters".if_supports_color(Stdout, |t| t.dimmed()));
        return Ok(());
    }
    println!("{}", describe_filters(filters));
    Ok(())
}
