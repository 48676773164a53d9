//! Drop the tree and all persisted view state
//!
//! Needed after a schema change, since node ids derive from the schema's
//! property paths and old entries would never be pruned.

use crate::session::Session;
use anyhow::{Context, Result};
use gv_core::StateMap;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

pub async fn run() -> Result<()> {
    let mut session = Session::open().await?;
    let nodes = session.engine.tree().len();
    let expanded = session.store.count(StateMap::Expanded);
    let changed = session.store.count(StateMap::Changed);

    session.engine.clear();
    session
        .store
        .clear_all()
        .context("Failed to clear state database")?;

    println!("{} Cleared {} nodes", "✓".if_supports_color(Stdout, |t| t.green()), nodes);
    println!(
        "  {}",
        format!(
            "Dropped {} expansion and {} change flags, last batch and filters",
            expanded, changed
        )
        .if_supports_color(Stdout, |t| t.dimmed())
    );
    Ok(())
}
