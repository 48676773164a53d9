//! Foreground periodic refresh
//!
//! Each cycle opens the workspace only to apply its batch, so other gview
//! commands keep working between cycles.

use crate::session::{Workspace, WorkspaceTarget};
use crate::util;
use anyhow::Result;
use gv_source::{RecordSource, Refresher};
use owo_colors::{OwoColorize, Stream};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

pub async fn run() -> Result<()> {
    let workspace = Workspace::discover()?;
    let source: Arc<dyn RecordSource> = Arc::new(workspace.source()?);
    let interval_secs = workspace.config.query.interval_secs;
    info!("Watching {}", workspace.state.root().display());

    let target = Arc::new(WorkspaceTarget::new(workspace));
    let refresher = Refresher::new(source, target, Duration::from_secs(interval_secs));

    println!(
        "{} Watching (every {}s, Ctrl-C to stop)",
        "●".if_supports_color(Stream::Stdout, |t| t.cyan()),
        interval_secs
    );

    let (report_tx, mut report_rx) = mpsc::channel(8);
    let handle = tokio::spawn(refresher.clone().run(report_tx));

    loop {
        tokio::select! {
            message = report_rx.recv() => match message {
                Some(Ok(report)) => util::print_report(&report),
                Some(Err(e)) => eprintln!(
                    "{} {}",
                    "✗".if_supports_color(Stream::Stderr, |t| t.red()),
                    e
                ),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                refresher.kill();
                handle.abort();
                println!("\n{}", "Stopped".if_supports_color(Stream::Stdout, |t| t.dimmed()));
                break;
            }
        }
    }

    Ok(())
}
