//! Run the query once and reconcile
//!
//! The query runs without the workspace lock; the lock is taken only to
//! apply the batch.

use crate::session::{Workspace, WorkspaceTarget};
use crate::util;
use anyhow::{Context, Result};
use gv_source::{RecordSource, RefreshError, RefreshOutcome, Refresher, SourceError};
use std::sync::Arc;
use std::time::Duration;

pub async fn run() -> Result<()> {
    let workspace = Workspace::discover()?;
    let source = workspace.source()?;
    let spinner = util::spinner(format!("Running {}", source.command()));

    let interval = Duration::from_secs(workspace.config.query.interval_secs);
    let source: Arc<dyn RecordSource> = Arc::new(source);
    let refresher = Refresher::new(source, Arc::new(WorkspaceTarget::new(workspace)), interval);

    let outcome = tokio::select! {
        result = refresher.refresh_once() => result,
        _ = tokio::signal::ctrl_c() => {
            refresher.kill();
            Err(RefreshError::Source(SourceError::Cancelled))
        }
    };
    spinner.finish_and_clear();

    match outcome.context("Refresh aborted")? {
        RefreshOutcome::Applied(report) => util::print_report(&report),
        // Nothing else drives this refresher
        RefreshOutcome::Skipped => {}
    }
    Ok(())
}
