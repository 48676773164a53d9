//! Periodic refresh loop
//!
//! Queries the source, then hands the batch to a [`BatchTarget`]. A refresh
//! requested while another is still running is ignored.

use crate::{RecordSource, SourceError};
use async_trait::async_trait;
use gv_core::{RefreshReport, TreeEngine};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Where fetched batches are reconciled
#[async_trait]
pub trait BatchTarget: Send + Sync {
    /// Reconcile one complete batch
    async fn apply(&self, records: &[Value]) -> anyhow::Result<RefreshReport>;
}

/// An engine kept in memory, locked for the duration of the reconcile
#[async_trait]
impl BatchTarget for Mutex<TreeEngine> {
    async fn apply(&self, records: &[Value]) -> anyhow::Result<RefreshReport> {
        Ok(self.lock().refresh(records))
    }
}

/// A failed refresh cycle
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// The query failed; nothing was applied
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Failed to apply batch: {0:#}")]
    Apply(anyhow::Error),
}

/// Result of one refresh request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied(RefreshReport),
    /// Another refresh was in flight
    Skipped,
}

/// Drives refresh cycles against a shared target
///
/// Clones share the target, the source and the in-flight flag.
#[derive(Clone)]
pub struct Refresher {
    source: Arc<dyn RecordSource>,
    target: Arc<dyn BatchTarget>,
    in_flight: Arc<AtomicBool>,
    interval: Duration,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Refresher {
    pub fn new(
        source: Arc<dyn RecordSource>,
        target: Arc<dyn BatchTarget>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            target,
            in_flight: Arc::new(AtomicBool::new(false)),
            interval,
        }
    }

    /// Query once and reconcile
    ///
    /// On a source error the target is not touched.
    pub async fn refresh_once(&self) -> Result<RefreshOutcome, RefreshError> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            debug!("Refresh already in flight, ignoring request");
            return Ok(RefreshOutcome::Skipped);
        }
        let _guard = InFlight(&self.in_flight);

        let records = self.source.query().await?;
        let report = self
            .target
            .apply(&records)
            .await
            .map_err(RefreshError::Apply)?;
        Ok(RefreshOutcome::Applied(report))
    }

    /// Cancel the in-flight query, if any
    pub fn kill(&self) {
        self.source.kill();
    }

    /// Refresh on every tick until the receiver goes away
    ///
    /// The first tick fires immediately.
    pub async fn run(self, report_tx: mpsc::Sender<Result<RefreshReport, RefreshError>>) {
        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Starting periodic refresh (interval: {:?})", self.interval);

        loop {
            timer.tick().await;

            let message = match self.refresh_once().await {
                Ok(RefreshOutcome::Applied(report)) => {
                    if report.changed.is_empty() {
                        debug!("Periodic refresh: no changes");
                    } else {
                        info!("Periodic refresh found {} changed entities", report.changed.len());
                    }
                    Ok(report)
                }
                Ok(RefreshOutcome::Skipped) => continue,
                Err(e) => {
                    warn!("Periodic refresh failed: {}", e);
                    Err(e)
                }
            };

            if report_tx.send(message).await.is_err() {
                debug!("Report receiver dropped, stopping refresh loop");
                return;
            }
        }
    }
}

impl std::fmt::Debug for Refresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Refresher")
            .field("interval", &self.interval)
            .field("in_flight", &self.in_flight.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}
