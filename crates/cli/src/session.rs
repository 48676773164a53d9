//! Workspace context: config, lock, store and a rebuilt engine

use crate::config::Config;
use crate::locks::RefreshLock;
use anyhow::{Context, Result};
use async_trait::async_trait;
use gv_core::{FormatterRegistry, NodeKey, RefreshReport, TreeEngine};
use gv_source::{BatchTarget, CommandSource};
use gv_state::{SledStateStore, StateDir};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// How long a command waits for another gview process to release the lock
pub const LOCK_WAIT: Duration = Duration::from_secs(5);

/// A discovered workspace with its config; holds no lock
#[derive(Debug, Clone)]
pub struct Workspace {
    pub state: StateDir,
    pub config: Config,
}

impl Workspace {
    /// Find the workspace containing the current directory and load its config
    pub fn discover() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        let state = StateDir::discover(&cwd)?;
        let config = Config::load(&state.config_path())?;
        Ok(Self { state, config })
    }

    /// Record source for the configured query, run from the workspace root
    pub fn source(&self) -> Result<CommandSource> {
        let command = self.config.query.command.trim();
        if command.is_empty() {
            anyhow::bail!(
                "No query command configured (set [query].command in {})",
                self.state.config_path().display()
            );
        }
        Ok(CommandSource::new(command)
            .with_max_output(self.config.query.max_output_bytes)
            .with_cwd(self.state.root()))
    }

    /// Lock the workspace and rebuild the tree from the last saved batch
    ///
    /// The replay is a first population, so it flags nothing by itself;
    /// changed flags come back from the persisted map.
    pub async fn open_session(&self) -> Result<Session> {
        let lock = RefreshLock::acquire_within(&self.state.locks_dir(), LOCK_WAIT).await?;
        debug!("Holding workspace lock at {}", lock.path().display());

        let schema = self
            .config
            .schema
            .compile(&FormatterRegistry::with_builtins())
            .context("Invalid [schema] in config")?;
        let store = SledStateStore::open(&self.state.state_dir())?;
        let mut engine = TreeEngine::new(
            schema,
            self.config.tree.engine_options(),
            Box::new(store.clone()),
        )
        .context("Invalid [tree] in config")?;

        match store.load_filters() {
            Ok(Some(filters)) => {
                if let Err(e) = engine.restore_filters(filters) {
                    warn!("Ignoring stored filters: {}", e);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Failed to load stored filters: {:#}", e),
        }

        let snapshot = store.load_snapshot().unwrap_or_else(|e| {
            warn!("Ignoring unreadable snapshot: {:#}", e);
            None
        });
        let snapshot_at_ms = snapshot.as_ref().map(|s| s.saved_at_ms);
        if let Some(snapshot) = snapshot {
            let report = engine.refresh(&snapshot.records);
            debug!(
                "Replayed {} records into {} nodes",
                snapshot.records.len(),
                report.total_nodes
            );
        }

        Ok(Session {
            store,
            engine,
            snapshot_at_ms,
            _lock: lock,
        })
    }
}

/// Everything one command needs while it holds the workspace lock
///
/// Fields drop in order, so the database is closed before the lock is
/// released.
pub struct Session {
    pub store: SledStateStore,
    pub engine: TreeEngine,
    /// When the replayed batch was fetched
    pub snapshot_at_ms: Option<u64>,
    _lock: RefreshLock,
}

impl Session {
    /// Open the workspace containing the current directory
    pub async fn open() -> Result<Self> {
        Workspace::discover()?.open_session().await
    }

    /// Reconcile a fetched batch and persist it as the new snapshot
    pub fn apply(&mut self, records: &[Value]) -> Result<RefreshReport> {
        let report = self.engine.refresh(records);
        self.store
            .save_snapshot(records)
            .context("Failed to save batch")?;
        Ok(report)
    }

    pub fn save_filters(&self) -> Result<()> {
        self.store
            .save_filters(self.engine.filter_state())
            .context("Failed to save filters")
    }

    /// Resolve a node by full id or unique id prefix (at least 4 chars)
    pub fn resolve_node(&self, reference: &str) -> Result<NodeKey> {
        if let Some(key) = self.engine.find_id(reference) {
            return Ok(key);
        }

        if reference.len() >= 4 {
            let matching: Vec<NodeKey> = self
                .engine
                .tree()
                .iter()
                .filter(|(_, node)| node.id.as_str().starts_with(reference))
                .map(|(key, _)| key)
                .collect();

            match matching.len() {
                1 => return Ok(matching[0]),
                0 => {}
                n => anyhow::bail!("Ambiguous node prefix '{}': matches {} nodes", reference, n),
            }
        }

        anyhow::bail!(
            "Unknown node '{}'. Use 'gview show --ids' to list node ids.",
            reference
        )
    }
}

/// Applies batches to the persisted workspace, one short session per batch
///
/// Each batch reopens the state, so expansion, acknowledgements and filters
/// changed by other commands in between are picked up.
pub struct WorkspaceTarget {
    workspace: Workspace,
}

impl WorkspaceTarget {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl BatchTarget for WorkspaceTarget {
    async fn apply(&self, records: &[Value]) -> Result<RefreshReport> {
        let mut session = self.workspace.open_session().await?;
        session.apply(records)
    }
}
