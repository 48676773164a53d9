//! Sled-backed view state
//!
//! One database (`state/view.db`) holds four trees:
//! - `expanded` / `changed`: node id -> one-byte flag
//! - `snapshot`: the last successfully fetched batch
//! - `filters`: the active [`FilterState`]
//!
//! Every write is flushed before returning.

use anyhow::{Context, Result};
use gv_core::{FilterState, StateMap, StateStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sled::{Db, Tree};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

const SNAPSHOT_KEY: &[u8] = b"last";
const FILTERS_KEY: &[u8] = b"active";

/// The last fetched batch, replayed as the first population on startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub saved_at_ms: u64,
    pub records: Vec<Value>,
}

/// Persistent store shared between the engine and the CLI
///
/// Clones share the same database handle.
#[derive(Clone)]
pub struct SledStateStore {
    db: Db,
    expanded: Tree,
    changed: Tree,
    snapshot: Tree,
    filters: Tree,
}

impl SledStateStore {
    /// Open or create the database under `state_dir`
    pub fn open(state_dir: &Path) -> Result<Self> {
        let path = state_dir.join("view.db");
        // No background flusher: every write flushes, and the file is free
        // as soon as the last handle drops.
        let db = sled::Config::new()
            .path(&path)
            .flush_every_ms(None)
            .open()
            .with_context(|| format!("Failed to open state database at {}", path.display()))?;
        Ok(Self {
            expanded: db.open_tree("expanded")?,
            changed: db.open_tree("changed")?,
            snapshot: db.open_tree("snapshot")?,
            filters: db.open_tree("filters")?,
            db,
        })
    }

    fn tree(&self, map: StateMap) -> &Tree {
        match map {
            StateMap::Expanded => &self.expanded,
            StateMap::Changed => &self.changed,
        }
    }

    /// Persist the batch that produced the current tree
    pub fn save_snapshot(&self, records: &[Value]) -> Result<()> {
        let snapshot = Snapshot {
            saved_at_ms: current_timestamp_ms(),
            records: records.to_vec(),
        };
        let bytes = serde_json::to_vec(&snapshot).context("Failed to serialize snapshot")?;
        self.snapshot.insert(SNAPSHOT_KEY, bytes)?;
        self.db.flush()?;
        debug!("Saved snapshot of {} records", records.len());
        Ok(())
    }

    pub fn load_snapshot(&self) -> Result<Option<Snapshot>> {
        match self.snapshot.get(SNAPSHOT_KEY)? {
            Some(bytes) => Ok(Some(
                serde_json::from_slice(&bytes).context("Corrupt snapshot entry")?,
            )),
            None => Ok(None),
        }
    }

    pub fn save_filters(&self, state: &FilterState) -> Result<()> {
        let bytes = serde_json::to_vec(state).context("Failed to serialize filters")?;
        self.filters.insert(FILTERS_KEY, bytes)?;
        self.db.flush()?;
        Ok(())
    }

    pub fn load_filters(&self) -> Result<Option<FilterState>> {
        match self.filters.get(FILTERS_KEY)? {
            Some(bytes) => Ok(Some(
                serde_json::from_slice(&bytes).context("Corrupt filter entry")?,
            )),
            None => Ok(None),
        }
    }

    /// Number of entries in one flag map
    pub fn count(&self, map: StateMap) -> usize {
        self.tree(map).len()
    }

    /// Drop every flag, the snapshot and the filters
    pub fn clear_all(&self) -> Result<()> {
        for tree in [&self.expanded, &self.changed, &self.snapshot, &self.filters] {
            tree.clear()?;
        }
        self.db.flush()?;
        Ok(())
    }
}

impl StateStore for SledStateStore {
    fn load(&self, map: StateMap) -> Result<BTreeMap<String, bool>> {
        let mut entries = BTreeMap::new();
        for item in self.tree(map).iter() {
            let (key, value) = item?;
            let id = String::from_utf8(key.to_vec())
                .with_context(|| format!("Non-UTF-8 id in {} map", map.as_str()))?;
            entries.insert(id, value.first().copied() == Some(1));
        }
        Ok(entries)
    }

    fn put(&mut self, map: StateMap, id: &str, value: bool) -> Result<()> {
        self.tree(map).insert(id.as_bytes(), vec![u8::from(value)])?;
        self.db.flush()?;
        Ok(())
    }

    fn remove(&mut self, map: StateMap, ids: &[&str]) -> Result<()> {
        let mut batch = sled::Batch::default();
        for id in ids {
            batch.remove(id.as_bytes());
        }
        self.tree(map).apply_batch(batch)?;
        self.db.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for SledStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStateStore")
            .field("expanded", &self.expanded.len())
            .field("changed", &self.changed.len())
            .finish_non_exhaustive()
    }
}

fn current_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
