//! Expansion and change flags keyed by stable node id
//!
//! Both maps are loaded once from a [`StateStore`] and written through on
//! every mutation. Store failures are logged and never roll back the
//! in-memory state.

use ahash::AHashMap;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Which persisted map an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateMap {
    Expanded,
    Changed,
}

impl StateMap {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Expanded => "expanded",
            Self::Changed => "changed",
        }
    }
}

/// Persistence collaborator for view state
pub trait StateStore: Send {
    /// Load one map in full
    fn load(&self, map: StateMap) -> anyhow::Result<BTreeMap<String, bool>>;

    /// Set one entry
    fn put(&mut self, map: StateMap, id: &str, value: bool) -> anyhow::Result<()>;

    /// Remove entries (unknown ids are ignored)
    fn remove(&mut self, map: StateMap, ids: &[&str]) -> anyhow::Result<()>;
}

/// In-memory store
///
/// Clones share the same maps, which lets tests inspect what the engine
/// persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<Mutex<MemoryMaps>>,
}

#[derive(Debug, Default)]
struct MemoryMaps {
    expanded: BTreeMap<String, bool>,
    changed: BTreeMap<String, bool>,
}

impl MemoryMaps {
    fn map_mut(&mut self, map: StateMap) -> &mut BTreeMap<String, bool> {
        match map {
            StateMap::Expanded => &mut self.expanded,
            StateMap::Changed => &mut self.changed,
        }
    }
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of one map's current contents
    pub fn snapshot(&self, map: StateMap) -> BTreeMap<String, bool> {
        self.inner.lock().map_mut(map).clone()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, map: StateMap) -> anyhow::Result<BTreeMap<String, bool>> {
        Ok(self.snapshot(map))
    }

    fn put(&mut self, map: StateMap, id: &str, value: bool) -> anyhow::Result<()> {
        self.inner.lock().map_mut(map).insert(id.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, map: StateMap, ids: &[&str]) -> anyhow::Result<()> {
        let mut inner = self.inner.lock();
        let target = inner.map_mut(map);
        for id in ids {
            target.remove(*id);
        }
        Ok(())
    }
}

/// In-memory view state backed by a store
pub struct ViewState {
    expanded: AHashMap<String, bool>,
    changed: AHashMap<String, bool>,
    store: Box<dyn StateStore>,
}

impl ViewState {
    /// Load both maps from `store`; a failed load starts empty
    pub fn load(store: Box<dyn StateStore>) -> Self {
        let load = |map: StateMap| -> AHashMap<String, bool> {
            match store.load(map) {
                Ok(entries) => entries.into_iter().collect(),
                Err(e) => {
                    warn!("Failed to load {} state, starting empty: {:#}", map.as_str(), e);
                    AHashMap::new()
                }
            }
        };
        let expanded = load(StateMap::Expanded);
        let changed = load(StateMap::Changed);
        Self {
            expanded,
            changed,
            store,
        }
    }

    /// Persisted expansion flag, if any
    pub fn expanded(&self, id: &str) -> Option<bool> {
        self.expanded.get(id).copied()
    }

    pub fn set_expanded(&mut self, id: &str, expanded: bool) {
        self.expanded.insert(id.to_string(), expanded);
        if let Err(e) = self.store.put(StateMap::Expanded, id, expanded) {
            warn!("Failed to persist expansion state for {}: {:#}", id, e);
        }
    }

    pub fn is_changed(&self, id: &str) -> bool {
        self.changed.get(id).copied().unwrap_or(false)
    }

    pub fn mark_changed(&mut self, id: &str) {
        if self.changed.insert(id.to_string(), true) == Some(true) {
            return;
        }
        if let Err(e) = self.store.put(StateMap::Changed, id, true) {
            warn!("Failed to persist changed flag for {}: {:#}", id, e);
        }
    }

    /// Drop the changed entry for `id`
    pub fn clear_changed(&mut self, id: &str) {
        if self.changed.remove(id).is_none() {
            return;
        }
        if let Err(e) = self.store.remove(StateMap::Changed, &[id]) {
            warn!("Failed to persist changed flag removal for {}: {:#}", id, e);
        }
    }

    /// Remove both entries for ids of nodes that no longer exist
    pub fn forget(&mut self, ids: &[&str]) {
        if ids.is_empty() {
            return;
        }
        let stale_expanded: Vec<&str> = ids
            .iter()
            .copied()
            .filter(|id| self.expanded.remove(*id).is_some())
            .collect();
        let stale_changed: Vec<&str> = ids
            .iter()
            .copied()
            .filter(|id| self.changed.remove(*id).is_some())
            .collect();

        for (map, stale) in [
            (StateMap::Expanded, stale_expanded),
            (StateMap::Changed, stale_changed),
        ] {
            if stale.is_empty() {
                continue;
            }
            if let Err(e) = self.store.remove(map, &stale) {
                warn!("Failed to prune {} {} entries: {:#}", stale.len(), map.as_str(), e);
            }
        }
    }

    /// Keep only entries whose id satisfies `keep`, pruning the rest
    pub fn retain(&mut self, keep: impl Fn(&str) -> bool) {
        let stale: Vec<String> = self
            .expanded
            .keys()
            .chain(self.changed.keys())
            .filter(|id| !keep(id.as_str()))
            .cloned()
            .collect();
        if stale.is_empty() {
            return;
        }
        debug!("Pruning view state for {} unknown node ids", stale.len());
        let ids: Vec<&str> = stale.iter().map(String::as_str).collect();
        self.forget(&ids);
    }

    pub fn expanded_len(&self) -> usize {
        self.expanded.len()
    }

    pub fn changed_len(&self) -> usize {
        self.changed.len()
    }
}

impl std::fmt::Debug for ViewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewState")
            .field("expanded", &self.expanded.len())
            .field("changed", &self.changed.len())
            .finish_non_exhaustive()
    }
}
