//! Tree engine: grouping, change detection and reconciliation
//!
//! Each [`TreeEngine::refresh`] runs one full cycle over a materialized batch:
//!
//! 1. mark every existing node for deletion
//! 2. walk each record through the schema levels, matching existing nodes by
//!    `(parent, type, value)` or creating new ones (clearing the mark)
//! 3. prune nodes still marked, bottom-up, and drop their view state
//! 4. re-sort children by label and recompute filter visibility
//!
//! The cycle needs `&mut self`, so two passes can never interleave on one
//! engine. Callers sharing an engine across tasks serialize access around it.

use crate::error::{FilterError, SchemaError};
use crate::filter::{FilterSet, FilterState};
use crate::hash::{content_hash, ContentHash, NodeId};
use crate::item::{Collapsible, RootsView, TreeItem};
use crate::path::{self, Context, PropertyPath, Resolved};
use crate::schema::{CompiledField, CompiledSchema};
use crate::tree::{Node, NodeKey, Tree};
use crate::view_state::{StateStore, ViewState};
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// When a node's `changed` flag is cleared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangePolicy {
    /// Only an explicit acknowledgment clears the flag
    #[default]
    Acknowledge,
    /// Also cleared when the entity's content hash is unchanged next cycle
    AutoClear,
}

/// Engine tuning
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Path of the field uniquely identifying an entity
    pub key_field: Option<String>,
    pub filter_case_sensitive: bool,
    pub change_policy: ChangePolicy,
    /// Expansion of branches without a persisted flag
    pub expand_by_default: bool,
}

/// Outcome of one refresh cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Entity keys whose content changed since the previous cycle
    pub changed: Vec<String>,
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    /// Records that were not JSON objects
    pub skipped: usize,
    /// The tree was empty before this cycle, so nothing was flagged
    pub first_population: bool,
    pub total_nodes: usize,
    /// Label of the change-tracking node of each changed entity
    pub labels: BTreeMap<String, String>,
}

impl RefreshReport {
    /// Display name for a changed entity, falling back to its key
    pub fn label_of<'a>(&'a self, key: &'a str) -> &'a str {
        self.labels.get(key).map(String::as_str).unwrap_or(key)
    }
}

/// Owns the tree, entity hashes, filters and view state
pub struct TreeEngine {
    schema: CompiledSchema,
    key_field: Option<PropertyPath>,
    options: EngineOptions,
    tree: Tree,
    hashes: AHashMap<String, ContentHash>,
    filters: FilterSet,
    view: ViewState,
}

impl TreeEngine {
    /// Build an engine, loading view state from `store`
    pub fn new(
        schema: CompiledSchema,
        options: EngineOptions,
        store: Box<dyn StateStore>,
    ) -> Result<Self, SchemaError> {
        let key_field = options
            .key_field
            .as_deref()
            .map(PropertyPath::parse)
            .transpose()?;

        Ok(Self {
            schema,
            key_field,
            filters: FilterSet::new(options.filter_case_sensitive),
            options,
            tree: Tree::new(),
            hashes: AHashMap::new(),
            view: ViewState::load(store),
        })
    }

    /// Reconcile the tree against a full batch of records
    pub fn refresh(&mut self, records: &[Value]) -> RefreshReport {
        let first_population = self.tree.is_empty();
        let mut report = RefreshReport {
            first_population,
            ..RefreshReport::default()
        };

        self.tree.mark_all();

        let mut hashes = AHashMap::with_capacity(records.len());
        let mut reported: AHashSet<String> = AHashSet::new();
        let auto_clear = self.options.change_policy == ChangePolicy::AutoClear;

        let mut builder = Builder {
            tree: &mut self.tree,
            view: &mut self.view,
            report: &mut report,
        };

        for (index, record) in records.iter().enumerate() {
            if !record.is_object() {
                builder.report.skipped += 1;
                debug!("Skipping record #{}: not a JSON object", index);
                continue;
            }

            let entity = self
                .key_field
                .as_ref()
                .and_then(|key| path::first_value(record, key))
                .map(path::value_key);

            let (changed, reverted) = match &entity {
                Some(key) => {
                    let hash = content_hash(record);
                    let previous = self.hashes.get(key).copied();
                    hashes.insert(key.clone(), hash);
                    let changed = !first_population && previous != Some(hash);
                    let reverted = !first_population && auto_clear && previous == Some(hash);
                    if changed && reported.insert(key.clone()) {
                        builder.report.changed.push(key.clone());
                    }
                    (changed, reverted)
                }
                None => (false, false),
            };

            builder.add_record(
                &self.schema,
                &RecordScope {
                    record,
                    entity: entity.as_deref(),
                    changed,
                    reverted,
                },
            );
        }

        let removed = self.tree.remove_marked();
        report.removed = removed.len();
        let stale: Vec<&str> = removed.iter().map(|n| n.id.as_str()).collect();
        self.view.forget(&stale);

        if first_population {
            let tree = &self.tree;
            self.view.retain(|id| tree.find_id(id).is_some());
        }

        self.hashes = hashes;
        self.tree.sort_by_label();
        self.filters.apply(&mut self.tree);
        report.total_nodes = self.tree.len();

        if !report.changed.is_empty() {
            for (_, node) in self.tree.iter().filter(|(_, n)| n.tracks_changes && n.changed) {
                for entity in node.entities.iter().filter(|e| reported.contains(e.as_str())) {
                    report
                        .labels
                        .entry(entity.clone())
                        .or_insert_with(|| node.label.clone());
                }
            }
        }

        info!(
            "Refresh: {} created, {} updated, {} removed, {} changed, {} skipped ({} nodes)",
            report.created,
            report.updated,
            report.removed,
            report.changed.len(),
            report.skipped,
            report.total_nodes
        );
        report
    }

    /// Drop the tree and entity hashes; the next refresh is a first population
    pub fn clear(&mut self) {
        self.tree.clear();
        self.hashes.clear();
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.tree.get(key)
    }

    pub fn roots(&self) -> &[NodeKey] {
        self.tree.roots()
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.tree.children(key)
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.tree.parent(key)
    }

    pub fn find_id(&self, id: &str) -> Option<NodeKey> {
        self.tree.find_id(id)
    }

    /// Roots that pass the active filters
    pub fn visible_roots(&self) -> RootsView {
        if self.tree.is_empty() {
            return RootsView::Empty;
        }
        let keys = self.visible(self.tree.roots());
        if keys.is_empty() {
            RootsView::AllHidden
        } else {
            RootsView::Nodes(keys)
        }
    }

    /// Children of `key` that pass the active filters
    pub fn visible_children(&self, key: NodeKey) -> Vec<NodeKey> {
        self.visible(self.tree.children(key))
    }

    fn visible(&self, keys: &[NodeKey]) -> Vec<NodeKey> {
        keys.iter()
            .copied()
            .filter(|k| self.tree.get(*k).is_some_and(|n| n.visible))
            .collect()
    }

    /// Presentation record for `key`
    pub fn tree_item(&self, key: NodeKey) -> Option<TreeItem> {
        let node = self.tree.get(key)?;
        let collapsible = if node.is_leaf() {
            Collapsible::None
        } else {
            match self
                .view
                .expanded(node.id.as_str())
                .unwrap_or(self.options.expand_by_default)
            {
                true => Collapsible::Expanded,
                false => Collapsible::Collapsed,
            }
        };
        Some(TreeItem {
            id: node.id.clone(),
            label: node.label.clone(),
            icon: node.icon.clone(),
            tooltip: node.tooltip.clone(),
            collapsible,
            has_context_menu: node.has_context_menu,
            changed: node.changed,
        })
    }

    /// Persist the expansion flag of a live node; false if `id` is unknown
    pub fn set_expanded(&mut self, id: &str, expanded: bool) -> bool {
        if self.tree.find_id(id).is_none() {
            return false;
        }
        self.view.set_expanded(id, expanded);
        true
    }

    /// Clear the changed flag on `key` and its descendants
    ///
    /// Returns how many flags were cleared.
    pub fn acknowledge(&mut self, key: NodeKey) -> usize {
        let mut targets = vec![key];
        targets.extend(self.tree.descendants(key));

        let mut cleared = 0;
        for target in targets {
            let Some(node) = self.tree.get_mut(target) else {
                continue;
            };
            if node.changed {
                node.changed = false;
                cleared += 1;
            }
            self.view.clear_changed(node.id.as_str());
        }
        if cleared > 0 {
            self.filters.apply(&mut self.tree);
        }
        cleared
    }

    /// [`acknowledge`](Self::acknowledge) by stable id
    pub fn acknowledge_id(&mut self, id: &str) -> Option<usize> {
        let key = self.tree.find_id(id)?;
        Some(self.acknowledge(key))
    }

    /// Nodes currently flagged changed, in tree order
    pub fn changed_nodes(&self) -> Vec<NodeKey> {
        let mut out = Vec::new();
        for &root in self.tree.roots() {
            for key in std::iter::once(root).chain(self.tree.descendants(root)) {
                if self.tree.get(key).is_some_and(|n| n.changed) {
                    out.push(key);
                }
            }
        }
        out
    }

    pub fn filter_state(&self) -> &FilterState {
        self.filters.state()
    }

    pub fn add_filter(&mut self, key: &str, pattern: &str) -> Result<(), FilterError> {
        self.filters.add(key, pattern)?;
        self.filters.apply(&mut self.tree);
        Ok(())
    }

    pub fn remove_filter(&mut self, key: &str) -> usize {
        let removed = self.filters.remove_key(key);
        self.filters.apply(&mut self.tree);
        removed
    }

    /// Drop every term filter
    pub fn clear_filters(&mut self) {
        self.filters.clear_terms();
        self.filters.apply(&mut self.tree);
    }

    pub fn set_changed_only(&mut self, changed_only: bool) {
        self.filters.set_changed_only(changed_only);
        self.filters.apply(&mut self.tree);
    }

    /// Replace the filter state (e.g. restored from storage)
    pub fn restore_filters(&mut self, state: FilterState) -> Result<(), FilterError> {
        self.filters.restore(state)?;
        self.filters.apply(&mut self.tree);
        Ok(())
    }
}

impl std::fmt::Debug for TreeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeEngine")
            .field("nodes", &self.tree.len())
            .field("entities", &self.hashes.len())
            .field("filters", self.filters.state())
            .field("view", &self.view)
            .finish_non_exhaustive()
    }
}

struct RecordScope<'r> {
    record: &'r Value,
    entity: Option<&'r str>,
    changed: bool,
    reverted: bool,
}

struct Produced<'s> {
    key: NodeKey,
    kind: &'s str,
    context: Context,
}

struct Builder<'e> {
    tree: &'e mut Tree,
    view: &'e mut ViewState,
    report: &'e mut RefreshReport,
}

impl Builder<'_> {
    /// Walk one record through every level of the schema
    fn add_record(&mut self, schema: &CompiledSchema, scope: &RecordScope<'_>) {
        let mut previous: Vec<Produced<'_>> = Vec::new();

        for (level, spec) in schema.levels().iter().enumerate() {
            let parents: SmallVec<[(Option<NodeKey>, Context); 4]> = match &spec.parent {
                None => smallvec::smallvec![(None, Context::new())],
                Some(parent) => previous
                    .iter()
                    .filter(|p| p.kind == parent.as_str())
                    .map(|p| (Some(p.key), p.context.clone()))
                    .collect(),
            };
            // no parent node for this record: nothing below it either
            if parents.is_empty() {
                break;
            }

            let mut produced = Vec::new();
            for (parent, context) in &parents {
                for field in &spec.fields {
                    for resolved in path::resolve_within(scope.record, &field.property, context) {
                        let key = self.find_or_create(level, *parent, field, scope, &resolved);
                        produced.push(Produced {
                            key,
                            kind: field.property.as_str(),
                            context: resolved.context,
                        });
                    }
                }
            }
            previous = produced;
        }
    }

    fn find_or_create(
        &mut self,
        level: usize,
        parent: Option<NodeKey>,
        field: &CompiledField,
        scope: &RecordScope<'_>,
        resolved: &Resolved<'_>,
    ) -> NodeKey {
        let kind = field.property.as_str();
        let value_key = path::value_key(resolved.value);
        let display = field.display(scope.record, resolved.value, &resolved.context);

        if let Some(key) = self.tree.find(parent, kind, &value_key) {
            if let Some(node) = self.tree.get_mut(key) {
                if node.marked_for_deletion {
                    node.marked_for_deletion = false;
                    self.report.updated += 1;
                }
                node.label = display.label;
                node.icon = display.icon;
                node.tooltip = display.tooltip;
                node.has_context_menu = field.has_context_menu;
                node.tracks_changes = field.tracks_changes;
                if let Some(entity) = scope.entity {
                    node.add_entity(entity);
                }
                if field.tracks_changes {
                    if scope.changed && !node.changed {
                        node.changed = true;
                        self.view.mark_changed(node.id.as_str());
                    } else if scope.reverted && node.changed {
                        node.changed = false;
                        self.view.clear_changed(node.id.as_str());
                    }
                }
            }
            return key;
        }

        let parent_id = parent.and_then(|p| self.tree.get(p)).map(|n| n.id.clone());
        let id = NodeId::derive(parent_id.as_ref(), kind, &value_key);

        let changed = if !field.tracks_changes {
            false
        } else if scope.changed {
            self.view.mark_changed(id.as_str());
            true
        } else if scope.reverted {
            self.view.clear_changed(id.as_str());
            false
        } else {
            self.view.is_changed(id.as_str())
        };

        let mut entities = SmallVec::new();
        if let Some(entity) = scope.entity {
            entities.push(entity.to_string());
        }

        self.report.created += 1;
        self.tree.insert(Node {
            kind: kind.to_string(),
            value: resolved.value.clone(),
            value_key,
            label: display.label,
            icon: display.icon,
            tooltip: display.tooltip,
            id,
            level,
            parent,
            children: SmallVec::new(),
            changed,
            tracks_changes: field.tracks_changes,
            has_context_menu: field.has_context_menu,
            entities,
            visible: true,
            marked_for_deletion: false,
        })
    }
}
