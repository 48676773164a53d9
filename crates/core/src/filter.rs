//! Filter engine: term predicates and the changed-only toggle
//!
//! Visibility combines two axes with logical AND:
//! - term filters `(key, pattern)`: a node matches when its kind equals the
//!   key (case-insensitive) and its raw value matches the regex. Matching a
//!   node makes its entities, its descendants and its ancestors visible.
//! - changed-only: nodes that track changes must be flagged changed. Nodes
//!   without change tracking are exempt, except below a tracked node that
//!   failed the toggle, whose whole subtree is hidden.
//!
//! A branch with no visible children is hidden unless it is itself a hit.

use crate::error::FilterError;
use crate::tree::{NodeKey, Tree};
use ahash::{AHashMap, AHashSet};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// One `(key, pattern)` predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterTerm {
    pub key: String,
    pub pattern: String,
}

/// Serializable filter state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    #[serde(default)]
    pub terms: Vec<FilterTerm>,
    #[serde(default)]
    pub changed_only: bool,
}

impl FilterState {
    pub fn is_active(&self) -> bool {
        !self.terms.is_empty() || self.changed_only
    }
}

#[derive(Debug, Clone)]
struct CompiledTerm {
    key: String,
    regex: Regex,
}

/// Active filters with compiled patterns
#[derive(Debug, Clone)]
pub struct FilterSet {
    state: FilterState,
    compiled: Vec<CompiledTerm>,
    case_sensitive: bool,
}

impl FilterSet {
    /// Empty filter set; patterns are case-insensitive unless `case_sensitive`
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            state: FilterState::default(),
            compiled: Vec::new(),
            case_sensitive,
        }
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Add a predicate; an identical predicate is not added twice
    pub fn add(&mut self, key: &str, pattern: &str) -> Result<(), FilterError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(FilterError::EmptyKey);
        }
        let term = FilterTerm {
            key: key.to_string(),
            pattern: pattern.to_string(),
        };
        if self.state.terms.contains(&term) {
            return Ok(());
        }
        self.compiled.push(self.compile(&term)?);
        self.state.terms.push(term);
        Ok(())
    }

    /// Remove every predicate for `key`; returns how many were removed
    pub fn remove_key(&mut self, key: &str) -> usize {
        let before = self.state.terms.len();
        let folded = key.trim().to_lowercase();
        self.state.terms.retain(|t| t.key.to_lowercase() != folded);
        self.compiled.retain(|t| t.key != folded);
        before - self.state.terms.len()
    }

    /// Drop all predicates (the changed-only toggle is kept)
    pub fn clear_terms(&mut self) {
        self.state.terms.clear();
        self.compiled.clear();
    }

    pub fn set_changed_only(&mut self, changed_only: bool) {
        self.state.changed_only = changed_only;
    }

    /// Replace the whole state, e.g. from persisted storage
    pub fn restore(&mut self, state: FilterState) -> Result<(), FilterError> {
        let compiled = state
            .terms
            .iter()
            .map(|t| self.compile(t))
            .collect::<Result<Vec<_>, _>>()?;
        self.compiled = compiled;
        self.state = state;
        Ok(())
    }

    fn compile(&self, term: &FilterTerm) -> Result<CompiledTerm, FilterError> {
        let regex = RegexBuilder::new(&term.pattern)
            .case_insensitive(!self.case_sensitive)
            .build()
            .map_err(|source| FilterError::InvalidPattern {
                pattern: term.pattern.clone(),
                source,
            })?;
        Ok(CompiledTerm {
            key: term.key.to_lowercase(),
            regex,
        })
    }

    /// Recompute `visible` for every node in `tree`
    pub fn apply(&self, tree: &mut Tree) {
        if !self.is_active() {
            let keys: Vec<NodeKey> = tree.iter().map(|(k, _)| k).collect();
            for key in keys {
                if let Some(node) = tree.get_mut(key) {
                    node.visible = true;
                }
            }
            return;
        }

        let pass = VisibilityPass::new(self, tree);
        let mut visibility = AHashMap::with_capacity(tree.len());
        for &root in tree.roots() {
            pass.eval(tree, root, Inherited::default(), &mut visibility);
        }
        for (key, visible) in visibility {
            if let Some(node) = tree.get_mut(key) {
                node.visible = visible;
            }
        }
    }

    fn matches(&self, kind: &str, value: &str) -> bool {
        let kind = kind.to_lowercase();
        self.compiled
            .iter()
            .any(|t| t.key == kind && t.regex.is_match(value))
    }
}

struct VisibilityPass<'a> {
    terms_active: bool,
    changed_only: bool,
    term_hits: AHashSet<NodeKey>,
    term_entities: AHashSet<&'a str>,
    changed_entities: AHashSet<&'a str>,
}

impl<'a> VisibilityPass<'a> {
    fn new(filters: &FilterSet, tree: &'a Tree) -> Self {
        let terms_active = !filters.compiled.is_empty();
        let mut term_hits = AHashSet::new();
        let mut term_entities = AHashSet::new();
        let mut changed_entities = AHashSet::new();

        for (key, node) in tree.iter() {
            if terms_active && filters.matches(&node.kind, &node.value_key) {
                term_hits.insert(key);
                term_entities.extend(node.entities.iter().map(String::as_str));
            }
            if node.tracks_changes && node.changed {
                changed_entities.extend(node.entities.iter().map(String::as_str));
            }
        }

        Self {
            terms_active,
            changed_only: filters.state.changed_only,
            term_hits,
            term_entities,
            changed_entities,
        }
    }

    /// Evaluate `key` and its subtree; returns whether `key` is visible
    fn eval(
        &self,
        tree: &Tree,
        key: NodeKey,
        inherited: Inherited,
        out: &mut AHashMap<NodeKey, bool>,
    ) -> bool {
        let Some(node) = tree.get(key) else {
            return false;
        };

        let term_hit = self.terms_active && self.term_hits.contains(&key);
        let changed_hit = self.changed_only && node.tracks_changes && node.changed;

        let term_ok = !self.terms_active
            || term_hit
            || inherited.term
            || node.entities.iter().any(|e| self.term_entities.contains(e.as_str()));
        let exempt = !node.tracks_changes && !inherited.suppressed;
        let changed_ok = !self.changed_only
            || changed_hit
            || inherited.changed
            || exempt
            || node
                .entities
                .iter()
                .any(|e| self.changed_entities.contains(e.as_str()));

        let below = Inherited {
            term: inherited.term || term_hit,
            changed: inherited.changed || changed_hit,
            suppressed: inherited.suppressed || (node.tracks_changes && !changed_ok),
        };
        let mut any_child = false;
        for &child in &node.children {
            any_child |= self.eval(tree, child, below, out);
        }

        let own = term_ok && changed_ok;
        let visible = if node.children.is_empty() {
            own
        } else {
            any_child || (own && (term_hit || changed_hit))
        };
        out.insert(key, visible);
        visible
    }
}

/// State carried from an ancestor down to its descendants
#[derive(Debug, Clone, Copy, Default)]
struct Inherited {
    /// An ancestor matched a term filter
    term: bool,
    /// An ancestor is a changed tracked node
    changed: bool,
    /// An ancestor tracks changes and is unchanged
    suppressed: bool,
}
