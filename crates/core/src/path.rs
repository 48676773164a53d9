//! Property path resolution against JSON records
//!
//! A path is a dotted list of object keys (`patchSets.approvals.value`).
//! Arrays met along the way fan out: every element is visited, and each
//! produced value remembers which element it was reached through. That
//! positional context lets a later lookup of a sibling field
//! (`patchSets.approvals.by.name`) pick the co-occurring element instead of
//! every element of the array.

use crate::error::SchemaError;
use serde_json::Value;
use smallvec::SmallVec;
use std::fmt;

/// A parsed, validated dotted property path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    raw: String,
    segments: SmallVec<[String; 4]>,
}

impl PropertyPath {
    /// Parse a dotted path, rejecting empty paths and empty segments
    pub fn parse(raw: &str) -> Result<Self, SchemaError> {
        let trimmed = raw.trim();
        let segments: SmallVec<[String; 4]> = trimmed.split('.').map(str::to_string).collect();
        if trimmed.is_empty() || segments.iter().any(|s| s.is_empty()) {
            return Err(SchemaError::InvalidPath {
                path: raw.to_string(),
            });
        }
        Ok(Self {
            raw: trimmed.to_string(),
            segments,
        })
    }

    /// The path as written (also used as the node "kind")
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Individual key segments
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    fn prefix(&self, len: usize) -> String {
        self.segments[..len].join(".")
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// One array element taken while resolving a path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArrayStep {
    /// Dotted prefix naming the array (empty for a top-level array)
    pub prefix: String,
    /// Element index within that array
    pub index: usize,
}

/// The array elements a value was reached through, outermost first
pub type Context = SmallVec<[ArrayStep; 2]>;

/// A value produced by path resolution
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<'a> {
    pub value: &'a Value,
    pub context: Context,
}

/// Resolve `path` against `record`, fanning out over every array
pub fn resolve<'a>(record: &'a Value, path: &PropertyPath) -> Vec<Resolved<'a>> {
    resolve_within(record, path, &[])
}

/// Resolve `path` against `record`, pinning arrays already named in `context`
///
/// An array whose prefix appears in `context` only yields the element at the
/// recorded index; other arrays fan out. Missing keys, nulls and scalars
/// with path left to walk produce no values.
pub fn resolve_within<'a>(
    record: &'a Value,
    path: &PropertyPath,
    context: &[ArrayStep],
) -> Vec<Resolved<'a>> {
    let mut out = Vec::new();
    walk(record, path, 0, context, Context::new(), &mut out);
    out
}

fn walk<'a>(
    value: &'a Value,
    path: &PropertyPath,
    depth: usize,
    pinned: &[ArrayStep],
    taken: Context,
    out: &mut Vec<Resolved<'a>>,
) {
    match value {
        Value::Array(items) => {
            let prefix = path.prefix(depth);
            if let Some(step) = pinned.iter().find(|s| s.prefix == prefix) {
                if let Some(item) = items.get(step.index) {
                    let mut taken = taken;
                    taken.push(step.clone());
                    walk(item, path, depth, pinned, taken, out);
                }
                return;
            }
            for (index, item) in items.iter().enumerate() {
                let mut taken = taken.clone();
                taken.push(ArrayStep {
                    prefix: prefix.clone(),
                    index,
                });
                walk(item, path, depth, pinned, taken, out);
            }
        }
        Value::Null => {}
        _ if depth == path.segments.len() => out.push(Resolved {
            value,
            context: taken,
        }),
        Value::Object(map) => {
            if let Some(child) = map.get(&path.segments[depth]) {
                walk(child, path, depth + 1, pinned, taken, out);
            }
        }
        _ => {}
    }
}

/// First value at `path`, ignoring fan-out beyond the first element
pub fn first_value<'a>(record: &'a Value, path: &PropertyPath) -> Option<&'a Value> {
    resolve(record, path).into_iter().next().map(|r| r.value)
}

/// Canonical string form of a resolved value
///
/// Strings are taken verbatim; everything else uses its JSON rendering.
/// This is the identity half of a node's `(type, value)` pair.
pub fn value_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
