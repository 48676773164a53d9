//! Schema-driven tree reconciliation
//!
//! This crate provides:
//! - Declarative grouping schemas (levels, fields, display formatting)
//! - Property-path resolution with array fan-out
//! - An arena tree with stable content-derived node ids
//! - Change detection via per-entity content hashes
//! - Term and changed-only filtering with ancestor/descendant propagation
//! - Write-through view state (expansion and change flags)

pub mod engine;
pub mod error;
pub mod filter;
pub mod hash;
pub mod item;
pub mod path;
pub mod schema;
pub mod template;
pub mod tree;
pub mod view_state;

// Re-exports
pub use engine::{ChangePolicy, EngineOptions, RefreshReport, TreeEngine};
pub use error::{FilterError, SchemaError};
pub use filter::{FilterSet, FilterState, FilterTerm};
pub use hash::{content_hash, ContentHash, NodeId};
pub use item::{Collapsible, RootsView, TreeItem};
pub use path::PropertyPath;
pub use schema::{CompiledSchema, FieldEntry, FieldSpec, FormatterRegistry, IconSpec, LevelSpec, Schema};
pub use tree::{Node, NodeKey, Tree};
pub use view_state::{MemoryStateStore, StateMap, StateStore, ViewState};
