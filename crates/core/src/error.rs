//! Error types for schema compilation and filtering
//!
//! Absence of a value or of a match is never an error here; only
//! configuration mistakes surface through these types.

use thiserror::Error;

/// Errors raised while compiling a [`Schema`](crate::schema::Schema)
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema has no levels")]
    NoLevels,

    #[error("level {level} has no field descriptors")]
    EmptyLevel { level: usize },

    #[error("property path is empty or has an empty segment: {path:?}")]
    InvalidPath { path: String },

    #[error("level 0 cannot declare a parent (found {parent:?})")]
    RootWithParent { parent: String },

    #[error("level {level} must declare a parent property")]
    MissingParent { level: usize },

    #[error("level {level} parent {parent:?} is not a property of level {}", .level - 1)]
    UnknownParent { level: usize, parent: String },

    #[error("level {level} declares property {property:?} twice")]
    DuplicateField { level: usize, property: String },

    #[error("unknown formatter {name:?} for property {property:?}")]
    UnknownFormatter { name: String, property: String },
}

/// Errors raised by the filter engine
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("filter key must not be empty")]
    EmptyKey,

    #[error("invalid filter pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
