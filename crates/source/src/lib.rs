//! Record sources for gview
//!
//! This crate provides:
//! - The [`RecordSource`] trait producing one batch of JSON records
//! - A shell-command source parsing JSON-lines output
//! - Cancellation of an in-flight query
//! - A periodic refresher that serializes refresh cycles against a
//!   [`BatchTarget`] (an in-memory engine or a persisted workspace)

pub mod command;
pub mod refresher;

pub use command::{CommandSource, DEFAULT_MAX_OUTPUT_BYTES};
pub use refresher::{BatchTarget, RefreshError, RefreshOutcome, Refresher};

use async_trait::async_trait;
use serde_json::Value;

/// Produces the full current batch of records
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Run the query to completion
    async fn query(&self) -> Result<Vec<Value>, SourceError>;

    /// Cancel an in-flight query; the pending `query` returns `Cancelled`
    fn kill(&self) {}
}

/// Query failures
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to start query `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The query wrote diagnostics
    #[error("{message} ({stderr})")]
    Stderr { message: String, stderr: String },

    #[error("Query exited with {}", describe_exit(.code))]
    ExitStatus { code: Option<i32> },

    #[error("Query output exceeded {limit} bytes")]
    OutputTooLarge { limit: usize },

    #[error("Query cancelled")]
    Cancelled,

    #[error("I/O error reading query output: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}
