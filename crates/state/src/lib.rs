//! Persistent view state for gview
//!
//! This crate provides:
//! - The `.gview/` directory layout and atomic file writes
//! - A sled-backed [`gv_core::StateStore`] for expansion and change flags
//! - Storage for the last fetched batch and the active filters

pub mod layout;
pub mod store;

// Re-exports
pub use layout::{atomic_write, StateDir};
pub use store::{SledStateStore, Snapshot};

/// Result type for state operations
pub type Result<T> = anyhow::Result<T>;
