//! Integration tests for gview
//!
//! End-to-end runs of the built binary against a file-backed query.

// Test modules
#[macro_use]
mod common;
mod workflows;
