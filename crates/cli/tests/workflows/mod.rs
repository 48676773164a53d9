//! Workflow integration tests
//!
//! Tests for complete workflows that exercise multiple commands
//! and validate end-to-end behavior.

pub mod change_lifecycle;
pub mod edge_cases;
pub mod filtering;
pub mod view_state;
pub mod watch;
