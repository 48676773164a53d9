//! CLI command implementations

pub mod clear;
pub mod config;
pub mod filter;
pub mod init;
pub mod node;
pub mod refresh;
pub mod show;
pub mod watch;
