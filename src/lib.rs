// ABOUTME: Library root for stackup - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod backup;
pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod health;
pub mod migrate;
pub mod output;
pub mod readiness;
pub mod provision;
pub mod runtime;
pub mod types;
