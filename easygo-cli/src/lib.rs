//! `easygo` - administrative command for EasyGo Schools.
//!
//! Installs the custom fields the school application adds to the framework's
//! record types. Safe to run after every framework migration: fields that
//! already exist are left alone.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Error (configuration, manifest, store unreachable)
//! - 2: Completed, but some fields could not be created

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::{ConfigError, MigrationConfig};
pub use error::CliError;

/// Exit code when the run completed with per-field failures.
pub const PARTIAL_FAILURE_EXIT_CODE: i32 = 2;
