//! CLI definition for the `easygo` administrative command.
//!
//! Only depends on `clap` and `std`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for command results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON on stdout
    Json,
    /// YAML on stdout
    Yaml,
}

/// EasyGo Schools administration
///
/// Installs the custom fields the school application needs on top of the
/// framework's record types. Run after the framework's own migration step.
#[derive(Parser, Debug)]
#[command(name = "easygo")]
#[command(version)]
#[command(about = "EasyGo Schools administration - custom field reconciliation")]
pub struct Cli {
    /// Enable debug output to stderr
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Configuration file (TOML or YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Site directory holding the field store (overrides configuration)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create every declared custom field that does not exist yet
    Reconcile {
        /// Additional field manifest (repeatable)
        #[arg(short, long = "manifest")]
        manifests: Vec<PathBuf>,
        /// Leave out the built-in MASSAR fields
        #[arg(long)]
        no_defaults: bool,
        /// Report what would be created without writing
        #[arg(long)]
        dry_run: bool,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// List custom fields present in the store
    List {
        /// Only show fields of this record type
        record_type: Option<String>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Print the built-in MASSAR field set as a manifest
    Defaults {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },
}
