//! `easygo` command-line entry point.
//!
//! Commands:
//! - `easygo reconcile`: create missing MASSAR and manifest-declared fields
//! - `easygo list [record_type]`: show fields present in the store
//! - `easygo defaults`: print the built-in MASSAR fields as a manifest

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use easygo::commands;
use easygo::{Cli, CliError, Commands, MigrationConfig, PARTIAL_FAILURE_EXIT_CODE};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("easygo=debug,easygo_fields=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = dispatch_command(cli).await;
    std::process::exit(exit_code);
}

async fn dispatch_command(cli: Cli) -> i32 {
    match cli.command {
        Commands::Defaults { format } => result_to_exit(commands::run_defaults(format)),
        Commands::List {
            record_type,
            format,
        } => {
            let config = match load_config(cli.config.as_deref(), cli.store) {
                Ok(config) => config,
                Err(e) => return report_error(&e),
            };
            result_to_exit(commands::run_list(&config, record_type.as_deref(), format).await)
        }
        Commands::Reconcile {
            manifests,
            no_defaults,
            dry_run,
            format,
        } => {
            let mut config = match load_config(cli.config.as_deref(), cli.store) {
                Ok(config) => config,
                Err(e) => return report_error(&e),
            };
            config.manifests.extend(manifests);
            if no_defaults {
                config.include_massar_defaults = false;
            }

            match commands::run_reconcile(&config, dry_run, format).await {
                Ok(report) if report.is_clean() => 0,
                Ok(_) => PARTIAL_FAILURE_EXIT_CODE,
                Err(e) => report_error(&e),
            }
        }
    }
}

fn load_config(
    explicit: Option<&Path>,
    store: Option<PathBuf>,
) -> Result<MigrationConfig, CliError> {
    let mut config = MigrationConfig::load(explicit)?;
    if let Some(store) = store {
        config.store_root = store;
    }
    Ok(config)
}

/// Convert a `Result<(), CliError>` to an exit code.
fn result_to_exit(result: Result<(), CliError>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => report_error(&e),
    }
}

fn report_error(e: &CliError) -> i32 {
    tracing::error!("{}", e);
    eprintln!("{}", commands::render_error(e));
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use easygo::OutputFormat;

    #[test]
    fn test_cli_parsing_reconcile_defaults() {
        let cli = Cli::parse_from(["easygo", "reconcile"]);
        assert!(!cli.debug);
        assert!(matches!(
            cli.command,
            Commands::Reconcile {
                no_defaults: false,
                dry_run: false,
                format: OutputFormat::Table,
                ..
            }
        ));
    }

    #[test]
    fn test_cli_parsing_reconcile_flags() {
        let cli = Cli::parse_from([
            "easygo",
            "--debug",
            "--store",
            "/srv/site",
            "reconcile",
            "-m",
            "a.yaml",
            "--manifest",
            "b.yaml",
            "--no-defaults",
            "--dry-run",
            "--format",
            "json",
        ]);
        assert!(cli.debug);
        assert_eq!(cli.store.as_deref(), Some(Path::new("/srv/site")));
        match cli.command {
            Commands::Reconcile {
                manifests,
                no_defaults,
                dry_run,
                format,
            } => {
                assert_eq!(manifests.len(), 2);
                assert!(no_defaults);
                assert!(dry_run);
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parsing_list_record_type() {
        let cli = Cli::parse_from(["easygo", "list", "Student"]);
        assert!(matches!(
            cli.command,
            Commands::List { record_type: Some(ref rt), .. } if rt == "Student"
        ));
    }

    #[test]
    fn test_cli_parsing_defaults_is_yaml() {
        let cli = Cli::parse_from(["easygo", "defaults"]);
        assert!(matches!(
            cli.command,
            Commands::Defaults {
                format: OutputFormat::Yaml
            }
        ));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["easygo"]).is_err());
    }
}
