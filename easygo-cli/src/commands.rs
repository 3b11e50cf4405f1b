//! Command handlers: `reconcile`, `list` and `defaults`.

use comfy_table::{presets::UTF8_FULL, Table};
use easygo_fields::{
    massar_fields, DirectoryFieldStore, ExistingFieldRecord, ExtensionFieldSpec, FieldManifest,
    FieldReconciler, ReconcileError, ReconcileReport, ReportCounts,
};
use serde::Serialize;
use tracing::info;

use crate::cli::OutputFormat;
use crate::config::MigrationConfig;
use crate::error::CliError;

/// Built-in fields (when enabled) followed by each manifest, in order.
pub async fn collect_specs(config: &MigrationConfig) -> Result<Vec<ExtensionFieldSpec>, CliError> {
    let mut specs = if config.include_massar_defaults {
        massar_fields()
    } else {
        Vec::new()
    };

    for path in &config.manifests {
        let manifest = FieldManifest::load(path).await?;
        specs.extend(manifest.into_specs());
    }

    info!(fields = specs.len(), "collected field specs");
    Ok(specs)
}

pub async fn open_store(config: &MigrationConfig) -> Result<DirectoryFieldStore, CliError> {
    Ok(DirectoryFieldStore::open(&config.store_root)
        .with_registry(config.registry())
        .build()
        .await?)
}

/// Run (or plan) the reconciliation and print the report.
pub async fn run_reconcile(
    config: &MigrationConfig,
    dry_run: bool,
    format: OutputFormat,
) -> Result<ReconcileReport, CliError> {
    let specs = collect_specs(config).await?;
    let store = open_store(config).await?;
    let reconciler = FieldReconciler::new(&store);

    let report = if dry_run {
        reconciler.plan(&specs).await?
    } else {
        reconciler.reconcile(&specs).await?
    };

    println!("{}", render_report(&report, format)?);
    Ok(report)
}

pub async fn run_list(
    config: &MigrationConfig,
    record_type: Option<&str>,
    format: OutputFormat,
) -> Result<(), CliError> {
    let store = open_store(config).await?;
    let records = store.list(record_type).await?;
    println!("{}", render_records(&records, format)?);
    Ok(())
}

pub fn run_defaults(format: OutputFormat) -> Result<(), CliError> {
    println!("{}", render_specs(&massar_fields(), format)?);
    Ok(())
}

/// Machine-readable report: the outcome lists plus their counts.
#[derive(Serialize)]
struct ReportOutput<'a> {
    report: &'a ReconcileReport,
    counts: ReportCounts,
}

pub fn render_report(report: &ReconcileReport, format: OutputFormat) -> Result<String, CliError> {
    let output = ReportOutput {
        report,
        counts: report.counts(),
    };
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&output)?),
        OutputFormat::Yaml => Ok(serde_yaml_ng::to_string(&output)?),
        OutputFormat::Table => {
            let created_label = if report.dry_run { "would create" } else { "created" };

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Outcome", "Record type", "Field", "Detail"]);
            for id in &report.created {
                table.add_row(vec![
                    created_label,
                    id.record_type.as_str(),
                    id.field_name.as_str(),
                    "",
                ]);
            }
            for id in &report.skipped {
                table.add_row(vec![
                    "skipped",
                    id.record_type.as_str(),
                    id.field_name.as_str(),
                    "already present",
                ]);
            }
            for failed in &report.failed {
                table.add_row(vec![
                    "failed",
                    failed.identity.record_type.as_str(),
                    failed.identity.field_name.as_str(),
                    failed.error.as_str(),
                ]);
            }

            let counts = report.counts();
            Ok(format!(
                "{table}\n\n{} {}, {} skipped, {} failed",
                counts.created, created_label, counts.skipped, counts.failed
            ))
        }
    }
}

/// Text printed on stderr when a command fails.
///
/// An aborted run also lists the fields it created before the store went away,
/// since those are now in the store and will be skipped next time.
pub fn render_error(err: &CliError) -> String {
    let mut out = format!("Error: {err}");
    if let CliError::Reconcile(ReconcileError::StoreUnavailable { created, .. }) = err {
        if !created.is_empty() {
            out.push_str("\nFields created before the store became unreachable:");
            for id in created {
                out.push_str(&format!("\n  {id}"));
            }
        }
    }
    out
}

pub fn render_records(
    records: &[ExistingFieldRecord],
    format: OutputFormat,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(records)?),
        OutputFormat::Yaml => Ok(serde_yaml_ng::to_string(records)?),
        OutputFormat::Table => {
            if records.is_empty() {
                return Ok("No custom fields found.".to_string());
            }
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Record type", "Field", "Label", "Kind", "Created"]);
            for r in records {
                table.add_row(vec![
                    r.record_type.clone(),
                    r.field_name.clone(),
                    r.label.clone(),
                    r.field_kind.clone(),
                    r.created_at.format("%Y-%m-%d %H:%M").to_string(),
                ]);
            }
            Ok(format!("{table}\n\n{} field(s)", records.len()))
        }
    }
}

pub fn render_specs(
    specs: &[ExtensionFieldSpec],
    format: OutputFormat,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Yaml => Ok(FieldManifest::from_specs(specs).to_yaml()?),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&FieldManifest::from_specs(specs))?),
        OutputFormat::Table => {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Record type", "Field", "Label", "Kind", "After"]);
            for s in specs {
                table.add_row(vec![
                    s.record_type.as_str(),
                    s.field_name.as_str(),
                    s.label.as_str(),
                    s.field_kind.as_str(),
                    s.insert_after.as_deref().unwrap_or(""),
                ]);
            }
            Ok(table.to_string())
        }
    }
}
