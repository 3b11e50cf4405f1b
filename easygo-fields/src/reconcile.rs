//! Field reconciliation: converge a store's extension fields to a declared list.
//!
//! Every spec ends in exactly one of three buckets:
//!
//! - **created**: not in the store, written now
//! - **skipped**: already in the store (attributes are not compared)
//! - **failed**: the store refused it; the error is kept and the batch goes on
//!
//! Only [`StoreError::Unavailable`] stops a run early. A batch that names the
//! same identity twice is refused before the store is touched.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{ReconcileError, Result, StoreError};
use crate::store::FieldStore;
use crate::types::{ExtensionFieldSpec, FieldIdentity};

/// A spec the store refused, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedField {
    pub identity: FieldIdentity,
    pub error: String,
}

/// Aggregate counts of a [`ReconcileReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportCounts {
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Outcome of one run, in input order within each bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    /// Set by [`FieldReconciler::plan`]; `created` then lists what *would* be created.
    pub dry_run: bool,
    pub created: Vec<FieldIdentity>,
    pub skipped: Vec<FieldIdentity>,
    pub failed: Vec<FailedField>,
}

impl ReconcileReport {
    pub fn counts(&self) -> ReportCounts {
        ReportCounts {
            created: self.created.len(),
            skipped: self.skipped.len(),
            failed: self.failed.len(),
        }
    }

    pub fn total(&self) -> usize {
        self.created.len() + self.skipped.len() + self.failed.len()
    }

    /// No spec failed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs specs against a [`FieldStore`], one at a time, in order.
pub struct FieldReconciler<S> {
    store: S,
}

impl<S: FieldStore> FieldReconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create every spec the store does not have yet.
    ///
    /// Safe to repeat: a second run with the same specs creates nothing.
    pub async fn reconcile(&self, specs: &[ExtensionFieldSpec]) -> Result<ReconcileReport> {
        self.run(specs, false).await
    }

    /// Classify specs without writing anything.
    pub async fn plan(&self, specs: &[ExtensionFieldSpec]) -> Result<ReconcileReport> {
        self.run(specs, true).await
    }

    async fn run(&self, specs: &[ExtensionFieldSpec], dry_run: bool) -> Result<ReconcileReport> {
        check_unique(specs)?;

        let mut report = ReconcileReport {
            dry_run,
            ..Default::default()
        };

        for spec in specs {
            let identity = spec.identity();

            match self.store.find(&identity).await {
                Ok(Some(_)) => {
                    debug!(field = %identity, "field already present, skipping");
                    report.skipped.push(identity);
                    continue;
                }
                Ok(None) => {}
                Err(e) if e.is_unavailable() => return Err(abort(e, report)),
                Err(e) => {
                    warn!(field = %identity, error = %e, "lookup failed");
                    report.failed.push(FailedField {
                        identity,
                        error: e.to_string(),
                    });
                    continue;
                }
            }

            if dry_run {
                debug!(field = %identity, "would create field");
                report.created.push(identity);
                continue;
            }

            match self.store.create(spec).await {
                Ok(record) => {
                    info!(field = %identity, id = %record.id, "created field");
                    report.created.push(identity);
                }
                Err(e) if e.is_unavailable() => return Err(abort(e, report)),
                Err(e) => {
                    warn!(field = %identity, error = %e, "could not create field");
                    report.failed.push(FailedField {
                        identity,
                        error: e.to_string(),
                    });
                }
            }
        }

        let counts = report.counts();
        info!(
            created = counts.created,
            skipped = counts.skipped,
            failed = counts.failed,
            dry_run,
            "field reconciliation finished"
        );
        Ok(report)
    }
}

fn check_unique(specs: &[ExtensionFieldSpec]) -> Result<()> {
    let mut seen = HashSet::with_capacity(specs.len());
    for spec in specs {
        let identity = spec.identity();
        if seen.contains(&identity) {
            return Err(ReconcileError::DuplicateSpec { identity });
        }
        seen.insert(identity);
    }
    Ok(())
}

fn abort(err: StoreError, report: ReconcileReport) -> ReconcileError {
    let reason = match err {
        StoreError::Unavailable { reason } => reason,
        other => other.to_string(),
    };
    error!(
        %reason,
        created = report.created.len(),
        "store unavailable, aborting reconciliation"
    );
    ReconcileError::StoreUnavailable {
        reason,
        created: report.created,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryFieldStore;
    use crate::registry::SchemaRegistry;
    use crate::types::ExistingFieldRecord;

    fn spec(record_type: &str, field_name: &str) -> ExtensionFieldSpec {
        ExtensionFieldSpec::new(record_type, field_name, field_name, "Data")
    }

    fn store() -> MemoryFieldStore {
        MemoryFieldStore::new(SchemaRegistry::school_defaults())
    }

    #[tokio::test]
    async fn empty_batch_is_a_clean_noop() {
        let store = store();
        let report = FieldReconciler::new(&store).reconcile(&[]).await.unwrap();
        assert_eq!(report, ReconcileReport::default());
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn duplicate_identity_rejected_before_any_write() {
        let store = store();
        let specs = vec![
            spec("Student", "cne"),
            spec("Student", "massar_code"),
            ExtensionFieldSpec::new("Student", "cne", "Other label", "Small Text"),
        ];
        let err = FieldReconciler::new(&store)
            .reconcile(&specs)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ReconcileError::DuplicateSpec {
                identity: FieldIdentity::new("Student", "cne")
            }
        );
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn same_field_name_on_different_record_types_is_fine() {
        let store = store();
        let specs = vec![spec("Student", "code"), spec("Employee", "code")];
        let report = FieldReconciler::new(&store).reconcile(&specs).await.unwrap();
        assert_eq!(report.counts().created, 2);
    }

    #[tokio::test]
    async fn plan_does_not_write() {
        let existing = ExistingFieldRecord::from_spec(&spec("Student", "cne"));
        let store = store().with_records([existing]);
        let specs = vec![spec("Student", "cne"), spec("Student", "massar_code")];

        let report = FieldReconciler::new(&store).plan(&specs).await.unwrap();

        assert!(report.dry_run);
        assert_eq!(report.created, vec![FieldIdentity::new("Student", "massar_code")]);
        assert_eq!(report.skipped, vec![FieldIdentity::new("Student", "cne")]);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn plan_does_not_validate() {
        // Validation belongs to the store's create; a plan only looks things up.
        let store = store();
        let specs = vec![ExtensionFieldSpec::new("Student", "x", "X", "Blob")];
        let report = FieldReconciler::new(&store).plan(&specs).await.unwrap();
        assert_eq!(report.counts().created, 1);
    }

    #[test]
    fn counts_and_total() {
        let report = ReconcileReport {
            dry_run: false,
            created: vec![FieldIdentity::new("Student", "a")],
            skipped: vec![
                FieldIdentity::new("Student", "b"),
                FieldIdentity::new("Student", "c"),
            ],
            failed: vec![FailedField {
                identity: FieldIdentity::new("Student", "d"),
                error: "boom".into(),
            }],
        };
        assert_eq!(
            report.counts(),
            ReportCounts {
                created: 1,
                skipped: 2,
                failed: 1
            }
        );
        assert_eq!(report.total(), 4);
        assert!(!report.is_clean());
    }

    #[test]
    fn report_serializes_to_json() {
        let report = ReconcileReport {
            dry_run: false,
            created: vec![FieldIdentity::new("Student", "cne")],
            skipped: vec![],
            failed: vec![],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["created"][0]["record_type"], "Student");
        assert_eq!(json["created"][0]["field_name"], "cne");
        assert_eq!(json["dry_run"], false);
    }
}
