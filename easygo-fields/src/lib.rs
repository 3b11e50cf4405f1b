//! Declarative extension-field reconciler
//!
//! `easygo-fields` makes a record store's custom-field set converge to a
//! declared list of extension fields. It knows nothing about how the store
//! persists fields; consumers plug one in through the [`FieldStore`] trait.
//!
//! # Architecture
//!
//! - **Create-only**: existing fields are never updated or deleted, presence alone
//!   means "skip"
//! - **Per-item isolation**: a rejected field is reported and the batch continues
//! - **Fatal only when unreachable**: `StoreError::Unavailable` is the single store
//!   error that aborts a run; a batch repeating an identity is refused up front
//! - **Declarative input**: specs come from YAML manifests or the built-in MASSAR set
//!
//! ```rust,ignore
//! let store = DirectoryFieldStore::open("/srv/site")
//!     .with_registry(SchemaRegistry::school_defaults())
//!     .build()
//!     .await?;
//! let report = FieldReconciler::new(&store).reconcile(&massar_fields()).await?;
//! assert!(report.is_clean());
//! ```

pub mod defaults;
pub mod directory;
pub mod error;
pub mod manifest;
pub mod memory;
pub mod reconcile;
pub mod registry;
pub mod store;
pub mod types;

pub use defaults::massar_fields;
pub use directory::{DirectoryFieldStore, DirectoryFieldStoreBuilder};
pub use error::{ErrorSeverity, ManifestError, ReconcileError, Severity, StoreError};
pub use manifest::{FieldEntry, FieldManifest, RecordTypeFields};
pub use memory::MemoryFieldStore;
pub use reconcile::{FailedField, FieldReconciler, ReconcileReport, ReportCounts};
pub use registry::{FieldKind, SchemaRegistry};
pub use store::FieldStore;
pub use types::{ExistingFieldRecord, ExtensionFieldSpec, FieldIdentity};
