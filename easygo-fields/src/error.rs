//! Error types for field reconciliation

use std::path::PathBuf;
use thiserror::Error;

use crate::types::FieldIdentity;

/// How serious an error is for the run that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Noted but the operation counts as successful (e.g. a field that already exists)
    Warning,

    /// One item could not be applied; the rest of the batch continues
    Error,

    /// The run cannot continue
    Critical,
}

/// Classifies an error by [`ErrorSeverity`].
pub trait Severity {
    fn severity(&self) -> ErrorSeverity;
}

/// Errors returned by a [`crate::FieldStore`] implementation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// A field with this identity appeared between `find` and `create`
    #[error("field already exists: {identity}")]
    AlreadyExists { identity: FieldIdentity },

    /// The store rejected the shape of the spec
    #[error("invalid field {identity}: {reason}")]
    InvalidSpec {
        identity: FieldIdentity,
        reason: String,
    },

    /// A store-side failure scoped to a single field
    #[error("store error: {message}")]
    Backend { message: String },

    /// The store cannot be reached at all
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },

    /// The store cannot be opened with the given schema registry
    #[error("invalid schema registry: {reason}")]
    InvalidRegistry { reason: String },
}

impl StoreError {
    pub fn invalid(identity: &FieldIdentity, reason: impl Into<String>) -> Self {
        Self::InvalidSpec {
            identity: identity.clone(),
            reason: reason.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// True when the whole batch has to stop.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

impl Severity for StoreError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            StoreError::AlreadyExists { .. } => ErrorSeverity::Warning,
            StoreError::InvalidSpec { .. } => ErrorSeverity::Error,
            StoreError::Backend { .. } => ErrorSeverity::Error,
            StoreError::Unavailable { .. } => ErrorSeverity::Critical,
            StoreError::InvalidRegistry { .. } => ErrorSeverity::Critical,
        }
    }
}

/// Errors that abort a reconciliation run.
///
/// Two kinds escape a run: the store becoming unreachable, and a batch that
/// breaks the input invariant of one spec per identity (checked before any
/// store call). Per-field failures never show up here; they are collected in
/// the [`crate::ReconcileReport`].
#[derive(Debug, Error, PartialEq)]
pub enum ReconcileError {
    /// The store could not be reached; specs after this point were not processed
    #[error("store unavailable: {reason}")]
    StoreUnavailable {
        reason: String,
        /// Fields created before the store went away
        created: Vec<FieldIdentity>,
    },

    /// Two specs in the same batch share an identity
    #[error("duplicate field in batch: {identity}")]
    DuplicateSpec { identity: FieldIdentity },
}

impl Severity for ReconcileError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            ReconcileError::StoreUnavailable { .. } => ErrorSeverity::Critical,
            ReconcileError::DuplicateSpec { .. } => ErrorSeverity::Error,
        }
    }
}

/// Result type for reconciliation runs
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Errors raised while loading a field manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("invalid manifest: {message}")]
    Invalid { message: String },
}

impl Severity for ManifestError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Critical
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::AlreadyExists {
            identity: FieldIdentity::new("Student", "massar_code"),
        };
        assert_eq!(err.to_string(), "field already exists: Student.massar_code");
    }

    #[test]
    fn test_invalid_spec_display() {
        let err = StoreError::invalid(
            &FieldIdentity::new("Student", "cne"),
            "unknown field kind 'Blob'",
        );
        assert!(err.to_string().contains("Student.cne"));
        assert!(err.to_string().contains("unknown field kind"));
    }

    #[test]
    fn test_severity_levels() {
        let id = FieldIdentity::new("Employee", "ppr_number");
        assert_eq!(
            StoreError::AlreadyExists {
                identity: id.clone()
            }
            .severity(),
            ErrorSeverity::Warning
        );
        assert_eq!(StoreError::invalid(&id, "x").severity(), ErrorSeverity::Error);
        assert_eq!(StoreError::backend("disk full").severity(), ErrorSeverity::Error);
        assert_eq!(
            StoreError::unavailable("offline").severity(),
            ErrorSeverity::Critical
        );
        assert_eq!(
            ReconcileError::StoreUnavailable {
                reason: "offline".into(),
                created: vec![],
            }
            .severity(),
            ErrorSeverity::Critical
        );
    }

    #[test]
    fn invalid_registry_is_critical() {
        let err = StoreError::InvalidRegistry {
            reason: "clash".into(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(!err.is_unavailable());
    }

    #[test]
    fn only_unavailable_is_fatal() {
        assert!(StoreError::unavailable("gone").is_unavailable());
        assert!(!StoreError::backend("flaky").is_unavailable());
    }
}
