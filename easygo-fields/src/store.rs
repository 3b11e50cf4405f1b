//! The boundary between the reconciler and whatever persists fields.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::{ExistingFieldRecord, ExtensionFieldSpec, FieldIdentity};

/// A record store that can look up and create extension fields.
///
/// Implementations must make each `create` atomic with respect to identity:
/// if a field with the same identity already exists when the write lands,
/// return [`StoreError::AlreadyExists`] instead of overwriting it.
/// Return [`StoreError::Unavailable`] only when the store as a whole cannot be
/// reached; anything scoped to one field should be `InvalidSpec` or `Backend`.
#[async_trait]
pub trait FieldStore: Send + Sync {
    /// Look up a persisted field by identity.
    async fn find(
        &self,
        identity: &FieldIdentity,
    ) -> Result<Option<ExistingFieldRecord>, StoreError>;

    /// Persist a new field built from `spec`.
    async fn create(&self, spec: &ExtensionFieldSpec) -> Result<ExistingFieldRecord, StoreError>;
}

#[async_trait]
impl<S: FieldStore + ?Sized> FieldStore for &S {
    async fn find(
        &self,
        identity: &FieldIdentity,
    ) -> Result<Option<ExistingFieldRecord>, StoreError> {
        (**self).find(identity).await
    }

    async fn create(&self, spec: &ExtensionFieldSpec) -> Result<ExistingFieldRecord, StoreError> {
        (**self).create(spec).await
    }
}
