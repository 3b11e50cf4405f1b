//! In-process field store.

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use tracing::trace;

use crate::error::StoreError;
use crate::registry::SchemaRegistry;
use crate::store::FieldStore;
use crate::types::{ExistingFieldRecord, ExtensionFieldSpec, FieldIdentity};

/// A [`FieldStore`] kept entirely in memory, in insertion order.
///
/// Used for dry runs and tests. Validation goes through the same
/// [`SchemaRegistry`] rules as the directory store.
pub struct MemoryFieldStore {
    registry: SchemaRegistry,
    records: RwLock<IndexMap<FieldIdentity, ExistingFieldRecord>>,
}

impl MemoryFieldStore {
    pub fn new(registry: SchemaRegistry) -> Self {
        Self {
            registry,
            records: RwLock::new(IndexMap::new()),
        }
    }

    /// Seed records that already exist, bypassing validation.
    pub fn with_records(self, records: impl IntoIterator<Item = ExistingFieldRecord>) -> Self {
        let mut map = self.records.into_inner();
        for record in records {
            map.insert(record.identity(), record);
        }
        Self {
            registry: self.registry,
            records: RwLock::new(map),
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Snapshot of every record, in insertion order.
    pub async fn records(&self) -> Vec<ExistingFieldRecord> {
        self.records.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl FieldStore for MemoryFieldStore {
    async fn find(
        &self,
        identity: &FieldIdentity,
    ) -> Result<Option<ExistingFieldRecord>, StoreError> {
        Ok(self.records.read().await.get(identity).cloned())
    }

    async fn create(&self, spec: &ExtensionFieldSpec) -> Result<ExistingFieldRecord, StoreError> {
        self.registry.validate(spec)?;

        let identity = spec.identity();
        let mut records = self.records.write().await;
        if records.contains_key(&identity) {
            return Err(StoreError::AlreadyExists { identity });
        }
        let record = ExistingFieldRecord::from_spec(spec);
        records.insert(identity, record.clone());
        trace!(field = %record.identity(), "stored field in memory");
        Ok(record)
    }
}
