//! Core field types.
//!
//! An [`ExtensionFieldSpec`] is what a manifest asks for; an
//! [`ExistingFieldRecord`] is what the store already holds. Both are
//! addressed by the same [`FieldIdentity`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// `(record_type, field_name)`: the identity of an extension field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldIdentity {
    pub record_type: String,
    pub field_name: String,
}

impl FieldIdentity {
    pub fn new(record_type: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            field_name: field_name.into(),
        }
    }
}

impl fmt::Display for FieldIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.record_type, self.field_name)
    }
}

/// A field to attach to an existing record type.
///
/// `field_kind` stays a string here; the store's [`crate::SchemaRegistry`]
/// decides whether it names a real kind and whether `options` fit it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtensionFieldSpec {
    pub record_type: String,
    pub field_name: String,
    pub label: String,
    pub field_kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
    /// Layout position only, never part of identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub in_list_view: bool,
    #[serde(default)]
    pub in_standard_filter: bool,
}

impl ExtensionFieldSpec {
    pub fn new(
        record_type: impl Into<String>,
        field_name: impl Into<String>,
        label: impl Into<String>,
        field_kind: impl Into<String>,
    ) -> Self {
        Self {
            record_type: record_type.into(),
            field_name: field_name.into(),
            label: label.into(),
            field_kind: field_kind.into(),
            options: None,
            insert_after: None,
            description: None,
            unique: false,
            in_list_view: false,
            in_standard_filter: false,
        }
    }

    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.options = Some(options.into());
        self
    }

    pub fn insert_after(mut self, field_name: impl Into<String>) -> Self {
        self.insert_after = Some(field_name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn in_list_view(mut self) -> Self {
        self.in_list_view = true;
        self
    }

    pub fn in_standard_filter(mut self) -> Self {
        self.in_standard_filter = true;
        self
    }

    pub fn identity(&self) -> FieldIdentity {
        FieldIdentity::new(&self.record_type, &self.field_name)
    }
}

/// A field as persisted by the store. Read-only to the reconciler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExistingFieldRecord {
    pub id: Ulid,
    pub record_type: String,
    pub field_name: String,
    pub label: String,
    pub field_kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub in_list_view: bool,
    #[serde(default)]
    pub in_standard_filter: bool,
    pub created_at: DateTime<Utc>,
}

impl ExistingFieldRecord {
    /// Materialize a spec with a fresh id and the current time.
    pub fn from_spec(spec: &ExtensionFieldSpec) -> Self {
        Self {
            id: Ulid::new(),
            record_type: spec.record_type.clone(),
            field_name: spec.field_name.clone(),
            label: spec.label.clone(),
            field_kind: spec.field_kind.clone(),
            options: spec.options.clone(),
            insert_after: spec.insert_after.clone(),
            description: spec.description.clone(),
            unique: spec.unique,
            in_list_view: spec.in_list_view,
            in_standard_filter: spec.in_standard_filter,
            created_at: Utc::now(),
        }
    }

    pub fn identity(&self) -> FieldIdentity {
        FieldIdentity::new(&self.record_type, &self.field_name)
    }
}
