//! Field manifests: YAML files declaring extension fields per record type.
//!
//! ```yaml
//! record_types:
//!   - record_type: Student
//!     fields:
//!       - field_name: massar_code
//!         label: Code MASSAR
//!         field_kind: Data
//!         insert_after: student_name
//!         unique: true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::error::ManifestError;
use crate::types::ExtensionFieldSpec;

/// One field inside a [`RecordTypeFields`] group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldEntry {
    pub field_name: String,
    pub label: String,
    pub field_kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub in_list_view: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub in_standard_filter: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl FieldEntry {
    fn into_spec(self, record_type: &str) -> ExtensionFieldSpec {
        ExtensionFieldSpec {
            record_type: record_type.to_string(),
            field_name: self.field_name,
            label: self.label,
            field_kind: self.field_kind,
            options: self.options,
            insert_after: self.insert_after,
            description: self.description,
            unique: self.unique,
            in_list_view: self.in_list_view,
            in_standard_filter: self.in_standard_filter,
        }
    }

    fn from_spec(spec: &ExtensionFieldSpec) -> Self {
        Self {
            field_name: spec.field_name.clone(),
            label: spec.label.clone(),
            field_kind: spec.field_kind.clone(),
            options: spec.options.clone(),
            insert_after: spec.insert_after.clone(),
            description: spec.description.clone(),
            unique: spec.unique,
            in_list_view: spec.in_list_view,
            in_standard_filter: spec.in_standard_filter,
        }
    }
}

/// Fields declared for one record type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordTypeFields {
    pub record_type: String,
    #[serde(default)]
    pub fields: Vec<FieldEntry>,
}

/// A whole manifest file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FieldManifest {
    #[serde(default)]
    pub record_types: Vec<RecordTypeFields>,
}

impl FieldManifest {
    /// Read and parse a manifest file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|source| ManifestError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let manifest = Self::from_yaml(&content)?;
        debug!(
            path = %path.display(),
            groups = manifest.record_types.len(),
            "loaded field manifest"
        );
        Ok(manifest)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ManifestError> {
        let manifest: FieldManifest = serde_yaml_ng::from_str(content)?;
        for group in &manifest.record_types {
            if group.record_type.trim().is_empty() {
                return Err(ManifestError::Invalid {
                    message: "record_type cannot be empty".into(),
                });
            }
        }
        Ok(manifest)
    }

    /// Group specs by consecutive record type, preserving order.
    pub fn from_specs(specs: &[ExtensionFieldSpec]) -> Self {
        let mut record_types: Vec<RecordTypeFields> = Vec::new();
        for spec in specs {
            match record_types.last_mut() {
                Some(group) if group.record_type == spec.record_type => {
                    group.fields.push(FieldEntry::from_spec(spec));
                }
                _ => record_types.push(RecordTypeFields {
                    record_type: spec.record_type.clone(),
                    fields: vec![FieldEntry::from_spec(spec)],
                }),
            }
        }
        Self { record_types }
    }

    pub fn to_yaml(&self) -> Result<String, ManifestError> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Flatten into specs, group by group, in file order.
    pub fn into_specs(self) -> Vec<ExtensionFieldSpec> {
        self.record_types
            .into_iter()
            .flat_map(|group| {
                let record_type = group.record_type;
                group
                    .fields
                    .into_iter()
                    .map(move |entry| entry.into_spec(&record_type))
            })
            .collect()
    }
}
