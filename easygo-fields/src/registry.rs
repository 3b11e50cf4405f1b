//! Schema registry: the store-side authority on record types and field kinds.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::types::ExtensionFieldSpec;

/// Field kinds understood by the host framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Data,
    Text,
    #[serde(rename = "Small Text")]
    SmallText,
    #[serde(rename = "Long Text")]
    LongText,
    Select,
    Link,
    Table,
    Date,
    Datetime,
    Time,
    Int,
    Float,
    Currency,
    Check,
    Attach,
}

impl FieldKind {
    pub const ALL: [FieldKind; 15] = [
        FieldKind::Data,
        FieldKind::Text,
        FieldKind::SmallText,
        FieldKind::LongText,
        FieldKind::Select,
        FieldKind::Link,
        FieldKind::Table,
        FieldKind::Date,
        FieldKind::Datetime,
        FieldKind::Time,
        FieldKind::Int,
        FieldKind::Float,
        FieldKind::Currency,
        FieldKind::Check,
        FieldKind::Attach,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Data => "Data",
            FieldKind::Text => "Text",
            FieldKind::SmallText => "Small Text",
            FieldKind::LongText => "Long Text",
            FieldKind::Select => "Select",
            FieldKind::Link => "Link",
            FieldKind::Table => "Table",
            FieldKind::Date => "Date",
            FieldKind::Datetime => "Datetime",
            FieldKind::Time => "Time",
            FieldKind::Int => "Int",
            FieldKind::Float => "Float",
            FieldKind::Currency => "Currency",
            FieldKind::Check => "Check",
            FieldKind::Attach => "Attach",
        }
    }

    /// Kinds whose `options` name another record type.
    pub fn is_reference(&self) -> bool {
        matches!(self, FieldKind::Link | FieldKind::Table)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldKind::ALL
            .iter()
            .find(|k| k.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown field kind '{s}'"))
    }
}

/// Validators a `Data` field may carry in its options.
const DATA_OPTIONS: [&str; 4] = ["Email", "Phone", "URL", "Name"];

/// Record types the store knows about, plus the kind/options rules applied
/// when a field is created.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaRegistry {
    record_types: BTreeSet<String>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record type.
    pub fn with_record_type(mut self, name: impl Into<String>) -> Self {
        self.record_types.insert(name.into());
        self
    }

    pub fn with_record_types<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.record_types.extend(names.into_iter().map(Into::into));
        self
    }

    /// Record types shipped with the school application.
    pub fn school_defaults() -> Self {
        Self::new().with_record_types([
            "Academic Year",
            "Assessment",
            "Employee",
            "Fee Bill",
            "Fee Structure",
            "Grade",
            "Guardian",
            "Homework",
            "Program",
            "Report Card",
            "Room",
            "Salary Slip",
            "School Class",
            "Student",
            "Student Attendance",
            "Subject",
        ])
    }

    pub fn contains(&self, record_type: &str) -> bool {
        self.record_types.contains(record_type)
    }

    pub fn record_types(&self) -> impl Iterator<Item = &str> {
        self.record_types.iter().map(String::as_str)
    }

    /// Check a spec against the registry. Returns the parsed kind.
    pub fn validate(&self, spec: &ExtensionFieldSpec) -> Result<FieldKind, StoreError> {
        let identity = spec.identity();

        if !self.contains(&spec.record_type) {
            return Err(StoreError::invalid(
                &identity,
                format!("unknown record type '{}'", spec.record_type),
            ));
        }
        if !is_valid_field_name(&spec.field_name) {
            return Err(StoreError::invalid(&identity, "field name must match [a-z][a-z0-9_]*"));
        }
        if spec.label.trim().is_empty() {
            return Err(StoreError::invalid(&identity, "label cannot be empty"));
        }

        let kind: FieldKind = spec
            .field_kind
            .parse()
            .map_err(|reason: String| StoreError::invalid(&identity, reason))?;

        let options = spec
            .options
            .as_deref()
            .map(str::trim)
            .filter(|o| !o.is_empty());

        match (kind, options) {
            (FieldKind::Select, None) => Err(StoreError::invalid(
                &identity,
                "Select fields need at least one option",
            )),
            (FieldKind::Select, Some(opts)) => {
                if opts.lines().any(|line| !line.trim().is_empty()) {
                    Ok(kind)
                } else {
                    Err(StoreError::invalid(
                        &identity,
                        "Select fields need at least one option",
                    ))
                }
            }
            (k, None) if k.is_reference() => Err(StoreError::invalid(
                &identity,
                format!("{k} fields need the linked record type in options"),
            )),
            (k, Some(target)) if k.is_reference() => {
                if self.contains(target) {
                    Ok(kind)
                } else {
                    Err(StoreError::invalid(
                        &identity,
                        format!("{k} target '{target}' is not a known record type"),
                    ))
                }
            }
            (FieldKind::Data, Some(v)) if !DATA_OPTIONS.contains(&v) => Err(StoreError::invalid(
                &identity,
                format!("'{v}' is not a Data validator (expected one of Email, Phone, URL, Name)"),
            )),
            (FieldKind::Data, _) => Ok(kind),
            (k, Some(_)) => Err(StoreError::invalid(
                &identity,
                format!("{k} fields do not take options"),
            )),
            (_, None) => Ok(kind),
        }
    }
}

fn is_valid_field_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
