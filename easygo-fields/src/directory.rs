//! Directory-backed field store: one YAML file per field under a site directory.
//!
//! ```text
//! <site>/
//!   custom_fields/
//!     student/
//!       massar_code.yaml
//!     school_class/
//!       massar_level_code.yaml
//! ```
//!
//! The site directory itself is owned by the deployment. If it is missing the
//! store is treated as unreachable rather than silently recreated.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};
use ulid::Ulid;

use crate::error::StoreError;
use crate::registry::SchemaRegistry;
use crate::store::FieldStore;
use crate::types::{ExistingFieldRecord, ExtensionFieldSpec, FieldIdentity};

const FIELDS_DIR: &str = "custom_fields";

/// Builder for [`DirectoryFieldStore`]. Created by [`DirectoryFieldStore::open`].
pub struct DirectoryFieldStoreBuilder {
    root: PathBuf,
    registry: Option<SchemaRegistry>,
}

impl DirectoryFieldStoreBuilder {
    /// Use a specific registry instead of [`SchemaRegistry::school_defaults`].
    pub fn with_registry(mut self, registry: SchemaRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Check the site directory and prepare `custom_fields/`.
    ///
    /// Fails with `InvalidRegistry` when two registered record types would
    /// share a directory.
    pub async fn build(self) -> Result<DirectoryFieldStore, StoreError> {
        let registry = self
            .registry
            .unwrap_or_else(SchemaRegistry::school_defaults);
        check_slugs(&registry)?;

        let root = self.root;
        ensure_site(&root).await?;

        let fields_dir = root.join(FIELDS_DIR);
        fs::create_dir_all(&fields_dir).await.map_err(|e| {
            StoreError::unavailable(format!("cannot prepare {}: {e}", fields_dir.display()))
        })?;

        debug!(root = %root.display(), "field store opened");

        Ok(DirectoryFieldStore { root, registry })
    }
}

/// A [`FieldStore`] backed by one YAML file per field.
///
/// `create` writes to a temp file and hard-links it into place, so a field
/// that appeared concurrently is reported as `AlreadyExists` and never
/// overwritten.
pub struct DirectoryFieldStore {
    root: PathBuf,
    registry: SchemaRegistry,
}

impl DirectoryFieldStore {
    /// Open an existing site directory.
    ///
    /// ```rust,ignore
    /// let store = DirectoryFieldStore::open("/srv/site")
    ///     .with_registry(SchemaRegistry::school_defaults())
    ///     .build()
    ///     .await?;
    /// ```
    pub fn open(root: impl Into<PathBuf>) -> DirectoryFieldStoreBuilder {
        DirectoryFieldStoreBuilder {
            root: root.into(),
            registry: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// All persisted fields, optionally restricted to one record type,
    /// sorted by record type then field name.
    pub async fn list(
        &self,
        record_type: Option<&str>,
    ) -> Result<Vec<ExistingFieldRecord>, StoreError> {
        ensure_site(&self.root).await?;

        let fields_dir = self.root.join(FIELDS_DIR);
        let type_dirs = match record_type {
            Some(rt) => vec![fields_dir.join(slug(rt))],
            None => read_subdirs(&fields_dir).await?,
        };

        let mut records = Vec::new();
        for dir in type_dirs {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(StoreError::backend(format!("{}: {e}", dir.display()))),
            };
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| StoreError::backend(e.to_string()))?
            {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                    continue;
                }
                match read_record(&path).await {
                    Ok(Some(record)) => records.push(record),
                    Ok(None) => {}
                    Err(e) => warn!(?path, %e, "skipping unreadable field record"),
                }
            }
        }

        if let Some(rt) = record_type {
            records.retain(|r| r.record_type == rt);
        }
        records.sort_by(|a, b| {
            (a.record_type.as_str(), a.field_name.as_str())
                .cmp(&(b.record_type.as_str(), b.field_name.as_str()))
        });
        Ok(records)
    }

    fn record_path(&self, identity: &FieldIdentity) -> PathBuf {
        self.root
            .join(FIELDS_DIR)
            .join(slug(&identity.record_type))
            .join(format!("{}.yaml", identity.field_name))
    }
}

#[async_trait]
impl FieldStore for DirectoryFieldStore {
    async fn find(
        &self,
        identity: &FieldIdentity,
    ) -> Result<Option<ExistingFieldRecord>, StoreError> {
        ensure_site(&self.root).await?;

        // Names that cannot be a file name cannot have been persisted.
        if !is_plain_file_name(&identity.field_name) {
            return Ok(None);
        }

        let path = self.record_path(identity);
        match read_record(&path).await? {
            Some(record) if record.identity() != *identity => Err(StoreError::backend(format!(
                "{} holds {} instead of {identity}",
                path.display(),
                record.identity()
            ))),
            found => Ok(found),
        }
    }

    async fn create(&self, spec: &ExtensionFieldSpec) -> Result<ExistingFieldRecord, StoreError> {
        self.registry.validate(spec)?;
        ensure_site(&self.root).await?;

        let identity = spec.identity();
        let path = self.record_path(&identity);
        let record = ExistingFieldRecord::from_spec(spec);
        let yaml = serde_yaml_ng::to_string(&record)
            .map_err(|e| StoreError::backend(format!("cannot encode {identity}: {e}")))?;

        create_exclusive(&path, yaml.as_bytes())
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => StoreError::AlreadyExists {
                    identity: identity.clone(),
                },
                _ => StoreError::backend(format!("cannot write {}: {e}", path.display())),
            })?;

        debug!(field = %identity, path = %path.display(), "persisted field");
        Ok(record)
    }
}

/// Lowercase directory name for a record type: "School Class" -> "school_class".
fn slug(record_type: &str) -> String {
    record_type
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Every registered record type must own its directory.
fn check_slugs(registry: &SchemaRegistry) -> Result<(), StoreError> {
    let mut owners: HashMap<String, &str> = HashMap::new();
    for record_type in registry.record_types() {
        if let Some(other) = owners.insert(slug(record_type), record_type) {
            return Err(StoreError::InvalidRegistry {
                reason: format!(
                    "record types '{other}' and '{record_type}' share the directory '{}'",
                    slug(record_type)
                ),
            });
        }
    }
    Ok(())
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.starts_with('.')
}

async fn ensure_site(root: &Path) -> Result<(), StoreError> {
    match fs::metadata(root).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(StoreError::unavailable(format!(
            "{} is not a directory",
            root.display()
        ))),
        Err(e) => Err(StoreError::unavailable(format!("{}: {e}", root.display()))),
    }
}

async fn read_subdirs(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let mut dirs = Vec::new();
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(dirs),
        Err(e) => return Err(StoreError::backend(format!("{}: {e}", dir.display()))),
    };
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| StoreError::backend(e.to_string()))?
    {
        let is_dir = entry
            .file_type()
            .await
            .map_err(|e| StoreError::backend(e.to_string()))?
            .is_dir();
        if is_dir {
            dirs.push(entry.path());
        }
    }
    Ok(dirs)
}

async fn read_record(path: &Path) -> Result<Option<ExistingFieldRecord>, StoreError> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::backend(format!("{}: {e}", path.display()))),
    };
    serde_yaml_ng::from_str(&content)
        .map(Some)
        .map_err(|e| StoreError::backend(format!("corrupt field record {}: {e}", path.display())))
}

/// Write to a temp file, then hard-link it to `path`. Fails with
/// `AlreadyExists` if `path` is already taken. The temp file is always removed.
async fn create_exclusive(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::new(ErrorKind::InvalidInput, "no parent dir"))?;
    fs::create_dir_all(dir).await?;

    let tmp = dir.join(format!(".tmp_{}", Ulid::new()));
    fs::write(&tmp, data).await?;
    let linked = fs::hard_link(&tmp, path).await;
    let _ = fs::remove_file(&tmp).await;
    linked
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open(tmp: &TempDir) -> DirectoryFieldStore {
        DirectoryFieldStore::open(tmp.path()).build().await.unwrap()
    }

    fn massar_code() -> ExtensionFieldSpec {
        ExtensionFieldSpec::new("Student", "massar_code", "Code MASSAR", "Data")
            .insert_after("student_name")
            .unique()
    }

    #[test]
    fn slug_lowercases_and_replaces_spaces() {
        assert_eq!(slug("School Class"), "school_class");
        assert_eq!(slug("Student"), "student");
    }

    #[tokio::test]
    async fn build_rejects_record_types_sharing_a_directory() {
        let tmp = TempDir::new().unwrap();
        let registry = SchemaRegistry::school_defaults().with_record_type("School-Class");

        let err = DirectoryFieldStore::open(tmp.path())
            .with_registry(registry)
            .build()
            .await
            .err()
            .unwrap();

        assert!(matches!(err, StoreError::InvalidRegistry { .. }));
        assert!(err.to_string().contains("School Class"));
        assert!(err.to_string().contains("School-Class"));
        assert!(err.to_string().contains("school_class"));
        assert!(!tmp.path().join("custom_fields").exists());
    }

    #[tokio::test]
    async fn find_reports_record_of_another_type_as_backend_error() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp).await;
        let foreign = ExistingFieldRecord::from_spec(&ExtensionFieldSpec::new(
            "School-Class",
            "code",
            "Code",
            "Data",
        ));
        let dir = tmp.path().join("custom_fields/school_class");
        std::fs::create_dir_all(&dir).unwrap();
        let yaml = serde_yaml_ng::to_string(&foreign).unwrap();
        std::fs::write(dir.join("code.yaml"), yaml).unwrap();

        let err = store
            .find(&FieldIdentity::new("School Class", "code"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend { .. }));
        assert!(err.to_string().contains("School-Class.code"));
    }

    #[tokio::test]
    async fn build_prepares_fields_dir() {
        let tmp = TempDir::new().unwrap();
        let _store = open(&tmp).await;
        assert!(tmp.path().join("custom_fields").is_dir());
    }

    #[tokio::test]
    async fn build_on_missing_site_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        let result = DirectoryFieldStore::open(tmp.path().join("missing"))
            .build()
            .await;
        assert!(matches!(result, Err(StoreError::Unavailable { .. })));
        assert!(!tmp.path().join("missing").exists());
    }

    #[tokio::test]
    async fn create_writes_yaml_file() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp).await;

        let record = store.create(&massar_code()).await.unwrap();

        let path = tmp.path().join("custom_fields/student/massar_code.yaml");
        assert!(path.exists());
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("field_name: massar_code"));
        assert!(content.contains(&record.id.to_string()));
    }

    #[tokio::test]
    async fn find_returns_persisted_record() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp).await;
        let created = store.create(&massar_code()).await.unwrap();

        let found = store.find(&massar_code().identity()).await.unwrap().unwrap();
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn find_missing_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp).await;
        let found = store
            .find(&FieldIdentity::new("Student", "cne"))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn find_rejects_path_like_names() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp).await;
        let found = store
            .find(&FieldIdentity::new("Student", "../../etc/passwd"))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn create_does_not_overwrite_existing_file() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp).await;
        let first = store.create(&massar_code()).await.unwrap();

        let relabelled = ExtensionFieldSpec {
            label: "Autre libellé".into(),
            ..massar_code()
        };
        let err = store.create(&relabelled).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));

        let found = store.find(&first.identity()).await.unwrap().unwrap();
        assert_eq!(found.label, "Code MASSAR");
        assert_eq!(found.id, first.id);
    }

    #[tokio::test]
    async fn concurrent_creates_yield_exactly_one_winner() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp).await;
        let spec = massar_code();

        let (a, b) = tokio::join!(store.create(&spec), store.create(&spec));
        let wins = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(wins, 1);

        let leftovers: Vec<_> = std::fs::read_dir(tmp.path().join("custom_fields/student"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp_"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn invalid_spec_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp).await;
        let spec = ExtensionFieldSpec::new("Alien", "code", "Code", "Data");

        let err = store.create(&spec).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidSpec { .. }));
        assert!(!tmp.path().join("custom_fields/alien").exists());
    }

    #[tokio::test]
    async fn corrupt_record_is_a_backend_error() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp).await;
        let dir = tmp.path().join("custom_fields/student");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("cne.yaml"), "not: [valid").unwrap();

        let err = store
            .find(&FieldIdentity::new("Student", "cne"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend { .. }));
    }

    #[tokio::test]
    async fn removed_site_becomes_unavailable() {
        let tmp = TempDir::new().unwrap();
        let site = tmp.path().join("site");
        std::fs::create_dir_all(&site).unwrap();
        let store = DirectoryFieldStore::open(&site).build().await.unwrap();

        std::fs::remove_dir_all(&site).unwrap();

        let err = store.find(&massar_code().identity()).await.unwrap_err();
        assert!(err.is_unavailable());
        let err = store.create(&massar_code()).await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn list_sorts_and_filters() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp).await;
        store
            .create(&ExtensionFieldSpec::new("Student", "cne", "CNE", "Data"))
            .await
            .unwrap();
        store.create(&massar_code()).await.unwrap();
        store
            .create(&ExtensionFieldSpec::new("Employee", "ppr_number", "N° PPR", "Data"))
            .await
            .unwrap();

        let all: Vec<_> = store
            .list(None)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.identity().to_string())
            .collect();
        assert_eq!(
            all,
            vec!["Employee.ppr_number", "Student.cne", "Student.massar_code"]
        );

        let students = store.list(Some("Student")).await.unwrap();
        assert_eq!(students.len(), 2);

        let none = store.list(Some("Guardian")).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn persistence_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        {
            let store = open(&tmp).await;
            store.create(&massar_code()).await.unwrap();
        }
        let store = open(&tmp).await;
        assert!(store
            .find(&massar_code().identity())
            .await
            .unwrap()
            .is_some());
    }
}
