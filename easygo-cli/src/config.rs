//! Migration configuration loaded with Figment.
//!
//! Sources, later overriding earlier:
//! 1. Built-in defaults
//! 2. `easygo.toml` then `easygo.yaml` in the working directory
//! 3. The file passed with `--config`
//! 4. `EASYGO_*` environment variables (e.g. `EASYGO_STORE_ROOT`)
//!
//! Relative `manifests` entries are resolved against the directory of the
//! file that declared them. Entries from the environment stay relative to the
//! working directory.

use std::path::{Path, PathBuf};

use easygo_fields::SchemaRegistry;
use figment::{
    providers::{Env, Format, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "EASYGO_";

/// File names discovered in the working directory, in merge order.
pub const DISCOVERED_FILES: [&str; 2] = ["easygo.toml", "easygo.yaml"];

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Explicit configuration file not found
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Configuration file format not supported
    #[error("Unsupported configuration file format: {path}")]
    UnsupportedFormat { path: PathBuf },

    /// Configuration parsing failed
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] figment::Error),
}

/// Everything the `reconcile` and `list` commands need to know.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MigrationConfig {
    /// Site directory holding `custom_fields/`
    pub store_root: PathBuf,
    /// Field manifests applied after the built-in set, in order.
    /// Relative paths are relative to the declaring config file.
    pub manifests: Vec<PathBuf>,
    /// Whether the built-in MASSAR fields are part of the batch
    pub include_massar_defaults: bool,
    /// Record types registered on top of the school defaults
    pub record_types: Vec<String>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            store_root: PathBuf::from("site"),
            manifests: Vec::new(),
            include_massar_defaults: true,
            record_types: Vec::new(),
        }
    }
}

impl MigrationConfig {
    /// Load from the current working directory.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."), explicit)
    }

    /// Load, discovering `easygo.toml`/`easygo.yaml` in `dir`.
    pub fn load_from(dir: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let figment = Self::figment(dir, explicit)?;
        let mut config: MigrationConfig = figment.extract()?;
        config.resolve_manifests(&figment);
        debug!(
            store_root = %config.store_root.display(),
            manifests = config.manifests.len(),
            include_massar_defaults = config.include_massar_defaults,
            "loaded migration configuration"
        );
        Ok(config)
    }

    fn figment(dir: &Path, explicit: Option<&Path>) -> Result<Figment, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(MigrationConfig::default()));

        for name in DISCOVERED_FILES {
            let path = dir.join(name);
            if path.is_file() {
                debug!(path = %path.display(), "found configuration file");
                figment = figment.merge(file_provider(&path)?);
            }
        }

        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(ConfigError::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
            figment = figment.merge(file_provider(path)?);
        }

        Ok(figment.merge(
            Env::prefixed(ENV_PREFIX).map(|key| key.as_str().to_lowercase().into()),
        ))
    }

    /// Anchor relative manifest paths at the config file that set them.
    ///
    /// Arrays are replaced, not appended, on merge, so the whole list comes
    /// from a single source.
    fn resolve_manifests(&mut self, figment: &Figment) {
        let Ok(value) = figment.find_value("manifests") else {
            return;
        };
        let base = figment
            .get_metadata(value.tag())
            .and_then(|metadata| metadata.source.as_ref())
            .and_then(|source| source.file_path())
            .and_then(Path::parent);
        let Some(base) = base else {
            return;
        };
        for manifest in &mut self.manifests {
            if manifest.is_relative() {
                *manifest = base.join(&*manifest);
            }
        }
    }

    /// The schema registry the store validates against.
    pub fn registry(&self) -> SchemaRegistry {
        SchemaRegistry::school_defaults().with_record_types(self.record_types.iter().cloned())
    }
}

fn file_provider(path: &Path) -> Result<Figment, ConfigError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Ok(Figment::from(Toml::file(path))),
        Some("yaml") | Some("yml") => Ok(Figment::from(Yaml::file(path))),
        _ => Err(ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}
