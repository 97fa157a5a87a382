//! Configuration types and management for vendor-isolator.
//!
//! The configuration can live in a standalone YAML file or in the
//! `config.vendor-isolator` section of the root `composer.json`. Either way it
//! deserializes into [`IsolatorConfig`], which must pass [`IsolatorConfig::validate`]
//! before any package is touched.

pub mod validation;

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::errors::{IsolatorError, Result};
use crate::core::namespace::trim_separators;

pub use validation::{validate_extensions, validate_package_names, validate_prefix};

/// Key of the isolator section inside `composer.json`'s `config` object.
pub const COMPOSER_CONFIG_KEY: &str = "vendor-isolator";

/// Literal search/replace pairs for one file.
pub type ReplacementTable = IndexMap<String, String>;

/// Main configuration for an isolation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IsolatorConfig {
    /// Namespace every discovered namespace is moved under
    #[serde(default)]
    pub prefix: String,

    /// Package names that are never scanned or rewritten
    #[serde(default)]
    pub excludelist: Vec<String>,

    /// Post-rewrite literal replacements keyed by vendor-relative file path.
    /// They run on every pass, so each must be idempotent.
    #[serde(default)]
    pub replacements: IndexMap<String, ReplacementTable>,

    /// Also isolate packages that are only required for development
    #[serde(default)]
    pub require_dev: bool,

    /// File extensions parsed as PHP source
    #[serde(default = "IsolatorConfig::default_extensions")]
    pub extensions: Vec<String>,
}

/// Default implementation for [`IsolatorConfig`].
impl Default for IsolatorConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            excludelist: Vec::new(),
            replacements: IndexMap::new(),
            require_dev: false,
            extensions: Self::default_extensions(),
        }
    }
}

/// Configuration construction, validation and I/O methods for [`IsolatorConfig`].
impl IsolatorConfig {
    /// Default extensions recognised as PHP source.
    fn default_extensions() -> Vec<String> {
        vec!["php".to_string()]
    }

    /// Default configuration with the given prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            IsolatorError::io(format!("Failed to read config file: {}", path.display()), e)
        })?;

        serde_yaml::from_str(&content).map_err(Into::into)
    }

    /// Save configuration to a YAML file
    pub fn to_yaml_file(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&path, content).map_err(|e| {
            IsolatorError::io(format!("Failed to write config file: {}", path.display()), e)
        })
    }

    /// Read the `config.vendor-isolator` section of a parsed `composer.json`.
    ///
    /// Returns `Ok(None)` when the manifest has no such section.
    pub fn from_composer_manifest(manifest: &serde_json::Value) -> Result<Option<Self>> {
        match manifest
            .get("config")
            .and_then(|config| config.get(COMPOSER_CONFIG_KEY))
        {
            Some(section) => Ok(Some(serde_json::from_value(section.clone())?)),
            None => Ok(None),
        }
    }

    /// Validate the configuration and normalize the prefix.
    ///
    /// Configuration errors are fatal: nothing may be rewritten with an
    /// invalid prefix.
    pub fn validate(&mut self) -> Result<()> {
        validate_prefix(&self.prefix)?;
        self.prefix = trim_separators(&self.prefix).to_string();
        validate_package_names(&self.excludelist, "excludelist")?;
        validate_extensions(&self.extensions)?;
        Ok(())
    }

    /// Is `package` on the exclude list?
    pub fn is_excluded(&self, package: &str) -> bool {
        self.excludelist.iter().any(|name| name == package)
    }

    /// Resolve replacement keys against the vendor directory.
    pub fn resolved_replacements(&self, vendor_dir: &Path) -> IndexMap<PathBuf, ReplacementTable> {
        self.replacements
            .iter()
            .map(|(file, table)| (vendor_dir.join(file.trim_start_matches('/')), table.clone()))
            .collect()
    }
}
