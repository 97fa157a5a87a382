//! Composer project metadata: the root manifest and `installed.json`.
//!
//! Package records are round-tripped: fields this crate does not model are
//! kept in `extra` maps and written back untouched.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::core::checker::NamespaceChecker;
use crate::core::config::IsolatorConfig;
use crate::core::errors::{IsolatorError, Result};
use crate::core::file_utils::{normalize_path, FileReader};
use crate::core::namespace::trim_separators;

/// Vendor directory used when `config.vendor-dir` is not set.
pub const DEFAULT_VENDOR_DIR: &str = "vendor";

/// Path/entry value inside a namespace mapping strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AutoloadPath {
    /// `"Vendor\\": "src/"`
    Single(String),
    /// `"Vendor\\": ["src/", "lib/"]`
    Multiple(Vec<String>),
}

impl AutoloadPath {
    /// Every path in declaration order.
    pub fn paths(&self) -> Vec<&str> {
        match self {
            AutoloadPath::Single(path) => vec![path.as_str()],
            AutoloadPath::Multiple(paths) => paths.iter().map(String::as_str).collect(),
        }
    }
}

/// One autoload strategy (`psr-4`, `psr-0`, `classmap`, `files`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AutoloadEntry {
    /// Namespace to path mapping (`psr-4`, `psr-0`)
    Mapping(IndexMap<String, AutoloadPath>),
    /// Plain path list (`classmap`, `files`, `exclude-from-classmap`)
    Paths(Vec<String>),
    /// Anything else, kept verbatim
    Other(Value),
}

/// An autoload or autoload-dev section.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AutoloadMap(pub IndexMap<String, AutoloadEntry>);

impl<'de> Deserialize<'de> for AutoloadMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        map_or_empty_list(deserializer).map(AutoloadMap)
    }
}

impl AutoloadMap {
    /// Is the section empty?
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Move every qualifying mapping key under the prefix.
    ///
    /// Keys keep their position; the new key is `Prefix\` followed by the
    /// key exactly as written. Returns the number of keys changed.
    pub fn prefix_namespaces(&mut self, checker: &NamespaceChecker) -> usize {
        let mut changed = 0;
        for entry in self.0.values_mut() {
            let AutoloadEntry::Mapping(mapping) = entry else {
                continue;
            };
            let rebuilt: IndexMap<String, AutoloadPath> = std::mem::take(mapping)
                .into_iter()
                .map(|(namespace, path)| {
                    let candidate = format!("{}\\", trim_separators(&namespace));
                    if checker.should_transform(&candidate) {
                        changed += 1;
                        (format!("{}\\{namespace}", checker.prefix()), path)
                    } else {
                        (namespace, path)
                    }
                })
                .collect();
            *mapping = rebuilt;
        }
        changed
    }

    /// The `psr-0` mapping, if any.
    pub fn psr0(&self) -> Option<&IndexMap<String, AutoloadPath>> {
        match self.0.get("psr-0") {
            Some(AutoloadEntry::Mapping(mapping)) => Some(mapping),
            _ => None,
        }
    }

    /// The `files` list, empty if absent.
    pub fn files(&self) -> Vec<&str> {
        match self.0.get("files") {
            Some(AutoloadEntry::Paths(files)) => files.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

/// One installed package as recorded in `installed.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    /// `vendor/name`
    pub name: String,

    /// Production autoload section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoload: Option<AutoloadMap>,

    /// Development autoload section
    #[serde(
        rename = "autoload-dev",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub autoload_dev: Option<AutoloadMap>,

    /// Package requirements (kept verbatim; may be `[]` when empty)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require: Option<Value>,

    /// Install location relative to `vendor/composer`
    #[serde(
        rename = "install-path",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub install_path: Option<String>,

    /// Every other field
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl Package {
    /// Names of the packages this one requires.
    pub fn required_names(&self) -> Vec<&str> {
        match &self.require {
            Some(Value::Object(map)) => map.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Prefix qualifying namespaces in both autoload sections.
    pub fn prefix_autoload(&mut self, checker: &NamespaceChecker) -> usize {
        [self.autoload.as_mut(), self.autoload_dev.as_mut()]
            .into_iter()
            .flatten()
            .map(|section| section.prefix_namespaces(checker))
            .sum()
    }
}

/// Shape of `installed.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InstalledDocument {
    /// Composer 2: `{"packages": [...], "dev": true, ...}`
    Packages {
        /// Installed packages
        packages: Vec<Package>,
        /// Other top-level fields
        #[serde(flatten)]
        extra: IndexMap<String, Value>,
    },
    /// Composer 1: a bare array of packages
    Legacy(Vec<Package>),
}

impl InstalledDocument {
    fn packages(&self) -> &[Package] {
        match self {
            InstalledDocument::Packages { packages, .. } => packages,
            InstalledDocument::Legacy(packages) => packages,
        }
    }

    fn packages_mut(&mut self) -> &mut [Package] {
        match self {
            InstalledDocument::Packages { packages, .. } => packages,
            InstalledDocument::Legacy(packages) => packages,
        }
    }
}

/// A Composer project on disk.
#[derive(Debug, Clone)]
pub struct ComposerProject {
    root: PathBuf,
    manifest: Value,
    vendor_dir: PathBuf,
    installed_path: PathBuf,
    installed: InstalledDocument,
}

impl ComposerProject {
    /// Open the project rooted at `root`.
    ///
    /// Reads `composer.json` and `<vendor>/composer/installed.json`; failing
    /// to read either is fatal.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let root = fs::canonicalize(root).map_err(|e| {
            IsolatorError::io(format!("Project directory not found: {}", root.display()), e)
        })?;

        let manifest_path = root.join("composer.json");
        let manifest: Value = serde_json::from_str(&FileReader::read_to_string(&manifest_path)?)
            .map_err(|e| {
                IsolatorError::config(format!("Invalid {}: {e}", manifest_path.display()))
            })?;

        let vendor_dir = normalize_path(
            &root.join(
                manifest
                    .pointer("/config/vendor-dir")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_VENDOR_DIR),
            ),
        );

        let installed_path = vendor_dir.join("composer").join("installed.json");
        let installed: InstalledDocument =
            serde_json::from_str(&FileReader::read_to_string(&installed_path)?).map_err(|e| {
                IsolatorError::Serialization {
                    message: format!("Invalid {}: {e}", installed_path.display()),
                    data_type: Some("installed.json".to_string()),
                    source: Some(Box::new(e)),
                }
            })?;

        info!(
            "Opened {} with {} installed packages",
            root.display(),
            installed.packages().len()
        );

        Ok(Self {
            root,
            manifest,
            vendor_dir,
            installed_path,
            installed,
        })
    }

    /// Project root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute vendor directory.
    pub fn vendor_dir(&self) -> &Path {
        &self.vendor_dir
    }

    /// The parsed root `composer.json`.
    pub fn manifest(&self) -> &Value {
        &self.manifest
    }

    /// Isolator settings from the root manifest, if present.
    pub fn manifest_config(&self) -> Result<Option<IsolatorConfig>> {
        IsolatorConfig::from_composer_manifest(&self.manifest)
    }

    /// Every installed package.
    pub fn packages(&self) -> &[Package] {
        self.installed.packages()
    }

    /// Every installed package, mutable.
    pub fn packages_mut(&mut self) -> &mut [Package] {
        self.installed.packages_mut()
    }

    /// Look up an installed package by name.
    pub fn package(&self, name: &str) -> Option<&Package> {
        self.packages().iter().find(|package| package.name == name)
    }

    /// Where `package` is installed.
    pub fn install_dir(&self, package: &Package) -> PathBuf {
        match &package.install_path {
            Some(path) => normalize_path(&self.vendor_dir.join("composer").join(path)),
            None => self.vendor_dir.join(&package.name),
        }
    }

    /// Installed packages reachable from the root manifest's `require`.
    ///
    /// Platform requirements such as `php` or `ext-json` are not installed
    /// packages and drop out naturally.
    pub fn required_packages(&self) -> BTreeSet<String> {
        let mut required = BTreeSet::new();
        let mut pending: Vec<String> = self
            .manifest
            .get("require")
            .and_then(Value::as_object)
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();

        while let Some(name) = pending.pop() {
            if required.contains(&name) {
                continue;
            }
            if let Some(package) = self.package(&name) {
                pending.extend(package.required_names().into_iter().map(str::to_string));
                required.insert(name);
            }
        }

        required
    }

    /// Write `installed.json` back in its original shape with four-space
    /// indentation. Returns whether the file changed.
    pub fn persist(&self) -> Result<bool> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.installed.serialize(&mut serializer)?;
        buffer.push(b'\n');

        let written = FileReader::write_if_changed(&self.installed_path, &buffer)?;
        debug!(
            "{} {}",
            if written { "Persisted" } else { "Unchanged" },
            self.installed_path.display()
        );
        Ok(written)
    }
}

/// Deserialize a JSON object, accepting PHP's empty-array encoding of `{}`.
fn map_or_empty_list<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MapOrList<T> {
        Map(T),
        List(Vec<Value>),
    }

    match MapOrList::<T>::deserialize(deserializer)? {
        MapOrList::Map(map) => Ok(map),
        MapOrList::List(_) => Ok(T::default()),
    }
}

#[cfg(test)]
#[path = "composer_tests.rs"]
mod tests;
