//! Isolation results and reporting structures.

use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::namespace::NamespaceSet;

/// The phase in which a per-file or per-package failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureStage {
    /// Reading or parsing a file while collecting namespaces
    Discovery,
    /// Parsing, rewriting or writing a file
    Rewrite,
    /// Moving a PSR-0 directory
    Relocation,
    /// Rewriting a generated autoload cache artifact
    AutoloadCache,
}

/// A failure that was logged and skipped without aborting the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    /// File or directory the failure relates to
    pub path: PathBuf,
    /// Phase that failed
    pub stage: FailureStage,
    /// Error message including its source chain
    pub message: String,
}

impl FileFailure {
    /// Record `error` for `path`.
    pub fn new(path: impl Into<PathBuf>, stage: FailureStage, error: &(dyn Error + 'static)) -> Self {
        Self {
            path: path.into(),
            stage,
            message: error_chain(error),
        }
    }
}

/// Render an error and all of its sources as one line.
pub fn error_chain(error: &(dyn Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// A directory moved under the prefix path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovedDirectory {
    /// Package owning the directory
    pub package: String,
    /// Original location
    pub from: PathBuf,
    /// New location
    pub to: PathBuf,
}

/// Namespaces declared by one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageNamespaces {
    /// Composer package name
    pub package: String,
    /// Declared namespaces, sorted
    pub namespaces: Vec<String>,
    /// Files parsed
    pub files_scanned: usize,
}

/// Output of the discovery phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryReport {
    /// Per-package declarations
    pub packages: Vec<PackageNamespaces>,
    /// Union of all declarations closed over ancestors
    pub namespaces: NamespaceSet,
    /// Files that could not be read or parsed
    pub failures: Vec<FileFailure>,
}

impl DiscoveryReport {
    /// Total number of files parsed across packages.
    pub fn files_scanned(&self) -> usize {
        self.packages.iter().map(|p| p.files_scanned).sum()
    }
}

/// Outcome of the autoload-cache phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheReport {
    /// Artifacts written back
    pub artifacts_rewritten: Vec<PathBuf>,
    /// Number of array keys replaced
    pub keys_rewritten: usize,
    /// Artifacts that failed to parse or write
    pub failures: Vec<FileFailure>,
}

/// Summary of an isolation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IsolationReport {
    /// Prefix namespaces were moved under
    pub prefix: String,
    /// Packages that were scanned and rewritten
    pub eligible_packages: Vec<String>,
    /// Size of the whitelist after ancestor closure
    pub namespace_count: usize,
    /// Files parsed during discovery
    pub files_scanned: usize,
    /// Autoload map keys that were prefixed
    pub autoload_keys_rewritten: usize,
    /// Files whose content changed
    pub files_rewritten: Vec<PathBuf>,
    /// PSR-0 directories moved under the prefix path
    pub directories_moved: Vec<MovedDirectory>,
    /// `files` autoload entries moved back to their declared path
    pub files_restored: Vec<PathBuf>,
    /// Autoload cache artifacts written
    pub artifacts_rewritten: Vec<PathBuf>,
    /// Autoload cache keys replaced
    pub cache_keys_rewritten: usize,
    /// Everything that was logged and skipped
    pub failures: Vec<FileFailure>,
    /// Wall-clock duration of the run
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl IsolationReport {
    /// True if any file or package was skipped because of an error.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Fold the autoload-cache phase into this report.
    pub fn absorb_cache(&mut self, cache: CacheReport) {
        self.artifacts_rewritten.extend(cache.artifacts_rewritten);
        self.cache_keys_rewritten += cache.keys_rewritten;
        self.failures.extend(cache.failures);
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::IsolatorError;

    #[test]
    fn test_failure_message_includes_source_chain() {
        let err = IsolatorError::io(
            "Failed to read file: a.php",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let failure = FileFailure::new("a.php", FailureStage::Rewrite, &err);
        assert_eq!(failure.message, "I/O error: Failed to read file: a.php: denied");
    }

    #[test]
    fn test_report_serializes_duration_as_millis() {
        let report = IsolationReport {
            prefix: "Acme\\Isolated".to_string(),
            duration: Duration::from_millis(1500),
            ..Default::default()
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["duration"], 1500);
        assert_eq!(json["prefix"], "Acme\\Isolated");
        assert!(!report.has_failures());
    }

    #[test]
    fn test_absorb_cache() {
        let mut report = IsolationReport::default();
        report.absorb_cache(CacheReport {
            artifacts_rewritten: vec![PathBuf::from("vendor/composer/autoload_files.php")],
            keys_rewritten: 3,
            failures: Vec::new(),
        });
        assert_eq!(report.cache_keys_rewritten, 3);
        assert_eq!(report.artifacts_rewritten.len(), 1);
    }
}
