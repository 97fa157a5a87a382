//! Namespace discovery across package source trees.

use std::path::Path;

use tracing::{debug, warn};

use crate::api::results::{FailureStage, FileFailure, PackageNamespaces};
use crate::core::errors::Result;
use crate::core::file_utils::{collect_php_files, FileReader};
use crate::core::namespace::NamespaceSet;
use crate::lang::php::PhpParser;

/// Namespaces found in one package plus the files that had to be skipped.
#[derive(Debug, Clone, Default)]
pub struct PackageDiscovery {
    /// Declared namespaces
    pub namespaces: NamespaceSet,
    /// Files that parsed successfully
    pub files_scanned: usize,
    /// Files that could not be read or parsed
    pub failures: Vec<FileFailure>,
}

impl PackageDiscovery {
    /// Convert into the per-package report entry.
    pub fn to_report(&self, package: &str) -> PackageNamespaces {
        PackageNamespaces {
            package: package.to_string(),
            namespaces: self.namespaces.iter().map(str::to_string).collect(),
            files_scanned: self.files_scanned,
        }
    }
}

/// Collect the namespaces declared in one file.
pub fn discover_file(parser: &mut PhpParser, path: &Path) -> Result<Vec<String>> {
    let source = FileReader::read_bytes(path)?;
    let tree = parser
        .parse_source(&source, &path.display().to_string())
        .map_err(|err| err.in_file(path))?;
    Ok(tree.declared_namespaces())
}

/// Collect the namespaces declared anywhere below `root`.
///
/// Unreadable or unparsable files are logged and skipped; only failing to
/// build a parser aborts the scan.
pub fn discover_package(root: &Path, extensions: &[String]) -> Result<PackageDiscovery> {
    let mut parser = PhpParser::new()?;
    let mut discovery = PackageDiscovery::default();

    for path in collect_php_files(root, extensions) {
        match discover_file(&mut parser, &path) {
            Ok(namespaces) => {
                discovery.files_scanned += 1;
                for namespace in namespaces {
                    discovery.namespaces.insert(namespace);
                }
            }
            Err(err) => {
                warn!("Skipping {} during discovery: {err}", path.display());
                discovery
                    .failures
                    .push(FileFailure::new(&path, FailureStage::Discovery, &err));
            }
        }
    }

    debug!(
        "Discovered {} namespaces in {} files under {}",
        discovery.namespaces.len(),
        discovery.files_scanned,
        root.display()
    );
    Ok(discovery)
}
