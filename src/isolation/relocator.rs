//! Moves PSR-0 directory trees under the prefix path.
//!
//! PSR-0 maps namespace segments onto directories, so once `Vendor_Lib` is
//! declared as `Prefix\Vendor_Lib` its files must live below
//! `<path>/Prefix/`. Directories are moved through a staging location in the
//! vendor directory because the target sits inside the source.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::api::results::MovedDirectory;
use crate::core::errors::{IsolatorError, Result};
use crate::core::file_utils::normalize_path;
use crate::core::namespace::Namespace;
use crate::io::composer::AutoloadMap;

/// Name of the staging directory inside the vendor directory.
pub const STAGING_DIR: &str = "_isolate_tmp";

/// What one relocation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelocationReport {
    /// Directories moved under the prefix path
    pub moved: Vec<MovedDirectory>,
    /// `files` autoload entries moved back to their declared location
    pub restored: Vec<PathBuf>,
}

impl RelocationReport {
    /// Fold another pass into this one.
    pub fn extend(&mut self, other: RelocationReport) {
        self.moved.extend(other.moved);
        self.restored.extend(other.restored);
    }
}

/// Relocates the PSR-0 directories of one package at a time.
#[derive(Debug, Clone)]
pub struct DirectoryRelocator {
    prefix: Namespace,
    prefix_path: PathBuf,
    staging: PathBuf,
}

impl DirectoryRelocator {
    /// Create a relocator for `prefix`, staging moves inside `vendor_dir`.
    pub fn new(prefix: &Namespace, vendor_dir: &Path) -> Self {
        Self {
            prefix: prefix.clone(),
            prefix_path: prefix.to_path(),
            staging: vendor_dir.join(STAGING_DIR),
        }
    }

    /// Was this PSR-0 key prefixed? Compared per segment, ignoring ASCII case.
    fn is_prefixed(&self, key: &str) -> bool {
        key.parse::<Namespace>()
            .is_ok_and(|namespace| namespace.starts_with_ignore_case(&self.prefix))
    }

    /// Relocate the directories named by an already-prefixed autoload
    /// section of the package installed at `install_dir`.
    ///
    /// A target that already exists means the move happened on an earlier
    /// run and is skipped. Any filesystem error stops the package.
    pub fn relocate(
        &self,
        package: &str,
        install_dir: &Path,
        autoload: &AutoloadMap,
    ) -> Result<RelocationReport> {
        let mut report = RelocationReport::default();
        let mut moved: Vec<PathBuf> = Vec::new();

        if let Some(psr0) = autoload.psr0() {
            for (namespace, paths) in psr0 {
                if !self.is_prefixed(namespace) {
                    continue;
                }

                for path in paths.paths() {
                    let old = normalize_path(&install_dir.join(path.trim_matches('/')));
                    let new = old.join(&self.prefix_path);

                    if moved.contains(&old) || new.exists() {
                        debug!("{} already relocated", old.display());
                        continue;
                    }

                    self.move_directory(&old, &new)?;
                    info!("Moved {} to {}", old.display(), new.display());
                    report.moved.push(MovedDirectory {
                        package: package.to_string(),
                        from: old.clone(),
                        to: new,
                    });
                    moved.push(old);
                }
            }
        }

        for file in autoload.files() {
            let declared = normalize_path(&install_dir.join(file.trim_start_matches('/')));
            for old in &moved {
                let Ok(remainder) = declared.strip_prefix(old) else {
                    continue;
                };
                let relocated = old.join(&self.prefix_path).join(remainder);
                if !relocated.exists() {
                    continue;
                }

                if let Some(parent) = declared.parent() {
                    fs::create_dir_all(parent).map_err(|e| {
                        IsolatorError::relocation(parent, "Failed to create directory", e)
                    })?;
                }
                fs::rename(&relocated, &declared).map_err(|e| {
                    IsolatorError::relocation(&relocated, "Failed to restore autoloaded file", e)
                })?;
                debug!("Restored {}", declared.display());
                report.restored.push(declared.clone());
                break;
            }
        }

        Ok(report)
    }

    fn move_directory(&self, old: &Path, new: &Path) -> Result<()> {
        if self.staging.exists() {
            return Err(IsolatorError::relocation_state(
                &self.staging,
                "Staging path left over from an interrupted run; remove it and retry",
            ));
        }

        fs::rename(old, &self.staging)
            .map_err(|e| IsolatorError::relocation(old, "Failed to move to staging", e))?;
        if let Some(parent) = new.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| IsolatorError::relocation(parent, "Failed to create directory", e))?;
        }
        fs::rename(&self.staging, new)
            .map_err(|e| IsolatorError::relocation(new, "Failed to move from staging", e))?;
        Ok(())
    }
}
