//! Main isolation engine implementation.

use std::path::{Path, PathBuf};
use std::time::Instant;

use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::api::results::{
    error_chain, CacheReport, DiscoveryReport, FailureStage, FileFailure, IsolationReport,
};
use crate::core::checker::NamespaceChecker;
use crate::core::config::{IsolatorConfig, ReplacementTable};
use crate::core::errors::Result;
use crate::core::file_utils::{collect_php_files, normalize_path, FileReader};
use crate::core::namespace::{Namespace, NamespaceSet};
use crate::io::composer::{ComposerProject, Package};
use crate::isolation::autoload_cache::AutoloadCacheRewriter;
use crate::isolation::discovery::{discover_package, PackageDiscovery};
use crate::isolation::relocator::{DirectoryRelocator, RelocationReport};
use crate::isolation::visitor::NamespaceRewriter;
use crate::lang::php::PhpParser;

/// Attached to relocation failures, which leave a package half isolated.
const RERUN_HINT: &str = "rerun once the problem is fixed to finish this package";

/// A package selected for isolation.
#[derive(Debug, Clone)]
struct EligiblePackage {
    index: usize,
    name: String,
    install_dir: PathBuf,
}

/// Result of processing one file.
enum FileOutcome {
    Unchanged,
    Written(PathBuf),
    Failed(FileFailure),
}

/// Main isolation engine
pub struct IsolationEngine {
    /// Validated configuration
    config: IsolatorConfig,

    /// Project being isolated
    project: ComposerProject,
}

impl IsolationEngine {
    /// Create an engine for `project`.
    ///
    /// The configuration is validated here; an invalid prefix fails before
    /// anything on disk is touched.
    pub fn new(mut config: IsolatorConfig, project: ComposerProject) -> Result<Self> {
        config.validate()?;
        info!(
            "Initializing isolation of {} under {}",
            project.root().display(),
            config.prefix
        );
        Ok(Self { config, project })
    }

    /// The validated configuration.
    pub fn config(&self) -> &IsolatorConfig {
        &self.config
    }

    /// The project, including any metadata mutated so far.
    pub fn project(&self) -> &ComposerProject {
        &self.project
    }

    /// Run discovery only and return the closed namespace set.
    pub fn discover(&self) -> Result<DiscoveryReport> {
        let eligible = self.eligible_packages();
        self.discover_packages(&eligible)
    }

    /// Run both phases in order.
    pub fn run(&mut self) -> Result<IsolationReport> {
        let start = Instant::now();

        let mut report = self.mutate_namespaces()?;
        report.absorb_cache(self.mutate_autoload_cache()?);
        report.duration = start.elapsed();

        info!(
            "Isolation finished in {:?}: {} files rewritten, {} directories moved, {} failures",
            report.duration,
            report.files_rewritten.len(),
            report.directories_moved.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Discover, mutate package metadata, relocate PSR-0 trees, rewrite
    /// files and persist `installed.json`.
    pub fn mutate_namespaces(&mut self) -> Result<IsolationReport> {
        let start = Instant::now();
        let eligible = self.eligible_packages();
        let discovery = self.discover_packages(&eligible)?;

        let mut report = IsolationReport {
            prefix: self.config.prefix.clone(),
            eligible_packages: eligible.iter().map(|p| p.name.clone()).collect(),
            namespace_count: discovery.namespaces.len(),
            files_scanned: discovery.files_scanned(),
            failures: discovery.failures,
            ..Default::default()
        };

        if discovery.namespaces.is_empty() {
            info!("No namespaces discovered; nothing to isolate");
            report.duration = start.elapsed();
            return Ok(report);
        }

        let checker = NamespaceChecker::new(discovery.namespaces, self.config.prefix.clone());
        let prefix: Namespace = self.config.prefix.parse()?;
        let relocator = DirectoryRelocator::new(&prefix, self.project.vendor_dir());
        let replacements: IndexMap<PathBuf, ReplacementTable> = self
            .config
            .resolved_replacements(self.project.vendor_dir())
            .into_iter()
            .map(|(path, table)| (normalize_path(&path), table))
            .collect();

        for package in &eligible {
            let keys = self.project.packages_mut()[package.index].prefix_autoload(&checker);
            report.autoload_keys_rewritten += keys;
            debug!("{}: {keys} autoload keys prefixed", package.name);

            let installed = &self.project.packages()[package.index];
            match relocate_package(&relocator, installed, &package.install_dir) {
                Ok(relocation) => {
                    report.directories_moved.extend(relocation.moved);
                    report.files_restored.extend(relocation.restored);
                }
                Err(err) => {
                    warn!(
                        "Relocation failed for {}: {}. Its autoload keys are already prefixed \
                         but its files were not rewritten; {RERUN_HINT}",
                        package.name,
                        error_chain(&err)
                    );
                    let mut failure =
                        FileFailure::new(&package.install_dir, FailureStage::Relocation, &err);
                    failure.message = format!("{} ({RERUN_HINT})", failure.message);
                    report.failures.push(failure);
                    continue;
                }
            }

            for outcome in self.rewrite_package(&checker, &package.install_dir, &replacements) {
                match outcome {
                    FileOutcome::Unchanged => {}
                    FileOutcome::Written(path) => report.files_rewritten.push(path),
                    FileOutcome::Failed(failure) => report.failures.push(failure),
                }
            }
        }

        self.project.persist()?;
        report.duration = start.elapsed();
        info!(
            "Namespace phase done: {} namespaces, {} files rewritten",
            report.namespace_count,
            report.files_rewritten.len()
        );
        Ok(report)
    }

    /// Rewrite the keys of the generated autoload cache artifacts.
    pub fn mutate_autoload_cache(&self) -> Result<CacheReport> {
        AutoloadCacheRewriter::new(self.project.vendor_dir()).rewrite_all()
    }

    fn eligible_packages(&self) -> Vec<EligiblePackage> {
        let required = (!self.config.require_dev).then(|| self.project.required_packages());

        self.project
            .packages()
            .iter()
            .enumerate()
            .filter(|(_, package)| {
                required
                    .as_ref()
                    .map_or(true, |required| required.contains(&package.name))
            })
            .filter(|(_, package)| !self.config.is_excluded(&package.name))
            .filter_map(|(index, package)| {
                let install_dir = self.project.install_dir(package);
                if install_dir.is_dir() {
                    Some(EligiblePackage {
                        index,
                        name: package.name.clone(),
                        install_dir,
                    })
                } else {
                    warn!(
                        "Skipping {}: not installed at {}",
                        package.name,
                        install_dir.display()
                    );
                    None
                }
            })
            .collect()
    }

    fn discover_packages(&self, eligible: &[EligiblePackage]) -> Result<DiscoveryReport> {
        let discovered: Vec<PackageDiscovery> = eligible
            .par_iter()
            .map(|package| discover_package(&package.install_dir, &self.config.extensions))
            .collect::<Result<Vec<_>>>()?;

        let mut report = DiscoveryReport::default();
        let mut namespaces = NamespaceSet::new();
        for (package, discovery) in eligible.iter().zip(discovered) {
            report.packages.push(discovery.to_report(&package.name));
            namespaces.extend(discovery.namespaces);
            report.failures.extend(discovery.failures);
        }
        report.namespaces = namespaces.with_ancestors();

        info!(
            "Discovered {} namespaces across {} packages",
            report.namespaces.len(),
            report.packages.len()
        );
        Ok(report)
    }

    fn rewrite_package(
        &self,
        checker: &NamespaceChecker,
        install_dir: &Path,
        replacements: &IndexMap<PathBuf, ReplacementTable>,
    ) -> Vec<FileOutcome> {
        let rewriter = NamespaceRewriter::new(checker);
        let files = collect_php_files(install_dir, &self.config.extensions);

        files
            .par_iter()
            .map_init(PhpParser::new, |parser, path| {
                let parser = match parser {
                    Ok(parser) => parser,
                    Err(err) => {
                        return FileOutcome::Failed(FileFailure::new(
                            path,
                            FailureStage::Rewrite,
                            &*err,
                        ))
                    }
                };
                rewrite_one(&rewriter, parser, path, replacements.get(&normalize_path(path)))
            })
            .collect()
    }
}

fn relocate_package(
    relocator: &DirectoryRelocator,
    package: &Package,
    install_dir: &Path,
) -> Result<RelocationReport> {
    let mut report = RelocationReport::default();
    for autoload in [package.autoload.as_ref(), package.autoload_dev.as_ref()]
        .into_iter()
        .flatten()
    {
        report.extend(relocator.relocate(&package.name, install_dir, autoload)?);
    }
    Ok(report)
}

fn rewrite_one(
    rewriter: &NamespaceRewriter<'_>,
    parser: &mut PhpParser,
    path: &Path,
    replacements: Option<&ReplacementTable>,
) -> FileOutcome {
    let written = rewriter
        .rewrite_file(parser, path, replacements)
        .and_then(|rewrite| {
            if rewrite.mutated {
                FileReader::write_if_changed(path, &rewrite.contents)
            } else {
                Ok(false)
            }
        });

    match written {
        Ok(true) => {
            debug!("Rewrote {}", path.display());
            FileOutcome::Written(path.to_path_buf())
        }
        Ok(false) => FileOutcome::Unchanged,
        Err(err) => {
            error!(
                "Error during isolation rewrite: {}: {}",
                path.display(),
                error_chain(&err)
            );
            FileOutcome::Failed(FileFailure::new(path, FailureStage::Rewrite, &err))
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
