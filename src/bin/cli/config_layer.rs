//! Configuration Layer Management
//!
//! The effective configuration is built from three layers, later ones taking
//! priority: a YAML file given with `--config` (or, without one, the
//! `config.vendor-isolator` section of `composer.json`), then CLI overrides.

use anyhow::Context;

use crate::cli::args::{ProjectArgs, SelectionArgs};
use vendor_isolator::{ComposerProject, IsolatorConfig};

/// Trait for merging configuration layers
pub trait ConfigMerge<T> {
    /// Merge another layer into this one, with the other taking priority
    fn merge_with(&mut self, other: T);
}

/// Overrides collected from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub prefix: Option<String>,
    pub require_dev: bool,
    pub exclude: Vec<String>,
}

impl CliOverrides {
    /// Collect overrides from the shared argument groups.
    pub fn from_args(project: &ProjectArgs, selection: Option<&SelectionArgs>) -> Self {
        Self {
            prefix: project.prefix.clone(),
            require_dev: selection.is_some_and(|s| s.require_dev),
            exclude: selection.map(|s| s.exclude.clone()).unwrap_or_default(),
        }
    }
}

impl ConfigMerge<CliOverrides> for IsolatorConfig {
    fn merge_with(&mut self, other: CliOverrides) {
        if let Some(prefix) = other.prefix {
            self.prefix = prefix;
        }
        if other.require_dev {
            self.require_dev = true;
        }
        for package in other.exclude {
            if !self.excludelist.contains(&package) {
                self.excludelist.push(package);
            }
        }
    }
}

/// Resolve the effective configuration for `project`.
///
/// Validation is left to the engine so every command fails the same way.
pub fn resolve_config(
    args: &ProjectArgs,
    project: &ComposerProject,
    overrides: CliOverrides,
) -> anyhow::Result<IsolatorConfig> {
    let mut config = match &args.config {
        Some(path) => IsolatorConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => project
            .manifest_config()
            .context("Invalid config.vendor-isolator section in composer.json")?
            .unwrap_or_default(),
    };

    config.merge_with(overrides);
    Ok(config)
}
