//! Validation helper functions for configuration types.

use crate::core::checker::NamespaceChecker;
use crate::core::errors::{IsolatorError, Result};

/// Validate that the prefix is present and is itself a valid namespace.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.trim().is_empty() {
        return Err(IsolatorError::config_field(
            "You must specify a namespace prefix",
            "prefix",
        ));
    }
    if !NamespaceChecker::is_namespace(prefix) {
        return Err(IsolatorError::config_field(
            format!("Namespace prefix must be a valid namespace, got '{prefix}'"),
            "prefix",
        ));
    }
    Ok(())
}

/// Validate that package names look like `vendor/name`.
pub fn validate_package_names(names: &[String], field: &str) -> Result<()> {
    if let Some(bad) = names
        .iter()
        .find(|name| name.split('/').filter(|part| !part.is_empty()).count() != 2)
    {
        return Err(IsolatorError::config_field(
            format!("{field} entry '{bad}' is not a vendor/name package name"),
            field,
        ));
    }
    Ok(())
}

/// Validate that at least one source extension is configured.
pub fn validate_extensions(extensions: &[String]) -> Result<()> {
    if extensions.is_empty() {
        return Err(IsolatorError::config_field(
            "extensions must list at least one file extension",
            "extensions",
        ));
    }
    if let Some(bad) = extensions
        .iter()
        .find(|ext| ext.trim_start_matches('.').is_empty())
    {
        return Err(IsolatorError::config_field(
            format!("Invalid extension '{bad}'"),
            "extensions",
        ));
    }
    Ok(())
}
