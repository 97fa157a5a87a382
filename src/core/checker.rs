//! Decides which namespace-shaped strings are rewritten.

use crate::core::namespace::{trim_separators, NamespaceSet, SEPARATOR};

/// Pure decision component shared read-only by every rewrite pass.
#[derive(Debug, Clone)]
pub struct NamespaceChecker {
    namespaces: NamespaceSet,
    prefix: String,
    prefix_lower: String,
}

impl NamespaceChecker {
    /// Build a checker from the closed whitelist and the (trimmed) prefix.
    pub fn new(namespaces: NamespaceSet, prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        let prefix = trim_separators(&prefix).to_string();
        let prefix_lower = prefix.to_ascii_lowercase();
        Self {
            namespaces,
            prefix,
            prefix_lower,
        }
    }

    /// The prefix every match is moved under.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The whitelist this checker matches against.
    pub fn namespaces(&self) -> &NamespaceSet {
        &self.namespaces
    }

    /// Is `candidate` syntactically a namespace?
    ///
    /// Only `[A-Za-z0-9_\]` is allowed, at least one separator must be
    /// present, and no segment may start with a digit. Strings made only of
    /// separators and a single word wrapped in separators (`\Word\`) are
    /// rejected; a single word with one open side (`Word\`) is accepted since
    /// that is how one-segment namespaces are queried.
    pub fn is_namespace(candidate: &str) -> bool {
        if candidate.is_empty()
            || !candidate
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == SEPARATOR)
            || !candidate.contains(SEPARATOR)
        {
            return false;
        }

        let segments: Vec<&str> = candidate
            .split(SEPARATOR)
            .filter(|segment| !segment.is_empty())
            .collect();

        if segments.is_empty() {
            return false;
        }

        let wrapped = candidate.starts_with(SEPARATOR) && candidate.ends_with(SEPARATOR);
        if wrapped && segments.len() == 1 {
            return false;
        }

        !segments
            .iter()
            .any(|segment| segment.starts_with(|c: char| c.is_ascii_digit()))
    }

    /// Should `candidate` be moved under the prefix?
    pub fn should_transform(&self, candidate: &str) -> bool {
        if !Self::is_namespace(candidate) {
            return false;
        }

        let trimmed = trim_separators(candidate);
        if trimmed.to_ascii_lowercase().starts_with(&self.prefix_lower) {
            return false;
        }

        self.namespaces.contains(trimmed)
    }

    /// Apply the namespace-prefix transform to a segment list.
    ///
    /// Returns the prefixed segments when the joined namespace qualifies,
    /// `None` when it should be left alone.
    pub fn prefix_segments(&self, segments: &[String]) -> Option<Vec<String>> {
        if segments.is_empty() {
            return None;
        }
        let joined = format!("{}\\", trim_separators(&segments.join("\\")));
        if !self.should_transform(&joined) {
            return None;
        }

        let mut prefixed: Vec<String> = self.prefix.split(SEPARATOR).map(str::to_string).collect();
        prefixed.extend(segments.iter().cloned());
        Some(prefixed)
    }
}
