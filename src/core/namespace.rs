//! Namespace values, scopes and the discovered-namespace whitelist.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::{IsolatorError, Result};

/// The PHP namespace separator.
pub const SEPARATOR: char = '\\';

/// Strip leading and trailing namespace separators.
pub fn trim_separators(value: &str) -> &str {
    value.trim_matches(SEPARATOR)
}

/// True when `segment` is a PHP label: `[A-Za-z_\x80-\u{10FFFF}][A-Za-z0-9_\x80-\u{10FFFF}]*`.
///
/// Only the ASCII subset is ever rewritten; [`NamespaceChecker::is_namespace`]
/// enforces that.
///
/// [`NamespaceChecker::is_namespace`]: crate::core::checker::NamespaceChecker::is_namespace
pub fn is_label(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || !first.is_ascii() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || !c.is_ascii())
        }
        _ => false,
    }
}

/// A hierarchical namespace such as `Vendor\Package\Sub`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace {
    segments: Vec<String>,
}

impl Namespace {
    /// Build a namespace from already-split segments.
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(IsolatorError::validation("A namespace needs at least one segment"));
        }
        if let Some(bad) = segments.iter().find(|s| !is_label(s)) {
            return Err(IsolatorError::validation(format!(
                "Invalid namespace segment '{bad}'"
            )));
        }
        Ok(Self { segments })
    }

    /// The individual segments, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Does this namespace begin with the segments of `other`, ignoring ASCII
    /// case? Used for prefix self-exclusion.
    pub fn starts_with_ignore_case(&self, other: &Namespace) -> bool {
        other.segments.len() <= self.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(ours, theirs)| ours.eq_ignore_ascii_case(theirs))
    }

    /// The namespace as a relative path (`Vendor\Package` → `Vendor/Package`).
    pub fn to_path(&self) -> std::path::PathBuf {
        self.segments.iter().collect()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("\\"))
    }
}

impl FromStr for Namespace {
    type Err = IsolatorError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_segments(trim_separators(s).split(SEPARATOR))
    }
}

impl TryFrom<String> for Namespace {
    type Error = IsolatorError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Namespace> for String {
    fn from(value: Namespace) -> Self {
        value.to_string()
    }
}

/// Lexical scope of a position in a PHP file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Scope {
    /// Code outside any named namespace
    #[default]
    Global,
    /// Code inside `namespace Foo\Bar`
    Namespace(Namespace),
}

impl Scope {
    /// True for the global namespace.
    pub fn is_global(&self) -> bool {
        matches!(self, Scope::Global)
    }
}

/// The whitelist of namespaces eligible for rewriting.
///
/// Membership is an exact string match on the separator-trimmed form, which
/// is how the checker queries it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamespaceSet {
    namespaces: BTreeSet<String>,
}

impl NamespaceSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a namespace given in source form; separators at the ends are trimmed.
    pub fn insert(&mut self, namespace: impl AsRef<str>) -> bool {
        let trimmed = trim_separators(namespace.as_ref());
        if trimmed.is_empty() {
            return false;
        }
        self.namespaces.insert(trimmed.to_string())
    }

    /// Exact membership test on the trimmed form.
    pub fn contains(&self, namespace: &str) -> bool {
        self.namespaces.contains(trim_separators(namespace))
    }

    /// Merge another set into this one.
    pub fn extend(&mut self, other: NamespaceSet) {
        self.namespaces.extend(other.namespaces);
    }

    /// Add every ancestor of every member (`A\B\C` adds `A\B` and `A`).
    pub fn close_over_ancestors(&mut self) {
        let ancestors: Vec<String> = self
            .namespaces
            .iter()
            .flat_map(|ns| {
                let parts: Vec<&str> = ns.split(SEPARATOR).collect();
                (1..parts.len())
                    .map(|len| parts[..len].join("\\"))
                    .collect::<Vec<_>>()
            })
            .filter(|ancestor| !ancestor.is_empty())
            .collect();
        self.namespaces.extend(ancestors);
    }

    /// Consume the set and return it closed over ancestors.
    pub fn with_ancestors(mut self) -> Self {
        self.close_over_ancestors();
        self
    }

    /// Number of namespaces.
    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    /// True if no namespace was discovered.
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    /// Iterate in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.namespaces.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for NamespaceSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut set = NamespaceSet::new();
        for ns in iter {
            set.insert(ns);
        }
        set
    }
}
