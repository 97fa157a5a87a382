//! Rewrites the keys of Composer's generated `files` autoload tables.
//!
//! Composer keys `autoload_files.php` and the `$files` property of
//! `autoload_static.php` by a hash of package name and path, and skips any
//! key it has already loaded in the process. Two isolated copies of the same
//! library would share those keys, so each key is replaced with one derived
//! from the vendor directory and the file path. Keys carrying the
//! `isolated-` marker are left alone.

use std::path::{Component, Path, PathBuf};

use tracing::{info, warn};
use tree_sitter::Node;

use crate::api::results::{CacheReport, FailureStage, FileFailure};
use crate::core::errors::Result;
use crate::core::file_utils::FileReader;
use crate::lang::edits::{apply_edits, SourceEdit};
use crate::lang::php::PhpParser;
use crate::lang::syntax::{named_children, node_text, StringLiteral};

/// Marker prefix of rewritten keys.
pub const ISOLATED_MARKER: &str = "isolated-";

/// Number of trailing vendor-directory components mixed into each key.
const SCOPE_COMPONENTS: usize = 3;

/// The generated artifacts that carry a `files` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheArtifact {
    /// `autoload_files.php`: the array returned by the file
    Files,
    /// `autoload_static.php`: the array assigned to `$files`
    Static,
}

impl CacheArtifact {
    /// File name inside `<vendor>/composer`.
    pub fn file_name(self) -> &'static str {
        match self {
            CacheArtifact::Files => "autoload_files.php",
            CacheArtifact::Static => "autoload_static.php",
        }
    }
}

/// Rewrites autoload cache keys for one vendor directory.
#[derive(Debug, Clone)]
pub struct AutoloadCacheRewriter {
    vendor_dir: PathBuf,
    key_scope: String,
}

impl AutoloadCacheRewriter {
    /// Create a rewriter for `vendor_dir`.
    pub fn new(vendor_dir: &Path) -> Self {
        let names: Vec<String> = vendor_dir
            .components()
            .filter_map(|component| match component {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        let tail = &names[names.len().saturating_sub(SCOPE_COMPONENTS)..];

        Self {
            vendor_dir: vendor_dir.to_path_buf(),
            key_scope: format!("/{}", tail.join("/")).to_lowercase(),
        }
    }

    /// Location of an artifact.
    pub fn artifact_path(&self, artifact: CacheArtifact) -> PathBuf {
        self.vendor_dir.join("composer").join(artifact.file_name())
    }

    /// Rewrite both artifacts. Missing artifacts are skipped, failures are
    /// logged and recorded.
    pub fn rewrite_all(&self) -> Result<CacheReport> {
        let mut parser = PhpParser::new()?;
        let mut report = CacheReport::default();

        for artifact in [CacheArtifact::Files, CacheArtifact::Static] {
            let path = self.artifact_path(artifact);
            if !path.is_file() {
                info!("Skipping {} since not present", path.display());
                continue;
            }

            match self.rewrite_artifact(&mut parser, &path, artifact) {
                Ok(0) => {}
                Ok(keys) => {
                    info!("Rewrote {keys} keys in {}", path.display());
                    report.keys_rewritten += keys;
                    report.artifacts_rewritten.push(path);
                }
                Err(err) => {
                    warn!("Leaving {} untouched: {err}", path.display());
                    report
                        .failures
                        .push(FileFailure::new(&path, FailureStage::AutoloadCache, &err));
                }
            }
        }

        Ok(report)
    }

    /// Rewrite one artifact in place. Returns the number of keys replaced;
    /// the file is only written when that is non-zero.
    pub fn rewrite_artifact(
        &self,
        parser: &mut PhpParser,
        path: &Path,
        artifact: CacheArtifact,
    ) -> Result<usize> {
        let source = FileReader::read_bytes(path)?;
        let (contents, keys) = self
            .rewrite_source(parser, &source, artifact, &path.display().to_string())
            .map_err(|err| err.in_file(path))?;
        if keys > 0 {
            FileReader::write_if_changed(path, &contents)?;
        }
        Ok(keys)
    }

    /// Rewrite artifact source, returning the new bytes and the number of
    /// keys replaced.
    pub fn rewrite_source(
        &self,
        parser: &mut PhpParser,
        source: impl AsRef<[u8]>,
        artifact: CacheArtifact,
        file_path: &str,
    ) -> Result<(Vec<u8>, usize)> {
        let source = source.as_ref();
        let tree = parser.parse_tree(source, file_path)?;
        let root = tree.root_node();

        let arrays = match artifact {
            CacheArtifact::Files => find_returned_array(root).into_iter().collect(),
            CacheArtifact::Static => find_files_property_arrays(root, source),
        };

        let edits: Vec<SourceEdit> = arrays
            .into_iter()
            .flat_map(|array| self.key_edits(array, source))
            .collect();
        if edits.is_empty() {
            return Ok((source.to_vec(), 0));
        }

        Ok((apply_edits(source, &edits)?, edits.len()))
    }

    /// Build the isolated key for an element.
    pub fn cache_key(&self, value_source: &str, original_key: &str) -> String {
        let value = value_source
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .replace("$vendorDir . ", "")
            .replace(".php", "");
        let raw = format!("{ISOLATED_MARKER}{}{value}{original_key}", self.key_scope);

        let mut key = String::with_capacity(raw.len());
        for c in raw.chars() {
            let c = if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            };
            if !(c == '-' && key.ends_with('-')) {
                key.push(c);
            }
        }
        key.trim_matches('-').to_string()
    }

    fn key_edits(&self, array: Node<'_>, source: &[u8]) -> Vec<SourceEdit> {
        named_children(array)
            .into_iter()
            .filter(|element| element.kind() == "array_element_initializer")
            .filter_map(|element| {
                let mut cursor = element.walk();
                if !element.children(&mut cursor).any(|c| c.kind() == "=>") {
                    return None;
                }

                let parts = named_children(element);
                let key_node = *parts.first()?;
                let value_node = *parts.last()?;
                if key_node.id() == value_node.id() {
                    return None;
                }

                let key_text = node_text(key_node, source);
                let key = StringLiteral::from_source(key_text, key_node.start_byte())?.value();
                if key.contains(ISOLATED_MARKER) {
                    return None;
                }

                let new_key = self.cache_key(node_text(value_node, source), &key);
                Some(SourceEdit::replace(
                    key_node.byte_range(),
                    key_text,
                    format!("'{new_key}'"),
                ))
            })
            .collect()
    }
}

/// First array literal inside the first `return` statement.
fn find_returned_array(root: Node<'_>) -> Option<Node<'_>> {
    let statement = find_first(root, |node| node.kind() == "return_statement")?;
    find_first(statement, |node| node.kind() == "array_creation_expression")
}

/// Array literals initializing a property named `$files`.
fn find_files_property_arrays<'tree>(root: Node<'tree>, source: &[u8]) -> Vec<Node<'tree>> {
    let mut arrays = Vec::new();
    let mut pending = vec![root];

    while let Some(node) = pending.pop() {
        if node.kind() == "property_element" {
            let is_files = named_children(node)
                .iter()
                .any(|c| c.kind() == "variable_name" && node_text(*c, source) == "$files");
            if is_files {
                arrays.extend(find_first(node, |n| n.kind() == "array_creation_expression"));
            }
            continue;
        }
        pending.extend(named_children(node).into_iter().rev());
    }

    arrays
}

/// Pre-order search for the first node below `root` matching `predicate`.
fn find_first<'tree>(
    root: Node<'tree>,
    predicate: impl Fn(&Node<'tree>) -> bool,
) -> Option<Node<'tree>> {
    let mut pending: Vec<Node<'tree>> = named_children(root).into_iter().rev().collect();
    while let Some(node) = pending.pop() {
        if predicate(&node) {
            return Some(node);
        }
        pending.extend(named_children(node).into_iter().rev());
    }
    None
}

#[cfg(test)]
#[path = "autoload_cache_tests.rs"]
mod tests;
