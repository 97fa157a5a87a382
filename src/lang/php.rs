//! PHP parser adapter with tree-sitter integration.

use tree_sitter::{Parser, Tree};

use super::registry::create_parser_for_language;
use super::syntax::{first_error, lower_children, SyntaxTree};
use crate::core::errors::{IsolatorError, Result};

#[cfg(test)]
#[path = "php_tests.rs"]
mod tests;

const LANGUAGE_KEY: &str = "php";

/// PHP-specific parsing.
///
/// A parser is not shareable across threads, so every worker creates its own.
pub struct PhpParser {
    /// Tree-sitter parser for PHP
    parser: Parser,
}

impl PhpParser {
    /// Create a new PHP parser
    pub fn new() -> Result<Self> {
        let parser = create_parser_for_language(LANGUAGE_KEY)?;
        Ok(Self { parser })
    }

    /// Parse PHP source into a raw tree-sitter tree.
    ///
    /// Sources with syntax errors are rejected: rewriting a file the grammar
    /// only partially understood could corrupt it. The source is taken as raw
    /// bytes, so byte offsets in the tree match the file on disk.
    pub fn parse_tree(&mut self, source_code: impl AsRef<[u8]>, file_path: &str) -> Result<Tree> {
        let tree = self.parser.parse(source_code.as_ref(), None).ok_or_else(|| {
            IsolatorError::parse_with_location(
                LANGUAGE_KEY,
                "Failed to parse PHP source code",
                file_path,
                None,
                None,
            )
        })?;

        let root = tree.root_node();
        if root.has_error() {
            let error_node = first_error(root);
            let location = error_node.map(|node| node.start_position());
            let message = match error_node {
                Some(node) if node.is_missing() => format!("Missing '{}'", node.kind()),
                _ => "Syntax error".to_string(),
            };
            return Err(IsolatorError::parse_with_location(
                LANGUAGE_KEY,
                message,
                file_path,
                location.map(|point| point.row + 1),
                location.map(|point| point.column + 1),
            ));
        }

        Ok(tree)
    }

    /// Parse PHP source and lower it into the closed syntax model.
    pub fn parse_source(
        &mut self,
        source_code: impl AsRef<[u8]>,
        file_path: &str,
    ) -> Result<SyntaxTree> {
        let source = source_code.as_ref();
        let tree = self.parse_tree(source, file_path)?;
        Ok(SyntaxTree {
            nodes: lower_children(tree.root_node(), source),
        })
    }
}
