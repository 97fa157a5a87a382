//! The namespace rewrite pass over one PHP file.
//!
//! The lowered [`SyntaxTree`] is walked top-down by a single exhaustive
//! `match`. Scope and alias state travel as a [`TraversalContext`] value that
//! is passed into each node and handed back out, and every rewrite becomes a
//! [`SourceEdit`] against the original text.

use std::path::Path;

use aho_corasick::AhoCorasick;
use indexmap::IndexMap;
use tracing::debug;

use crate::core::checker::NamespaceChecker;
use crate::core::config::ReplacementTable;
use crate::core::errors::{IsolatorError, Result};
use crate::core::file_utils::FileReader;
use crate::core::namespace::{trim_separators, Namespace, Scope, SEPARATOR};
use crate::lang::edits::{apply_edits, SourceEdit};
use crate::lang::php::PhpParser;
use crate::lang::syntax::{ImportDecl, NameRef, NamespaceDecl, StringLiteral, SyntaxNode};

#[cfg(test)]
#[path = "visitor_tests.rs"]
mod tests;

/// Aliases bound by `use ... as Alias` in the current file.
///
/// The table lives for the whole file and is not reset between namespace
/// blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    aliases: IndexMap<String, String>,
}

impl AliasTable {
    /// Record that `alias` stands for `target`.
    pub fn bind(&mut self, alias: impl Into<String>, target: impl Into<String>) {
        self.aliases.insert(alias.into(), target.into());
    }

    /// Is `segment` a bound alias?
    pub fn is_alias(&self, segment: &str) -> bool {
        self.aliases.contains_key(segment)
    }

    /// Number of bound aliases.
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// True if no alias was bound.
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// State threaded through the traversal of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraversalContext {
    /// Enclosing namespace of the node being visited
    pub scope: Scope,
    /// Aliases seen so far in the file
    pub aliases: AliasTable,
}

/// Result of rewriting one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRewrite {
    /// The new file contents, in the file's own encoding
    pub contents: Vec<u8>,
    /// True when `contents` differs from the input
    pub mutated: bool,
    /// Number of namespace edits applied
    pub edits: usize,
}

impl FileRewrite {
    fn unchanged(source: &[u8]) -> Self {
        Self {
            contents: source.to_vec(),
            mutated: false,
            edits: 0,
        }
    }
}

/// Rewrites namespace declarations, imports, qualified names and string
/// literals that resolve to whitelisted namespaces.
pub struct NamespaceRewriter<'a> {
    checker: &'a NamespaceChecker,
}

impl<'a> NamespaceRewriter<'a> {
    /// Create a rewriter sharing `checker`.
    pub fn new(checker: &'a NamespaceChecker) -> Self {
        Self { checker }
    }

    /// Rewrite PHP source.
    ///
    /// Fails only when the source cannot be parsed; the caller then leaves
    /// the file alone.
    pub fn rewrite_source(
        &self,
        parser: &mut PhpParser,
        source: impl AsRef<[u8]>,
        file_path: &str,
    ) -> Result<FileRewrite> {
        let source = source.as_ref();
        let tree = parser.parse_source(source, file_path)?;

        let mut edits = Vec::new();
        let context = self.visit_all(&tree.nodes, TraversalContext::default(), &mut edits);
        debug!(
            "{file_path}: {} edits, {} aliases",
            edits.len(),
            context.aliases.len()
        );

        if edits.is_empty() {
            return Ok(FileRewrite::unchanged(source));
        }

        let contents = apply_edits(source, &edits)?;
        Ok(FileRewrite {
            mutated: contents != source,
            edits: edits.len(),
            contents,
        })
    }

    /// Read, rewrite and post-process one file without writing it.
    ///
    /// `replacements` are literal search/replace pairs applied after the
    /// namespace rewrite.
    pub fn rewrite_file(
        &self,
        parser: &mut PhpParser,
        path: &Path,
        replacements: Option<&ReplacementTable>,
    ) -> Result<FileRewrite> {
        let source = FileReader::read_bytes(path)?;
        let mut rewrite = self
            .rewrite_source(parser, &source, &path.display().to_string())
            .map_err(|err| err.in_file(path))?;

        if let Some(table) = replacements {
            for (search, replace) in table.iter().filter(|(search, _)| !search.is_empty()) {
                let matcher = AhoCorasick::new([search]).map_err(|e| {
                    IsolatorError::internal(format!("Invalid replacement '{search}': {e}"))
                })?;
                if matcher.is_match(&rewrite.contents) {
                    rewrite.contents = matcher.replace_all_bytes(&rewrite.contents, &[replace]);
                }
            }
            rewrite.mutated = rewrite.contents != source;
        }

        Ok(rewrite)
    }

    fn visit_all(
        &self,
        nodes: &[SyntaxNode],
        mut context: TraversalContext,
        edits: &mut Vec<SourceEdit>,
    ) -> TraversalContext {
        for node in nodes {
            context = self.visit(node, context, edits);
        }
        context
    }

    fn visit(
        &self,
        node: &SyntaxNode,
        context: TraversalContext,
        edits: &mut Vec<SourceEdit>,
    ) -> TraversalContext {
        match node {
            SyntaxNode::NamespaceDecl(decl) => self.visit_namespace(decl, context, edits),
            SyntaxNode::Import(import) => self.visit_import(import, context, edits),
            SyntaxNode::StringLiteral(literal) => {
                edits.extend(self.rewrite_string(literal));
                context
            }
            SyntaxNode::QualifiedReference(name) => {
                edits.extend(self.rewrite_reference(name, &context));
                context
            }
            SyntaxNode::Other(children) => self.visit_all(children, context, edits),
        }
    }

    fn visit_namespace(
        &self,
        decl: &NamespaceDecl,
        context: TraversalContext,
        edits: &mut Vec<SourceEdit>,
    ) -> TraversalContext {
        let scope = match &decl.name {
            Some(name) => {
                if let Some(segments) = self.checker.prefix_segments(&name.segments) {
                    edits.push(SourceEdit::replace(
                        name.span.clone(),
                        name.text.clone(),
                        segments.join("\\"),
                    ));
                }
                Namespace::from_segments(name.segments.iter().cloned())
                    .map(Scope::Namespace)
                    .unwrap_or_default()
            }
            None => Scope::Global,
        };

        match &decl.body {
            Some(body) => {
                let outer = context.scope;
                let inner = self.visit_all(
                    body,
                    TraversalContext {
                        scope,
                        aliases: context.aliases,
                    },
                    edits,
                );
                TraversalContext {
                    scope: outer,
                    aliases: inner.aliases,
                }
            }
            None => TraversalContext { scope, ..context },
        }
    }

    fn visit_import(
        &self,
        import: &ImportDecl,
        mut context: TraversalContext,
        edits: &mut Vec<SourceEdit>,
    ) -> TraversalContext {
        match &import.group_prefix {
            Some(prefix) => {
                if let Some(segments) = self.checker.prefix_segments(&prefix.segments) {
                    edits.push(SourceEdit::replace(
                        prefix.span.clone(),
                        prefix.text.clone(),
                        segments.join("\\"),
                    ));
                }
            }
            None => {
                for clause in import.clauses.iter().filter(|c| c.name.is_qualified()) {
                    if let Some(segments) = self.prefixed_name(&clause.name) {
                        edits.push(SourceEdit::replace(
                            clause.name.span.clone(),
                            clause.name.text.clone(),
                            segments.join("\\"),
                        ));
                    }
                }
            }
        }

        for clause in &import.clauses {
            if let Some(alias) = &clause.alias {
                let target = match &import.group_prefix {
                    Some(prefix) => format!(
                        "{}\\{}",
                        prefix.segments.join("\\"),
                        clause.name.segments.join("\\")
                    ),
                    None => clause.name.segments.join("\\"),
                };
                context.aliases.bind(alias.clone(), target);
            }
        }

        context
    }

    fn rewrite_reference(&self, name: &NameRef, context: &TraversalContext) -> Option<SourceEdit> {
        if name.relative || !name.is_qualified() {
            return None;
        }
        if !name.fully_qualified && !context.scope.is_global() {
            return None;
        }
        if context.aliases.is_alias(name.first_segment()) {
            return None;
        }

        let segments = self.prefixed_name(name)?;
        let mut text = segments.join("\\");
        if name.fully_qualified {
            text.insert(0, SEPARATOR);
        }
        Some(SourceEdit::replace(name.span.clone(), name.text.clone(), text))
    }

    fn rewrite_string(&self, literal: &StringLiteral) -> Option<SourceEdit> {
        let value = literal.value();

        let whole = value.contains(SEPARATOR) && {
            let mut candidate = value.clone();
            if !candidate.ends_with(SEPARATOR) {
                candidate.push(SEPARATOR);
            }
            self.checker.should_transform(&candidate)
        };

        let matched = whole || {
            let namespace = match value.rfind(SEPARATOR) {
                Some(last) => &value[..last],
                None => "",
            };
            self.checker
                .should_transform(&format!("{}\\", trim_separators(namespace)))
        };

        matched.then(|| {
            SourceEdit::insert(
                literal.insertion_offset(),
                literal.encode_namespace_prefix(self.checker.prefix()),
            )
        })
    }

    /// Prefix the namespace part of `name` and put the last segment back.
    fn prefixed_name(&self, name: &NameRef) -> Option<Vec<String>> {
        let mut segments = self.checker.prefix_segments(name.namespace_part())?;
        segments.push(name.last_segment().to_string());
        Some(segments)
    }
}
