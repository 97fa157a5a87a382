//! Language-specific parsing and source editing.

pub mod edits;
pub mod php;
pub mod registry;
pub mod syntax;

pub use edits::{apply_edits, SourceEdit};
pub use php::PhpParser;
pub use registry::{create_parser_for_language, get_tree_sitter_language};
pub use syntax::{
    ImportClause, ImportDecl, NameRef, NamespaceDecl, QuoteStyle, StringLiteral, SyntaxNode,
    SyntaxTree,
};
