//! Factory utilities for the tree-sitter grammars in use.

use tree_sitter::Language;

use crate::core::errors::{IsolatorError, Result};

/// Get tree-sitter language for a given language key
pub fn get_tree_sitter_language(language_key: &str) -> Result<Language> {
    match normalize_language_key(language_key) {
        Some("php") => Ok(tree_sitter_php::LANGUAGE_PHP.into()),
        _ => Err(IsolatorError::parse(
            language_key,
            format!("No tree-sitter grammar for: {language_key}"),
        )),
    }
}

/// Create a new parser for the given language
pub fn create_parser_for_language(language_key: &str) -> Result<tree_sitter::Parser> {
    let mut parser = tree_sitter::Parser::new();
    let tree_sitter_language = get_tree_sitter_language(language_key)?;
    parser.set_language(&tree_sitter_language).map_err(|e| {
        IsolatorError::parse(language_key, format!("Failed to set parser language: {e}"))
    })?;
    Ok(parser)
}

/// Normalizes a language identifier to its canonical key.
fn normalize_language_key(language: &str) -> Option<&'static str> {
    match language.to_ascii_lowercase().as_str() {
        "php" | "phtml" | "inc" => Some("php"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_creation() {
        assert!(create_parser_for_language("php").is_ok());
        assert!(create_parser_for_language("PHP").is_ok());
        assert!(create_parser_for_language("phtml").is_ok());
    }

    #[test]
    fn test_unknown_language_is_parse_error() {
        let err = get_tree_sitter_language("cobol").unwrap_err();
        assert!(matches!(err, IsolatorError::Parse { ref language, .. } if language == "cobol"));
    }
}
