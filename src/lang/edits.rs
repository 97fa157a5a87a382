//! Byte-span source edits.
//!
//! Every rewrite in this crate is expressed as a replacement of one byte range
//! in the original bytes. Each edit carries the text it expects to replace, so
//! a stale edit is rejected instead of corrupting the file. Everything outside
//! the edited spans is copied through byte for byte, whatever its encoding.

use std::ops::Range;

use crate::core::errors::{IsolatorError, Result};

/// One replacement of a byte range in a source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEdit {
    /// Byte range in the original text
    pub range: Range<usize>,
    /// Text currently occupying `range`
    pub expected: String,
    /// Text to put in its place
    pub replacement: String,
}

impl SourceEdit {
    /// Replace `range` (currently holding `expected`) with `replacement`.
    pub fn replace(
        range: Range<usize>,
        expected: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            range,
            expected: expected.into(),
            replacement: replacement.into(),
        }
    }

    /// Insert `text` at byte offset `at`.
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            range: at..at,
            expected: String::new(),
            replacement: text.into(),
        }
    }

    /// True if the edit changes nothing.
    pub fn is_noop(&self) -> bool {
        self.expected == self.replacement
    }
}

/// Apply a set of edits to `source`.
///
/// Edits may be given in any order but must not overlap. Two insertions at
/// the same offset are applied in the order given.
pub fn apply_edits(source: &[u8], edits: &[SourceEdit]) -> Result<Vec<u8>> {
    let mut ordered: Vec<&SourceEdit> = edits.iter().filter(|edit| !edit.is_noop()).collect();
    ordered.sort_by_key(|edit| (edit.range.start, edit.range.end));

    let mut output = Vec::with_capacity(source.len() + 64);
    let mut cursor = 0;

    for edit in ordered {
        let Range { start, end } = edit.range.clone();
        if start < cursor {
            return Err(IsolatorError::internal(format!(
                "Overlapping edits at byte {start}"
            )));
        }
        let current = source.get(start..end).ok_or_else(|| {
            IsolatorError::internal(format!("Edit range {start}..{end} is outside the source"))
        })?;
        if current != edit.expected.as_bytes() {
            return Err(IsolatorError::internal(format!(
                "Edit at {start}..{end} expected '{}' but found '{}'",
                edit.expected,
                String::from_utf8_lossy(current)
            )));
        }

        output.extend_from_slice(&source[cursor..start]);
        output.extend_from_slice(edit.replacement.as_bytes());
        cursor = end;
    }

    output.extend_from_slice(&source[cursor..]);
    Ok(output)
}
