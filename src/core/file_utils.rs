//! File utilities for reading PHP sources and writing rewritten ones.
//!
//! Files are only ever written when their content changed, so unrelated files
//! keep their bytes and modification times.

use std::fs;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::core::errors::{IsolatorError, Result};

/// The PHP open tag that marks extensionless executables as source.
const OPEN_TAG: &[u8] = b"<?php";

/// Bytes sampled when sniffing an extensionless file.
const SNIFF_LEN: usize = 512;

/// Safe file reading and writing for PHP sources
pub struct FileReader;

impl FileReader {
    /// Read a source file as raw bytes.
    ///
    /// PHP sources are not required to be UTF-8, so rewrites work on bytes
    /// and leave any legacy encoding untouched.
    pub fn read_bytes(file_path: &Path) -> Result<Vec<u8>> {
        fs::read(file_path).map_err(|e| {
            IsolatorError::io(format!("Failed to read file: {}", file_path.display()), e)
        })
    }

    /// Read a UTF-8 text file such as a JSON manifest.
    pub fn read_to_string(file_path: &Path) -> Result<String> {
        fs::read_to_string(file_path).map_err(|e| {
            IsolatorError::io(format!("Failed to read file: {}", file_path.display()), e)
        })
    }

    /// Write `contents` only if it differs from what is on disk.
    ///
    /// Returns whether a write happened.
    pub fn write_if_changed(file_path: &Path, contents: impl AsRef<[u8]>) -> Result<bool> {
        let contents = contents.as_ref();
        if let Ok(existing) = fs::read(file_path) {
            if existing == contents {
                return Ok(false);
            }
        }
        fs::write(file_path, contents).map_err(|e| {
            IsolatorError::io(format!("Failed to write file: {}", file_path.display()), e)
        })?;
        debug!("Rewrote {}", file_path.display());
        Ok(true)
    }

    /// Does an extensionless file start with the PHP open tag?
    ///
    /// A leading `#!` shebang line is skipped, since that is how PHP
    /// executables shipped in `bin/` directories usually start.
    pub fn starts_with_open_tag(file_path: &Path) -> Result<bool> {
        let file = fs::File::open(file_path).map_err(|e| {
            IsolatorError::io(format!("Failed to open file: {}", file_path.display()), e)
        })?;
        let mut buffer = Vec::with_capacity(SNIFF_LEN);
        file.take(SNIFF_LEN as u64)
            .read_to_end(&mut buffer)
            .map_err(|e| {
                IsolatorError::io(format!("Failed to sample file: {}", file_path.display()), e)
            })?;

        let mut head = buffer.as_slice();
        if head.starts_with(b"#!") {
            head = match head.iter().position(|&b| b == b'\n') {
                Some(newline) => &head[newline + 1..],
                None => return Ok(false),
            };
        }

        Ok(head.len() >= OPEN_TAG.len() && head[..OPEN_TAG.len()].eq_ignore_ascii_case(OPEN_TAG))
    }

    /// Is this a PHP source file under the given extension list?
    pub fn is_php_source(file_path: &Path, extensions: &[String]) -> bool {
        match file_path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => extensions
                .iter()
                .any(|candidate| candidate.trim_start_matches('.').eq_ignore_ascii_case(ext)),
            None => match Self::starts_with_open_tag(file_path) {
                Ok(is_php) => is_php,
                Err(err) => {
                    warn!("Skipping unreadable file {}: {err}", file_path.display());
                    false
                }
            },
        }
    }
}

/// Lexically resolve `.` and `..` components without touching the filesystem.
///
/// Composer records install paths relative to `vendor/composer`, so they
/// usually contain a `..` that would otherwise leak into reported paths.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let last_is_normal = matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                );
                if last_is_normal {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Collect every PHP source file below `root`, sorted for stable output.
pub fn collect_php_files(root: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("Failed to walk directory: {err}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| FileReader::is_php_source(path, extensions))
        .collect();
    files.sort();
    files
}
