//! Error types for the vendor-isolator library.
//!
//! Configuration problems are fatal for a run. Parse, relocation and write
//! failures are scoped to one file or one package: the engine logs them,
//! records them in the report and carries on with the rest of the tree.

use std::io;
use std::path::Path;

use thiserror::Error;

/// Main result type for isolation operations.
pub type Result<T> = std::result::Result<T, IsolatorError>;

/// Error type for all isolation operations.
#[derive(Error, Debug)]
pub enum IsolatorError {
    /// I/O related errors (reading sources, writing rewritten files)
    #[error("I/O error: {message}")]
    Io {
        /// Human-readable error message
        message: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        /// Error description
        message: String,
        /// Configuration field that caused the error
        field: Option<String>,
    },

    /// Parsing errors
    #[error("Parse error in {language}: {message}")]
    Parse {
        /// Language being parsed
        language: String,
        /// Error description
        message: String,
        /// File path where error occurred
        file_path: Option<String>,
        /// Line number (1-based, if available)
        line: Option<usize>,
        /// Column number (1-based, if available)
        column: Option<usize>,
    },

    /// Directory relocation errors
    #[error("Relocation error at '{path}': {message}")]
    Relocation {
        /// Path being moved when the failure happened
        path: String,
        /// Error description
        message: String,
        /// Underlying I/O error
        #[source]
        source: Option<io::Error>,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error description
        message: String,
        /// Data type being serialized
        data_type: Option<String>,
        /// Underlying serialization error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Validation errors for input data
    #[error("Validation error: {message}")]
    Validation {
        /// Error description
        message: String,
        /// Field or input that failed validation
        field: Option<String>,
    },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal {
        /// Error description
        message: String,
        /// Additional context
        context: Option<String>,
    },
}

impl IsolatorError {
    /// Create a new I/O error with context
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new configuration error with field context
    pub fn config_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new parse error
    pub fn parse(language: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            language: language.into(),
            message: message.into(),
            file_path: None,
            line: None,
            column: None,
        }
    }

    /// Create a new parse error with file context
    pub fn parse_with_location(
        language: impl Into<String>,
        message: impl Into<String>,
        file_path: impl Into<String>,
        line: Option<usize>,
        column: Option<usize>,
    ) -> Self {
        Self::Parse {
            language: language.into(),
            message: message.into(),
            file_path: Some(file_path.into()),
            line,
            column,
        }
    }

    /// Create a new relocation error caused by a failed filesystem call
    pub fn relocation(path: &Path, message: impl Into<String>, source: io::Error) -> Self {
        Self::Relocation {
            path: path.display().to_string(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a new relocation error without an underlying I/O error
    pub fn relocation_state(path: &Path, message: impl Into<String>) -> Self {
        Self::Relocation {
            path: path.display().to_string(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            context: None,
        }
    }

    /// Attach a file path to a parse error that does not carry one yet
    pub fn in_file(mut self, path: &Path) -> Self {
        if let Self::Parse { file_path, .. } = &mut self {
            if file_path.is_none() {
                *file_path = Some(path.display().to_string());
            }
        }
        self
    }

    /// Add context to an existing error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        match &mut self {
            Self::Internal { context: ctx, .. } => {
                *ctx = Some(context.into());
            }
            Self::Io { message, .. } => {
                *message = format!("{}: {message}", context.into());
            }
            _ => {}
        }
        self
    }

    /// True for errors that must abort the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::Validation { .. })
    }
}

impl From<io::Error> for IsolatorError {
    fn from(err: io::Error) -> Self {
        Self::io("I/O operation failed", err)
    }
}

impl From<serde_json::Error> for IsolatorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: format!("JSON serialization failed: {err}"),
            data_type: Some("JSON".to_string()),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_yaml::Error> for IsolatorError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: format!("YAML serialization failed: {err}"),
            data_type: Some("YAML".to_string()),
            source: Some(Box::new(err)),
        }
    }
}

/// Result extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Add static context to an error result
    fn context(self, msg: &'static str) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<IsolatorError>,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }

    fn context(self, msg: &'static str) -> Result<T> {
        self.map_err(|e| e.into().with_context(msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_error_creation() {
        let err = IsolatorError::config("Invalid configuration");
        assert!(matches!(err, IsolatorError::Config { .. }));

        let err = IsolatorError::parse("php", "Syntax error");
        assert!(matches!(err, IsolatorError::Parse { .. }));
    }

    #[test]
    fn test_config_field_error() {
        let err = IsolatorError::config_field("Prefix must be a valid namespace", "prefix");

        if let IsolatorError::Config { message, field } = err {
            assert_eq!(message, "Prefix must be a valid namespace");
            assert_eq!(field, Some("prefix".to_string()));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_in_file_only_fills_missing_path() {
        let err = IsolatorError::parse("php", "unexpected token").in_file(&PathBuf::from("a.php"));
        let err = err.in_file(&PathBuf::from("b.php"));

        if let IsolatorError::Parse { file_path, .. } = err {
            assert_eq!(file_path, Some("a.php".to_string()));
        } else {
            panic!("Expected Parse error");
        }
    }

    #[test]
    fn test_relocation_error_display() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "Access denied");
        let err = IsolatorError::relocation(&PathBuf::from("/vendor/pkg/lib"), "rename failed", io_err);
        let display = err.to_string();

        assert!(display.contains("/vendor/pkg/lib"));
        assert!(display.contains("rename failed"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_result_ext_prefixes_io_message() {
        let result: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::NotFound, "missing"));

        let err = result
            .with_context(|| "reading installed.json".to_string())
            .unwrap_err();

        if let IsolatorError::Io { message, .. } = err {
            assert!(message.starts_with("reading installed.json"));
        } else {
            panic!("Expected Io error");
        }
    }

    #[test]
    fn test_fatal_classification() {
        assert!(IsolatorError::config("no prefix").is_fatal());
        assert!(!IsolatorError::parse("php", "bad").is_fatal());
        assert!(!IsolatorError::relocation_state(&PathBuf::from("x"), "stale").is_fatal());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<i32>("invalid json").unwrap_err();
        let err: IsolatorError = json_err.into();

        if let IsolatorError::Serialization { data_type, .. } = err {
            assert_eq!(data_type, Some("JSON".to_string()));
        } else {
            panic!("Expected Serialization error");
        }
    }

    #[test]
    fn test_from_yaml_error() {
        let yaml_err = serde_yaml::from_str::<i32>("invalid: yaml: content").unwrap_err();
        let err: IsolatorError = yaml_err.into();

        assert!(matches!(err, IsolatorError::Serialization { .. }));
    }
}
