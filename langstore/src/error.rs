//! All error types for the langstore crate.
//!
//! These are returned from all fallible operations (parsing, serialization,
//! reconciliation, write-back). Non-fatal per-unit issues are not errors;
//! they accumulate as [`crate::traits::Warning`] values in the reports.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown format `{0}`")]
    UnknownFormat(String),

    #[error("malformed input{}: {message}", fmt_line(.line))]
    Malformed {
        line: Option<usize>,
        message: String,
    },

    #[error("cannot decode input as {label}: {message}")]
    Encoding { label: String, message: String },

    #[error("unit `{context}` is read-only")]
    ReadOnly { context: String },

    #[error("stale content for {}: expected hash {expected}, found {found}", path.display())]
    Conflict {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("invalid catalog data: {0}")]
    Mismatch(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn fmt_line(line: &Option<usize>) -> String {
    match line {
        Some(n) => format!(" at line {n}"),
        None => String::new(),
    }
}

impl Error {
    /// Creates a malformed-input error, with a 1-based line number when known.
    pub fn malformed(line: impl Into<Option<usize>>, message: impl Into<String>) -> Self {
        Error::Malformed {
            line: line.into(),
            message: message.into(),
        }
    }

    /// Creates an encoding error for the given encoding label.
    pub fn encoding(label: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Encoding {
            label: label.into(),
            message: message.into(),
        }
    }

    /// Creates a model-consistency error.
    pub fn mismatch(message: impl Into<String>) -> Self {
        Error::Mismatch(message.into())
    }

    /// Creates an unsupported-operation error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Error::Unsupported(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_unknown_format_error() {
        let error = Error::UnknownFormat("invalid_format".to_string());
        assert_eq!(error.to_string(), "unknown format `invalid_format`");
    }

    #[test]
    fn test_malformed_with_line() {
        let error = Error::malformed(12, "unterminated string");
        assert_eq!(
            error.to_string(),
            "malformed input at line 12: unterminated string"
        );
    }

    #[test]
    fn test_malformed_without_line() {
        let error = Error::malformed(None, "truncated document");
        assert_eq!(error.to_string(), "malformed input: truncated document");
    }

    #[test]
    fn test_encoding_error() {
        let error = Error::encoding("UTF-8", "invalid byte at offset 7");
        assert_eq!(
            error.to_string(),
            "cannot decode input as UTF-8: invalid byte at offset 7"
        );
    }

    #[test]
    fn test_read_only_error() {
        let error = Error::ReadOnly {
            context: "app.version".to_string(),
        };
        assert_eq!(error.to_string(), "unit `app.version` is read-only");
    }

    #[test]
    fn test_conflict_error() {
        let error = Error::Conflict {
            path: PathBuf::from("po/cs.po"),
            expected: "ab12".to_string(),
            found: "cd34".to_string(),
        };
        assert!(error.to_string().contains("po/cs.po"));
        assert!(error.to_string().contains("ab12"));
        assert!(error.to_string().contains("cd34"));
    }

    #[test]
    fn test_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = Error::Io(io_error);
        assert!(error.to_string().contains("I/O error"));
    }

    #[test]
    fn test_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{ invalid json }").unwrap_err();
        let error = Error::Json(json_error);
        assert!(error.to_string().contains("JSON parse error"));
    }

    #[test]
    fn test_mismatch_error() {
        let error = Error::mismatch("plural target on singular unit");
        assert_eq!(
            error.to_string(),
            "invalid catalog data: plural target on singular unit"
        );
    }

    #[test]
    fn test_unsupported_error() {
        let error = Error::unsupported("obsolete entries in strings.xml");
        assert!(error.to_string().contains("unsupported operation"));
    }

    #[test]
    fn test_error_debug() {
        let error = Error::UnknownFormat("test".to_string());
        let debug = format!("{:?}", error);
        assert!(debug.contains("UnknownFormat"));
        assert!(debug.contains("test"));
    }
}
