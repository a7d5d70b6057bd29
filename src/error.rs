//! Error types for logscope operations.
//!
//! This module provides the error hierarchy using `thiserror` for the
//! message source, the feed and export engines, file output, and CLI
//! commands. Every error is recoverable by invoking the failed operation
//! again; nothing here is fatal to a viewer session.

use thiserror::Error;

/// Result type alias for logscope operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    /// A page fetch against the message source failed.
    ///
    /// Surfaced unchanged from the source; never retried by the engine.
    #[error("fetch failed: {cause}")]
    FetchFailed {
        /// The error reported by the source.
        cause: SourceError,
    },

    /// Export serialization errors.
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// I/O errors (file operations).
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// CLI command errors.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// An operation was invoked in a state that does not permit it.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Description of the invalid state.
        message: String,
    },

    /// Configuration errors.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

impl Error {
    /// Builds an [`Error::Config`] from any displayable message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Builds an [`Error::InvalidState`] from any displayable message.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Returns `true` if this error came from the message source.
    #[must_use]
    pub const fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::FetchFailed { .. })
    }
}

/// Errors reported by a message source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Database connection or query error.
    #[error("database error: {0}")]
    Database(String),

    /// The store has no `messages` table.
    #[error("message store not initialized: no `messages` table")]
    NotInitialized,

    /// A row could not be decoded into a message.
    #[error("cannot decode column `{column}`: {reason}")]
    Decode {
        /// Column that failed to decode.
        column: String,
        /// Reason for failure.
        reason: String,
    },

    /// The source could not be reached.
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// Export-specific errors.
#[derive(Error, Debug)]
pub enum ExportError {
    /// JSON or CSV encoding failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A record did not serialize to a JSON object and has no field names.
    #[error("record {index} is not a flat record")]
    NotARecord {
        /// Position of the record in the export buffer.
        index: usize,
    },
}

/// I/O-specific errors for file operations.
#[derive(Error, Debug)]
pub enum IoError {
    /// Failed to write file.
    #[error("failed to write file: {path}: {reason}")]
    WriteFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Directory creation error.
    #[error("failed to create directory: {path}: {reason}")]
    DirectoryFailed {
        /// Path to the directory.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Generic I/O error wrapper.
    #[error("I/O error: {0}")]
    Generic(String),
}

/// CLI command-specific errors.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Invalid argument provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Missing required argument.
    #[error("missing required argument: {0}")]
    MissingArgument(String),
}

impl From<SourceError> for Error {
    fn from(cause: SourceError) -> Self {
        Self::FetchFailed { cause }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(IoError::Generic(err.to_string()))
    }
}

impl From<rusqlite::Error> for SourceError {
    fn from(err: rusqlite::Error) -> Self {
        let message = err.to_string();
        if message.contains("no such table") {
            Self::NotInitialized
        } else {
            Self::Database(message)
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        SourceError::from(err).into()
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_state("load already in flight");
        assert_eq!(err.to_string(), "invalid state: load already in flight");
    }

    #[test]
    fn test_fetch_failed_display() {
        let err: Error = SourceError::Unavailable("connection reset".to_string()).into();
        assert!(err.is_fetch_failure());
        assert_eq!(
            err.to_string(),
            "fetch failed: source unavailable: connection reset"
        );
    }

    #[test]
    fn test_source_error_variants() {
        let err = SourceError::Database("locked".to_string());
        assert!(err.to_string().contains("locked"));

        let err = SourceError::NotInitialized;
        assert!(err.to_string().contains("messages"));

        let err = SourceError::Decode {
            column: "created_at".to_string(),
            reason: "bad timestamp".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "cannot decode column `created_at`: bad timestamp"
        );
    }

    #[test]
    fn test_error_config() {
        let err = Error::config("page size must be positive");
        assert_eq!(
            err.to_string(),
            "configuration error: page size must be positive"
        );
        assert!(!err.is_fetch_failure());
    }

    #[test]
    fn test_io_error_variants() {
        let err = IoError::WriteFailed {
            path: "/tmp/out.csv".to_string(),
            reason: "disk full".to_string(),
        };
        assert!(err.to_string().contains("disk full"));

        let err = IoError::DirectoryFailed {
            path: "/tmp/dir".to_string(),
            reason: "exists".to_string(),
        };
        assert!(err.to_string().contains("directory"));
    }

    #[test]
    fn test_command_error_variants() {
        let err = CommandError::MissingArgument("--to".to_string());
        assert_eq!(err.to_string(), "missing required argument: --to");

        let err = CommandError::InvalidArgument("--from".to_string());
        assert!(err.to_string().contains("invalid argument"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_rusqlite_error_to_error() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: Error = rusqlite_err.into();
        assert!(matches!(
            err,
            Error::FetchFailed {
                cause: SourceError::Database(_)
            }
        ));
    }

    #[test]
    fn test_from_serde_json_error_to_export_error() {
        let json_err: serde_json::Error = serde_json::from_str::<i32>("invalid").unwrap_err();
        let err: ExportError = json_err.into();
        assert!(matches!(err, ExportError::Serialization(_)));
    }
}
