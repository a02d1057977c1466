//! Error types for snapshot-dao

use std::fmt;
use thiserror::Error;

use crate::config::ConfigError;

/// Storage error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Template misuse (duplicate slot, unknown column, change after freeze)
    Definition,
    /// Parameter name never registered on the template
    UnknownParameter,
    /// Required slot left unbound at execution time
    UnboundParameter,
    /// Bound value incompatible with the slot's column
    TypeMismatch,
    /// Store could not be reached (retryable)
    StorageUnavailable,
    /// Single-result query matched more than one row
    MultipleResults,
    /// Other database errors
    Database,
    /// Configuration errors
    Config,
    /// I/O errors
    IO,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Definition => "definition",
            ErrorKind::UnknownParameter => "unknown_parameter",
            ErrorKind::UnboundParameter => "unbound_parameter",
            ErrorKind::TypeMismatch => "type_mismatch",
            ErrorKind::StorageUnavailable => "storage_unavailable",
            ErrorKind::MultipleResults => "multiple_results",
            ErrorKind::Database => "database",
            ErrorKind::Config => "config",
            ErrorKind::IO => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Storage error type
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct StorageError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl StorageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Whether the caller may retry the same call later
    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::StorageUnavailable
    }

    // Convenience constructors
    pub fn definition(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Definition, message)
    }

    pub fn unknown_parameter(template: &str, name: &str) -> Self {
        Self::new(
            ErrorKind::UnknownParameter,
            format!("Template '{}' has no parameter '{}'", template, name),
        )
    }

    pub fn unbound_parameter(template: &str, name: &str) -> Self {
        Self::new(
            ErrorKind::UnboundParameter,
            format!("Template '{}' requires parameter '{}'", template, name),
        )
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch, message)
    }

    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StorageUnavailable, message)
    }

    pub fn multiple_results(template: &str) -> Self {
        Self::new(
            ErrorKind::MultipleResults,
            format!("Template '{}' matched more than one row", template),
        )
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }
}

// SQLite error conversions
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        let unavailable = matches!(
            err.sqlite_error_code(),
            Some(
                rusqlite::ErrorCode::DatabaseBusy
                    | rusqlite::ErrorCode::DatabaseLocked
                    | rusqlite::ErrorCode::CannotOpen
                    | rusqlite::ErrorCode::SystemIoFailure
            )
        );
        if unavailable {
            StorageError::storage_unavailable(format!("SQLite unavailable: {}", err)).with_source(err)
        } else {
            StorageError::database(format!("SQLite error: {}", err)).with_source(err)
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::new(ErrorKind::IO, format!("IO error: {}", err)).with_source(err)
    }
}

impl From<ConfigError> for StorageError {
    fn from(err: ConfigError) -> Self {
        StorageError::config(err.to_string()).with_source(err)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StorageError>;
