//! Error types for SQLite storage

use notecase_core::StorageError;
use rusqlite::ErrorCode;
use thiserror::Error;

/// SQLite storage error type
#[derive(Error, Debug)]
pub enum SqliteError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Schema/migration error
    #[error("Schema error: {0}")]
    Schema(String),

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Argument or relationship rejected
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Uniqueness violation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Stored value could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error raised by the shared core helpers
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Underlying rusqlite error
    #[error("SQLite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

/// Result type for SQLite operations
pub type SqliteResult<T> = Result<T, SqliteError>;

impl SqliteError {
    pub(crate) fn not_found(what: &str, id: &str) -> Self {
        Self::NotFound(format!("{what} '{id}'"))
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

impl From<SqliteError> for StorageError {
    fn from(err: SqliteError) -> Self {
        match err {
            SqliteError::Connection(msg) => Self::StorageAccess(msg),
            SqliteError::Schema(msg) => Self::Database(msg),
            SqliteError::NotFound(msg) => Self::NotFound(msg),
            SqliteError::InvalidOperation(msg) => Self::InvalidParameter(msg),
            SqliteError::Conflict(msg) => Self::Conflict(msg),
            SqliteError::Serialization(msg) => Self::Serialization(msg),
            SqliteError::Storage(inner) => inner,
            SqliteError::Rusqlite(e) if is_unique_violation(&e) => Self::Conflict(e.to_string()),
            SqliteError::Rusqlite(e) => Self::Database(e.to_string()),
        }
    }
}
