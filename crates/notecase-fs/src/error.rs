//! Error types for filesystem storage

use std::path::PathBuf;

use notecase_core::{StorageError, StorageResult};
use thiserror::Error;
use tracing::{error, warn};

/// Filesystem storage error type
#[derive(Error, Debug)]
pub enum FsError {
    /// I/O failure on a specific path
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Root directory missing or unusable
    #[error("Storage root unavailable: {0}")]
    Root(String),

    /// Directory walk failed
    #[error("Scan failed: {0}")]
    Walk(#[from] walkdir::Error),

    /// Trash manifest could not be read or written
    #[error("Trash manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    /// Error raised by the shared core helpers or the codec
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for filesystem operations
pub type FsResult<T> = Result<T, FsError>;

impl FsError {
    /// Wrap an `io::Error` with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<FsError> for StorageError {
    fn from(err: FsError) -> Self {
        let message = err.to_string();
        match err {
            FsError::Io { path, source } if source.kind() == std::io::ErrorKind::NotFound => {
                Self::NotFound(path.display().to_string())
            }
            FsError::Io { .. } | FsError::Walk(_) => Self::Io(message),
            FsError::Root(msg) => Self::StorageAccess(msg),
            FsError::Manifest(e) => Self::Serialization(e.to_string()),
            FsError::Storage(inner) => inner,
        }
    }
}

/// Convert at the DAO boundary, logging the failure once
pub(crate) fn at_boundary<T>(operation: &str, id: &str, result: FsResult<T>) -> StorageResult<T> {
    result.map_err(|e| {
        let err = StorageError::from(e);
        if err.is_not_found() || err.is_caller_error() || matches!(err, StorageError::Conflict(_)) {
            warn!(operation, id, error = %err, "Storage operation rejected");
        } else {
            error!(operation, id, error = %err, "Storage operation failed");
        }
        err
    })
}
