//! Storage Error Types
//!
//! Every DAO operation returns [`StorageResult`]. Backends convert their own
//! errors into [`StorageError`] at the trait boundary so callers only ever
//! match on one taxonomy.

use notecase_config::ConfigError;
use thiserror::Error;

/// Error type for storage operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Unsupported backend selector or unusable configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Argument rejected before any I/O
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Entity does not exist (or no longer exists)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(String),

    /// Relational store failure (the transaction was rolled back)
    #[error("Database error: {0}")]
    Database(String),

    /// Frontmatter or row data could not be encoded/decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Operation not meaningful for this entity kind
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Write would violate a uniqueness constraint
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage could not be initialized at all
    #[error("Storage access error: {0}")]
    StorageAccess(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// Create an invalid-parameter error
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create a not-found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create an unsupported-operation error
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        Self::UnsupportedOperation(msg.into())
    }

    /// Whether the entity was simply absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether retrying the same call might succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Database(_))
    }

    /// Whether the caller passed something unusable
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter(_) | Self::UnsupportedOperation(_) | Self::Configuration(_)
        )
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<ConfigError> for StorageError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<serde_yaml::Error> for StorageError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(StorageError::not_found("note:1").is_not_found());
        assert!(!StorageError::invalid("empty id").is_not_found());

        assert!(StorageError::Io("disk full".to_string()).is_retryable());
        assert!(StorageError::Database("locked".to_string()).is_retryable());
        assert!(!StorageError::Conflict("tag".to_string()).is_retryable());

        assert!(StorageError::unsupported("child of note").is_caller_error());
        assert!(!StorageError::StorageAccess("root".to_string()).is_caller_error());
    }

    #[test]
    fn test_config_error_maps_to_configuration() {
        let err: StorageError = ConfigError::Validation("bad backend".to_string()).into();
        assert!(matches!(err, StorageError::Configuration(ref m) if m.contains("bad backend")));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err: StorageError = io.into();
        assert_eq!(err, StorageError::Io("nope".to_string()));
    }
}
