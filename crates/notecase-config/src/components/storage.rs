//! Storage component configuration
//!
//! Selects the backend and carries the options each backend needs to open.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::{ConfigError, ConfigResult};

/// Which storage substrate holds the notes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Relational store (SQLite)
    #[default]
    Sqlite,
    /// Directory tree of Markdown files
    #[serde(alias = "fs")]
    FileSystem,
}

impl BackendKind {
    /// Canonical selector string
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Sqlite => "sqlite",
            BackendKind::FileSystem => "filesystem",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sql" => Ok(BackendKind::Sqlite),
            "filesystem" | "fs" | "files" => Ok(BackendKind::FileSystem),
            other => Err(ConfigError::Validation(format!(
                "unsupported storage backend '{other}' (expected 'sqlite' or 'filesystem')"
            ))),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Active backend
    pub backend: BackendKind,
    /// Options for the SQLite backend
    pub sqlite: SqliteConfig,
    /// Options for the filesystem backend
    pub filesystem: FileSystemConfig,
}

impl StorageConfig {
    /// SQLite-backed configuration at `path`
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendKind::Sqlite,
            sqlite: SqliteConfig::new(path),
            ..Default::default()
        }
    }

    /// Filesystem-backed configuration rooted at `root`
    pub fn filesystem(root: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendKind::FileSystem,
            filesystem: FileSystemConfig::new(root),
            ..Default::default()
        }
    }

    /// Validate the options of the active backend
    pub fn validate(&self) -> ConfigResult<()> {
        match self.backend {
            BackendKind::Sqlite => self.sqlite.validate(),
            BackendKind::FileSystem => self.filesystem.validate(),
        }
    }
}

/// SQLite connection options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SqliteConfig {
    /// Database file, or `:memory:`
    pub path: PathBuf,
    /// Enable write-ahead logging
    pub wal_mode: bool,
    /// Enforce foreign keys
    pub foreign_keys: bool,
    /// Busy timeout in milliseconds
    pub busy_timeout_ms: u32,
    /// Page cache size (negative = KiB, per SQLite)
    pub cache_size: i64,
}

impl SqliteConfig {
    /// File-backed database at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// In-memory database (tests)
    pub fn memory() -> Self {
        Self {
            path: PathBuf::from(":memory:"),
            wal_mode: false,
            ..Default::default()
        }
    }

    /// Whether this points at an in-memory database
    pub fn is_memory(&self) -> bool {
        self.path.to_str() == Some(":memory:")
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "storage.sqlite.path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./notecase.db"),
            wal_mode: true,
            foreign_keys: true,
            busy_timeout_ms: 5000,
            cache_size: -8000,
        }
    }
}

/// Filesystem backend options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileSystemConfig {
    /// Root directory holding folders and notes
    pub root: PathBuf,
    /// Create the root directory when it does not exist
    pub create_if_missing: bool,
    /// Name of the trash directory under the root (must be dot-prefixed)
    pub trash_dir: String,
}

impl FileSystemConfig {
    /// Root at `root` with default options
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.root.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "storage.filesystem.root must not be empty".to_string(),
            ));
        }
        if !self.trash_dir.starts_with('.') || self.trash_dir.len() < 2 {
            return Err(ConfigError::Validation(format!(
                "storage.filesystem.trash_dir '{}' must start with '.' so it stays hidden from listings",
                self.trash_dir
            )));
        }
        if self.trash_dir.contains(['/', '\\']) {
            return Err(ConfigError::Validation(format!(
                "storage.filesystem.trash_dir '{}' must be a single directory name",
                self.trash_dir
            )));
        }
        Ok(())
    }
}

impl Default for FileSystemConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./notes"),
            create_if_missing: true,
            trash_dir: ".trash".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("sqlite".parse::<BackendKind>().unwrap(), BackendKind::Sqlite);
        assert_eq!("SQL".parse::<BackendKind>().unwrap(), BackendKind::Sqlite);
        assert_eq!("fs".parse::<BackendKind>().unwrap(), BackendKind::FileSystem);
        assert_eq!(
            " filesystem ".parse::<BackendKind>().unwrap(),
            BackendKind::FileSystem
        );

        let err = "postgres".parse::<BackendKind>().unwrap_err();
        assert!(err.to_string().contains("postgres"));
    }

    #[test]
    fn test_trash_dir_must_be_hidden() {
        let mut config = StorageConfig::filesystem("/tmp/notes");
        assert!(config.validate().is_ok());

        config.filesystem.trash_dir = "trash".to_string();
        assert!(config.validate().is_err());

        config.filesystem.trash_dir = ".a/b".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_memory_sqlite() {
        assert!(SqliteConfig::memory().is_memory());
        assert!(!SqliteConfig::default().is_memory());
    }
}
