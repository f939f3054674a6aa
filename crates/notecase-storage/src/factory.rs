//! Storage factory - wires one backend's DAO triad
//!
//! The three DAOs of a [`DaoSet`] share their backend state: one
//! [`SqlitePool`] or one [`FsStore`] with its caches.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use notecase_config::{BackendKind, StorageConfig};
use notecase_core::{FolderDao, NoteDao, StorageError, StorageResult, TagDao};
use notecase_fs::{FsFolderDao, FsNoteDao, FsStore, FsTagDao};
use notecase_sqlite::{SqliteFolderDao, SqliteNoteDao, SqlitePool, SqliteTagDao};
use tracing::info;

/// What a backend needs to start
pub enum BackendInit {
    /// An already-open pool; the caller owns its lifecycle
    Sqlite(SqlitePool),
    /// Root directory of the note tree
    FileSystem(PathBuf),
}

impl BackendInit {
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendInit::Sqlite(_) => BackendKind::Sqlite,
            BackendInit::FileSystem(_) => BackendKind::FileSystem,
        }
    }
}

impl fmt::Debug for BackendInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendInit::Sqlite(_) => f.write_str("BackendInit::Sqlite(..)"),
            BackendInit::FileSystem(root) => f.debug_tuple("BackendInit::FileSystem").field(root).finish(),
        }
    }
}

/// The DAO triad of one backend
#[derive(Clone)]
pub struct DaoSet {
    pub kind: BackendKind,
    pub notes: Arc<dyn NoteDao>,
    pub folders: Arc<dyn FolderDao>,
    pub tags: Arc<dyn TagDao>,
}

impl fmt::Debug for DaoSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DaoSet").field("kind", &self.kind).finish_non_exhaustive()
    }
}

/// Backend selection
pub struct StorageFactory;

impl StorageFactory {
    /// Build the DAOs for `kind` from `init`; the two must agree
    pub fn create(kind: BackendKind, init: BackendInit) -> StorageResult<DaoSet> {
        if init.kind() != kind {
            return Err(StorageError::Configuration(format!(
                "backend '{kind}' cannot be initialised with a {} argument",
                init.kind()
            )));
        }

        let daos = match init {
            BackendInit::Sqlite(pool) => Self::sqlite(pool),
            BackendInit::FileSystem(root) => Self::filesystem(FsStore::open_root(root)?),
        };
        info!(backend = %kind, "Storage backend ready");
        Ok(daos)
    }

    /// Like [`StorageFactory::create`], with the backend given as a selector string
    pub fn create_named(selector: &str, init: BackendInit) -> StorageResult<DaoSet> {
        let kind = BackendKind::from_str(selector)?;
        Self::create(kind, init)
    }

    /// Open the configured backend
    pub fn from_config(config: &StorageConfig) -> StorageResult<DaoSet> {
        config.validate()?;
        let daos = match config.backend {
            BackendKind::Sqlite => Self::sqlite(SqlitePool::new(config.sqlite.clone())?),
            BackendKind::FileSystem => Self::filesystem(FsStore::open(&config.filesystem)?),
        };
        info!(backend = %config.backend, "Storage backend ready");
        Ok(daos)
    }

    fn sqlite(pool: SqlitePool) -> DaoSet {
        DaoSet {
            kind: BackendKind::Sqlite,
            notes: Arc::new(SqliteNoteDao::new(pool.clone())),
            folders: Arc::new(SqliteFolderDao::new(pool.clone())),
            tags: Arc::new(SqliteTagDao::new(pool)),
        }
    }

    fn filesystem(store: FsStore) -> DaoSet {
        let store = Arc::new(store);
        DaoSet {
            kind: BackendKind::FileSystem,
            notes: Arc::new(FsNoteDao::new(store.clone())),
            folders: Arc::new(FsFolderDao::new(store.clone())),
            tags: Arc::new(FsTagDao::new(store)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mismatched_init_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let err = StorageFactory::create(
            BackendKind::Sqlite,
            BackendInit::FileSystem(dir.path().to_path_buf()),
        )
        .unwrap_err();
        assert!(matches!(err, StorageError::Configuration(_)));

        let pool = SqlitePool::memory().unwrap();
        let err = StorageFactory::create(BackendKind::FileSystem, BackendInit::Sqlite(pool)).unwrap_err();
        assert!(matches!(err, StorageError::Configuration(_)));
    }

    #[test]
    fn test_unknown_selector_is_configuration_error() {
        let pool = SqlitePool::memory().unwrap();
        let err = StorageFactory::create_named("mongo", BackendInit::Sqlite(pool)).unwrap_err();
        assert!(matches!(err, StorageError::Configuration(ref m) if m.contains("mongo")));
    }

    #[test]
    fn test_selector_aliases() {
        let dir = TempDir::new().unwrap();
        let daos = StorageFactory::create_named("files", BackendInit::FileSystem(dir.path().into())).unwrap();
        assert_eq!(daos.kind, BackendKind::FileSystem);

        let daos = StorageFactory::create_named("sql", BackendInit::Sqlite(SqlitePool::memory().unwrap())).unwrap();
        assert_eq!(daos.kind, BackendKind::Sqlite);
    }

    #[test]
    fn test_from_config_opens_both_backends() {
        let dir = TempDir::new().unwrap();

        let fs = StorageFactory::from_config(&StorageConfig::filesystem(dir.path().join("notes"))).unwrap();
        assert_eq!(fs.kind, BackendKind::FileSystem);
        assert!(dir.path().join("notes").is_dir());

        let sql = StorageFactory::from_config(&StorageConfig::sqlite(dir.path().join("db/notes.db"))).unwrap();
        assert_eq!(sql.kind, BackendKind::Sqlite);
        assert!(sql.folders.fetch_all_folders_as_list().unwrap().is_empty());
        assert!(dir.path().join("db/notes.db").exists());
    }

    #[test]
    fn test_daos_share_backend_state() {
        let dir = TempDir::new().unwrap();
        let daos = StorageFactory::create(
            BackendKind::FileSystem,
            BackendInit::FileSystem(dir.path().to_path_buf()),
        )
        .unwrap();

        let mut folder = notecase_core::Folder::new("Work");
        daos.folders.create_folder(&mut folder).unwrap();
        let mut note = notecase_core::Note::new("Todo", "").in_folder("Work");
        daos.notes.create_note(&mut note).unwrap();

        assert_eq!(daos.notes.fetch_notes_by_folder_id("Work").unwrap().len(), 1);
    }
}
