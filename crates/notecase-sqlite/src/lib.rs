//! SQLite storage backend for notecase
//!
//! Implements [`NoteDao`], [`FolderDao`] and [`TagDao`] over four tables
//! (`notes`, `folders`, `tags`, `tagsNotes`) with the folder hierarchy stored
//! as an adjacency list on `parent_id`.
//!
//! ## Features
//!
//! - **One transaction per write**: [`SqlitePool::write`] commits or rolls back
//! - **Trash parity**: folders and notes carry `is_deleted`/`deleted_date`, and
//!   deleting a folder trashes its whole subtree
//! - **Thread Safety**: `Arc<Mutex<Connection>>` shared by all three DAOs
//!
//! ## Usage
//!
//! ```rust,no_run
//! use notecase_core::{Folder, FolderDao, Note, NoteDao};
//! use notecase_sqlite::{SqliteFolderDao, SqliteNoteDao, SqlitePool};
//!
//! let pool = SqlitePool::memory()?;
//! let folders = SqliteFolderDao::new(pool.clone());
//! let notes = SqliteNoteDao::new(pool);
//!
//! let mut work = Folder::new("Work");
//! let work_id = folders.create_folder(&mut work)?;
//! let mut todo = Note::new("Todo", "buy milk").in_folder(work_id.clone());
//! notes.create_note(&mut todo)?;
//! assert_eq!(notes.fetch_notes_by_folder_id(&work_id)?.len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! [`NoteDao`]: notecase_core::NoteDao
//! [`FolderDao`]: notecase_core::FolderDao
//! [`TagDao`]: notecase_core::TagDao

pub mod connection;
pub mod error;
pub mod folder_dao;
pub mod note_dao;
mod queries;
mod rows;
pub mod schema;
pub mod tag_dao;

pub use connection::SqlitePool;
pub use error::{SqliteError, SqliteResult};
pub use folder_dao::SqliteFolderDao;
pub use note_dao::SqliteNoteDao;
pub use tag_dao::SqliteTagDao;
