//! Filesystem storage backend for notecase
//!
//! A folder is a directory and a note is a Markdown file with a YAML
//! frontmatter header. Ids are `/`-separated paths relative to the root
//! (`Work`, `Work/Todo.md`), so renaming or moving an entry changes its id.
//!
//! ## Layout
//!
//! ```text
//! <root>/
//!   Work/
//!     Todo.md
//!   .trash/
//!     .manifest.json
//!     Old/Idea.md
//! ```
//!
//! Dot-prefixed entries are never listed. Soft-deleted entries live under the
//! trash directory at their original relative path, and the manifest records
//! what was deleted so restore can put it back.
//!
//! All three DAOs share one [`FsStore`], which owns the caches and is the only
//! place that renames, moves or removes entries on disk.

pub mod error;
pub mod folder_dao;
pub mod manifest;
pub mod note_dao;
pub mod store;
pub mod tag_dao;

pub use error::{FsError, FsResult};
pub use folder_dao::FsFolderDao;
pub use manifest::{EntryKind, TrashEntry, TrashManifest};
pub use note_dao::FsNoteDao;
pub use store::FsStore;
pub use tag_dao::FsTagDao;
