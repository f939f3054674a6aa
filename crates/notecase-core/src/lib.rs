//! Core abstractions for notecase
//!
//! This crate defines what every storage backend must provide, independent of
//! how it stores anything:
//!
//! - **Model**: [`Folder`], [`Note`], [`Tag`] and the [`Component`] capability
//!   that gives folders and notes a uniform parent/children contract
//! - **Hierarchy**: an id-keyed arena ([`Hierarchy`]) used for tree-shaped
//!   results instead of live parent/child pointers
//! - **Traits**: [`NoteDao`], [`FolderDao`], [`TagDao`]
//! - **Errors**: [`StorageError`], returned from every DAO method
//! - **Frontmatter**: [`FrontmatterCodec`] and the default YAML implementation
//!
//! Backends live in `notecase-sqlite` and `notecase-fs`; `notecase-storage`
//! selects one of them.

pub mod error;
pub mod frontmatter;
pub mod model;
pub mod naming;
pub mod traits;

pub use error::{StorageError, StorageResult};
pub use frontmatter::{FrontmatterCodec, YamlFrontmatter};
pub use model::{
    Component, ComponentRef, Folder, Hierarchy, Node, Note, Tag, TodoState,
};
pub use naming::{sanitize_file_name, ROOT_FOLDER_ID};
pub use traits::{FolderDao, NoteDao, TagDao};
