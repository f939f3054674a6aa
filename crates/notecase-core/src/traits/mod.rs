//! Capability traits implemented by every backend
//!
//! The traits are synchronous: every backend does blocking I/O and callers
//! that need asynchrony wrap the calls themselves (e.g. `spawn_blocking`).
//! They are `Send + Sync` so one set of DAOs can be shared behind `Arc`.

mod dao;

pub use dao::{FolderDao, NoteDao, TagDao};
