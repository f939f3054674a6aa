//! Domain model
//!
//! Folders are composites and notes are leaves of the same [`Component`]
//! capability. Relationships are held as ids ([`ComponentRef`]), never as
//! references into other objects, so every value handed to a caller is a
//! detached copy.

mod component;
mod folder;
mod hierarchy;
mod note;
mod tag;

pub use component::{Component, ComponentRef};
pub use folder::Folder;
pub use hierarchy::{Hierarchy, Node};
pub use note::{Note, TodoState};
pub use tag::Tag;
