use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::StorageResult;

/// Typed id of a folder or note, used in children sets
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ComponentRef {
    /// A folder id
    Folder(String),
    /// A note id
    Note(String),
}

impl ComponentRef {
    /// The referenced id
    pub fn id(&self) -> &str {
        match self {
            ComponentRef::Folder(id) | ComponentRef::Note(id) => id,
        }
    }

    /// Whether this points at a folder
    pub fn is_folder(&self) -> bool {
        matches!(self, ComponentRef::Folder(_))
    }
}

/// Shared parent/children contract of folders (composite) and notes (leaf)
pub trait Component {
    /// Backend-assigned id; `None` until persisted
    fn id(&self) -> Option<&str>;

    /// Display title
    fn title(&self) -> &str;

    /// Creation timestamp
    fn created_date(&self) -> DateTime<Utc>;

    /// Last modification timestamp
    fn modified_date(&self) -> DateTime<Utc>;

    /// Id of the containing folder; `None` means root
    fn parent_id(&self) -> Option<&str>;

    /// Replace the parent back-reference
    fn set_parent_id(&mut self, parent_id: Option<String>);

    /// Direct children (always empty for leaves)
    fn children(&self) -> &BTreeSet<ComponentRef>;

    /// Add a child; leaves reject this with `UnsupportedOperation`
    fn add_child(&mut self, child: ComponentRef) -> StorageResult<()>;

    /// Remove a child, returning whether it was present
    fn remove_child(&mut self, child: &ComponentRef) -> StorageResult<bool>;

    /// Whether this component can never hold children
    fn is_leaf(&self) -> bool;

    /// Typed reference to this component, once it has an id
    fn component_ref(&self) -> Option<ComponentRef>;
}
