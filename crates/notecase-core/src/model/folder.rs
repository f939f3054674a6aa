use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{Component, ComponentRef};
use crate::naming::ROOT_FOLDER_ID;
use crate::StorageResult;

/// Composite component: holds folders and notes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: Option<String>,
    pub title: String,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
    /// Containing folder id; `None` means root
    pub parent_id: Option<String>,
    #[serde(default)]
    pub children: BTreeSet<ComponentRef>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub deleted_date: Option<DateTime<Utc>>,
}

impl Folder {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            title: title.into(),
            created_date: now,
            modified_date: now,
            parent_id: None,
            children: BTreeSet::new(),
            deleted: false,
            deleted_date: None,
        }
    }

    /// The root sentinel
    pub fn root() -> Self {
        let mut folder = Self::new(ROOT_FOLDER_ID);
        folder.id = Some(ROOT_FOLDER_ID.to_string());
        folder
    }

    /// Builder-style: place under `parent_id`
    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn is_root(&self) -> bool {
        self.id.as_deref() == Some(ROOT_FOLDER_ID)
    }

    /// True iff there are no children
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Ids of child folders
    pub fn child_folder_ids(&self) -> impl Iterator<Item = &str> {
        self.children
            .iter()
            .filter(|c| c.is_folder())
            .map(ComponentRef::id)
    }

    /// Ids of child notes
    pub fn child_note_ids(&self) -> impl Iterator<Item = &str> {
        self.children
            .iter()
            .filter(|c| !c.is_folder())
            .map(ComponentRef::id)
    }

    /// Bump `modified_date` to now
    pub fn touch(&mut self) {
        self.modified_date = Utc::now();
    }
}

impl Component for Folder {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn created_date(&self) -> DateTime<Utc> {
        self.created_date
    }

    fn modified_date(&self) -> DateTime<Utc> {
        self.modified_date
    }

    fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    fn set_parent_id(&mut self, parent_id: Option<String>) {
        self.parent_id = parent_id;
    }

    fn children(&self) -> &BTreeSet<ComponentRef> {
        &self.children
    }

    fn add_child(&mut self, child: ComponentRef) -> StorageResult<()> {
        if self.id.as_deref() == Some(child.id()) && child.is_folder() {
            return Err(crate::StorageError::invalid(format!(
                "folder '{}' cannot contain itself",
                child.id()
            )));
        }
        self.children.insert(child);
        Ok(())
    }

    fn remove_child(&mut self, child: &ComponentRef) -> StorageResult<bool> {
        Ok(self.children.remove(child))
    }

    fn is_leaf(&self) -> bool {
        false
    }

    fn component_ref(&self) -> Option<ComponentRef> {
        self.id.clone().map(ComponentRef::Folder)
    }
}
