use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{Component, ComponentRef, Tag};
use crate::{StorageError, StorageResult};

static NO_CHILDREN: BTreeSet<ComponentRef> = BTreeSet::new();

/// ToDo specialization of a note
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoState {
    pub due: Option<DateTime<Utc>>,
    pub completed: Option<DateTime<Utc>>,
}

impl TodoState {
    pub fn is_completed(&self) -> bool {
        self.completed.is_some()
    }
}

/// Leaf component: a single note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
    /// Containing folder id; `None` means root
    pub parent_id: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<Tag>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub author: Option<String>,
    pub source_url: Option<String>,
    pub source: Option<String>,
    pub source_application: Option<String>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub deleted: bool,
    pub deleted_date: Option<DateTime<Utc>>,
    /// `Some` makes this a ToDo note
    pub todo: Option<TodoState>,
}

impl Note {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            title: title.into(),
            content: content.into(),
            created_date: now,
            modified_date: now,
            parent_id: None,
            tags: BTreeSet::new(),
            latitude: None,
            longitude: None,
            author: None,
            source_url: None,
            source: None,
            source_application: None,
            favorite: false,
            pinned: false,
            deleted: false,
            deleted_date: None,
            todo: None,
        }
    }

    /// A ToDo note with an optional due date
    pub fn todo(title: impl Into<String>, due: Option<DateTime<Utc>>) -> Self {
        let mut note = Self::new(title, "");
        note.todo = Some(TodoState {
            due,
            completed: None,
        });
        note
    }

    /// Builder-style: place under `folder_id`
    #[must_use]
    pub fn in_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.parent_id = Some(folder_id.into());
        self
    }

    /// Builder-style: attach tags by title
    #[must_use]
    pub fn with_tags<I, S>(mut self, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(titles.into_iter().map(Tag::new));
        self
    }

    pub fn is_todo(&self) -> bool {
        self.todo.is_some()
    }

    pub fn has_tag(&self, title: &str) -> bool {
        self.tags.iter().any(|t| t.title == title)
    }

    /// Tag titles in sorted order
    pub fn tag_titles(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.title.clone()).collect()
    }

    /// Flip into the trashed state
    pub fn mark_deleted(&mut self, at: DateTime<Utc>) {
        self.deleted = true;
        self.deleted_date = Some(at);
    }

    /// Clear the trashed state and its timestamp
    pub fn clear_deleted(&mut self) {
        self.deleted = false;
        self.deleted_date = None;
    }

    /// Same note without its body, for listing caches
    pub fn header_only(&self) -> Self {
        Self {
            content: String::new(),
            ..self.clone()
        }
    }

    pub fn touch(&mut self) {
        self.modified_date = Utc::now();
    }
}

impl Component for Note {
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
        &NO_CHILDREN
    }

    fn add_child(&mut self, child: ComponentRef) -> StorageResult<()> {
        Err(StorageError::unsupported(format!(
            "note '{}' cannot hold children (tried to add '{}')",
            self.title,
            child.id()
        )))
    }

    fn remove_child(&mut self, child: &ComponentRef) -> StorageResult<bool> {
        Err(StorageError::unsupported(format!(
            "note '{}' has no children (tried to remove '{}')",
            self.title,
            child.id()
        )))
    }

    fn is_leaf(&self) -> bool {
        true
    }

    fn component_ref(&self) -> Option<ComponentRef> {
        self.id.clone().map(ComponentRef::Note)
    }
}
