use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// A label attached to notes
///
/// Equality, ordering and hashing use the title only (case-sensitive), so a
/// set of tags collapses duplicates regardless of ids or timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: Option<String>,
    pub title: String,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
}

impl Tag {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            title: title.into(),
            created_date: now,
            modified_date: now,
        }
    }

    /// Tag whose id is its own title (filesystem backend)
    pub fn synthesized(title: impl Into<String>) -> Self {
        let title = title.into();
        let mut tag = Self::new(title.clone());
        tag.id = Some(title);
        tag
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title
    }
}

impl Eq for Tag {}

impl PartialOrd for Tag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.title.cmp(&other.title)
    }
}

impl Hash for Tag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.title.hash(state);
    }
}
