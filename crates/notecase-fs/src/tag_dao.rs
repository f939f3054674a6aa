//! [`TagDao`] over frontmatter tag lists
//!
//! There is no tag file. A tag exists while some note carries it or while it
//! sits in the in-memory registry of declared tags. Its id is its title.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use notecase_core::naming::{require_id, require_title};
use notecase_core::{Note, StorageError, StorageResult, Tag, TagDao};
use tracing::debug;

use crate::error::{at_boundary, FsResult};
use crate::store::FsStore;

/// Filesystem-backed tag storage
#[derive(Debug)]
pub struct FsTagDao {
    store: Arc<FsStore>,
    registry: DashMap<String, Tag>,
}

impl FsTagDao {
    pub fn new(store: Arc<FsStore>) -> Self {
        Self {
            store,
            registry: DashMap::new(),
        }
    }

    fn in_use(&self, title: &str) -> bool {
        !self.store.note_ids_where(|header| header.has_tag(title)).is_empty()
    }

    fn known(&self, title: &str) -> bool {
        self.registry.contains_key(title) || self.in_use(title)
    }

    /// Rewrite every active note carrying `from`; `to == None` strips the tag
    fn retag(&self, from: &str, to: Option<&str>) -> FsResult<usize> {
        let ids = self.store.note_ids_where(|header| header.has_tag(from));
        for id in &ids {
            let Some(mut note) = self.store.read_note(id)? else { continue };
            note.tags.remove(&Tag::synthesized(from));
            if let Some(to) = to {
                note.tags.insert(Tag::synthesized(to));
            }
            self.store.write_note(id, &note)?;
        }
        Ok(ids.len())
    }
}

impl TagDao for FsTagDao {
    fn create_tag(&self, tag: &mut Tag) -> StorageResult<String> {
        require_title(&tag.title, "tag")?;
        if self.known(&tag.title) {
            return Err(StorageError::Conflict(format!("tag '{}' already exists", tag.title)));
        }
        tag.id = Some(tag.title.clone());
        self.registry.insert(tag.title.clone(), tag.clone());
        debug!(title = %tag.title, "Declared tag");
        Ok(tag.title.clone())
    }

    fn update_tag(&self, tag: &mut Tag) -> StorageResult<()> {
        let old = tag
            .id
            .clone()
            .ok_or_else(|| StorageError::invalid("tag has no id; create it first"))?;
        require_id(&old, "tag")?;
        require_title(&tag.title, "tag")?;
        if !self.known(&old) {
            return Err(StorageError::not_found(format!("tag '{old}'")));
        }

        if tag.title != old {
            if self.known(&tag.title) {
                return Err(StorageError::Conflict(format!("tag '{}' already exists", tag.title)));
            }
            let renamed = at_boundary("update_tag", &old, self.retag(&old, Some(&tag.title)))?;
            debug!(from = %old, to = %tag.title, notes = renamed, "Renamed tag");
        }

        tag.modified_date = Utc::now();
        tag.id = Some(tag.title.clone());
        self.registry.remove(&old);
        self.registry.insert(tag.title.clone(), tag.clone());
        Ok(())
    }

    fn delete_tag(&self, id: &str) -> StorageResult<()> {
        require_id(id, "tag")?;
        let declared = self.registry.remove(id).is_some();
        let stripped = at_boundary("delete_tag", id, self.retag(id, None))?;
        if !declared && stripped == 0 {
            return Err(StorageError::not_found(format!("tag '{id}'")));
        }
        debug!(id, notes = stripped, "Deleted tag");
        Ok(())
    }

    fn get_tag_by_id(&self, id: &str) -> StorageResult<Option<Tag>> {
        require_id(id, "tag")?;
        if let Some(tag) = self.registry.get(id) {
            return Ok(Some(tag.clone()));
        }
        Ok(self.in_use(id).then(|| Tag::synthesized(id)))
    }

    fn fetch_all_tags(&self) -> StorageResult<Vec<Tag>> {
        let mut tags: BTreeMap<String, Tag> = self
            .registry
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        for header in self.store.note_headers() {
            for tag in header.tags {
                tags.entry(tag.title.clone())
                    .or_insert_with(|| Tag::synthesized(tag.title));
            }
        }
        Ok(tags.into_values().collect())
    }

    fn fetch_all_notes_with_tag(&self, tag_id: &str) -> StorageResult<Vec<Note>> {
        require_id(tag_id, "tag")?;
        let ids = self.store.note_ids_where(|header| header.has_tag(tag_id));
        let notes = at_boundary("fetch_all_notes_with_tag", tag_id, self.store.hydrate(ids))?;
        Ok(notes.into_iter().filter(|n| !n.deleted).collect())
    }

    fn exists_by_title(&self, title: &str) -> StorageResult<bool> {
        if self.registry.iter().any(|entry| entry.key().eq_ignore_ascii_case(title)) {
            return Ok(true);
        }
        Ok(self
            .store
            .note_headers()
            .iter()
            .flat_map(|header| header.tags.iter())
            .any(|tag| tag.title.eq_ignore_ascii_case(title)))
    }
}
