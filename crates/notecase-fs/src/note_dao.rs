//! [`NoteDao`] over Markdown files

use std::sync::Arc;

use notecase_core::naming::{require_id, require_title, sanitize_file_name};
use notecase_core::{Folder, Note, NoteDao, StorageError, StorageResult, Tag};
use tracing::{debug, warn};

use crate::error::{at_boundary, FsResult};
use crate::manifest::EntryKind;
use crate::store::FsStore;

/// Filesystem-backed note storage
#[derive(Debug, Clone)]
pub struct FsNoteDao {
    store: Arc<FsStore>,
}

impl FsNoteDao {
    pub fn new(store: Arc<FsStore>) -> Self {
        Self { store }
    }

    fn require_note(&self, id: &str) -> FsResult<Note> {
        self.store
            .read_note(id)?
            .ok_or_else(|| StorageError::not_found(format!("note '{id}'")).into())
    }

    pub(crate) fn folder_of(&self, note_id: &str) -> FsResult<Option<Folder>> {
        let note = self.require_note(note_id)?;
        match note.parent_id {
            Some(parent) => self.store.load_folder(&parent),
            None => Ok(None),
        }
    }

    /// Read, change and write back one note
    fn edit(&self, id: &str, change: impl FnOnce(&mut Note)) -> FsResult<()> {
        let mut note = self.require_note(id)?;
        change(&mut note);
        self.store.write_note(id, &note)
    }
}

/// Tags on the filesystem are identified by their title
fn synthesize_tags(note: &mut Note) {
    note.tags = note
        .tags
        .iter()
        .map(|tag| Tag::synthesized(tag.title.clone()))
        .collect();
}

impl NoteDao for FsNoteDao {
    fn create_note(&self, note: &mut Note) -> StorageResult<String> {
        require_title(&note.title, "note")?;
        synthesize_tags(note);
        let parent = note.parent_id.clone();
        let id = at_boundary(
            "create_note",
            parent.as_deref().unwrap_or_default(),
            self.store.create_note_file(parent.as_deref(), note),
        )?;
        debug!(id = %id, "Created note");
        Ok(id)
    }

    fn get_note_by_id(&self, id: &str) -> StorageResult<Option<Note>> {
        require_id(id, "note")?;
        at_boundary("get_note_by_id", id, self.store.read_note(id))
    }

    fn update_note(&self, note: &mut Note) -> StorageResult<()> {
        let mut id = note
            .id
            .clone()
            .ok_or_else(|| StorageError::invalid("note has no id; create it first"))?;
        require_id(&id, "note")?;
        require_title(&note.title, "note")?;

        let current = at_boundary("update_note", &id, self.require_note(&id))?;
        let renamed = note.title != current.title && sanitize_file_name(&note.title) != current.title;
        if renamed && !self.store.is_trash_id(&id) {
            match self.store.rename(&id, &note.title, EntryKind::Note) {
                Ok(new_id) => id = new_id,
                Err(e) => warn!(id = %id, error = %e, "Rename failed, keeping the old file name"),
            }
        }

        synthesize_tags(note);
        self.store.fill_identity(note, &id);
        at_boundary("update_note", &id, self.store.write_note(&id, note))?;
        debug!(id = %id, "Updated note");
        Ok(())
    }

    fn delete_note(&self, id: &str) -> StorageResult<()> {
        require_id(id, "note")?;
        let trash_id = at_boundary("delete_note", id, self.store.trash(id, EntryKind::Note))?;
        debug!(id, trash_id = %trash_id, "Moved note to trash");
        Ok(())
    }

    fn permanently_delete_note(&self, id: &str) -> StorageResult<()> {
        require_id(id, "note")?;
        at_boundary("permanently_delete_note", id, self.store.purge(id, EntryKind::Note))
    }

    fn restore_note(&self, id: &str) -> StorageResult<String> {
        require_id(id, "note")?;
        at_boundary("restore_note", id, self.store.restore(id, EntryKind::Note))
    }

    fn fetch_trash_notes(&self) -> StorageResult<Vec<Note>> {
        at_boundary("fetch_trash_notes", "", self.store.trashed_notes())
    }

    fn fetch_all_notes(&self) -> StorageResult<Vec<Note>> {
        let ids = self.store.note_ids_where(|_| true);
        let notes = at_boundary("fetch_all_notes", "", self.store.hydrate(ids))?;
        Ok(notes.into_iter().filter(|n| !n.deleted).collect())
    }

    fn fetch_notes_by_folder_id(&self, folder_id: &str) -> StorageResult<Vec<Note>> {
        require_id(folder_id, "folder")?;
        if !self.store.contains_folder(folder_id) {
            return Ok(Vec::new());
        }
        let ids = self.store.note_ids_in(folder_id);
        let notes = at_boundary("fetch_notes_by_folder_id", folder_id, self.store.hydrate(ids))?;
        Ok(notes.into_iter().filter(|n| !n.deleted).collect())
    }

    fn get_folder_of_note(&self, note_id: &str) -> StorageResult<Option<Folder>> {
        require_id(note_id, "note")?;
        at_boundary("get_folder_of_note", note_id, self.folder_of(note_id))
    }

    fn add_tag(&self, note_id: &str, tag_id: &str) -> StorageResult<()> {
        require_id(note_id, "note")?;
        require_id(tag_id, "tag")?;
        at_boundary(
            "add_tag",
            note_id,
            self.edit(note_id, |note| {
                note.tags.insert(Tag::synthesized(tag_id));
            }),
        )?;
        debug!(note_id, tag_id, "Tagged note");
        Ok(())
    }

    fn remove_tag(&self, note_id: &str, tag_id: &str) -> StorageResult<()> {
        require_id(note_id, "note")?;
        require_id(tag_id, "tag")?;
        at_boundary(
            "remove_tag",
            note_id,
            self.edit(note_id, |note| {
                note.tags.remove(&Tag::synthesized(tag_id));
            }),
        )?;
        debug!(note_id, tag_id, "Untagged note");
        Ok(())
    }

    fn fetch_tags(&self, note_id: &str) -> StorageResult<Vec<Tag>> {
        require_id(note_id, "note")?;
        let note = at_boundary("fetch_tags", note_id, self.require_note(note_id))?;
        Ok(note.tags.into_iter().collect())
    }

    fn fetch_notes_by_tag_id(&self, tag_id: &str) -> StorageResult<Vec<Note>> {
        require_id(tag_id, "tag")?;
        let ids = self.store.note_ids_where(|header| header.has_tag(tag_id));
        let notes = at_boundary("fetch_notes_by_tag_id", tag_id, self.store.hydrate(ids))?;
        Ok(notes.into_iter().filter(|n| !n.deleted).collect())
    }
}
