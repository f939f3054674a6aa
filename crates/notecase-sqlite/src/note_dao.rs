//! [`NoteDao`] over the `notes` and `tagsNotes` tables

use std::collections::BTreeSet;

use chrono::Utc;
use notecase_core::naming::{is_root_id, require_id, require_title};
use notecase_core::{Folder, Note, NoteDao, StorageError, StorageResult, Tag};
use rusqlite::params;
use tracing::debug;

use crate::connection::SqlitePool;
use crate::error::SqliteError;
use crate::queries::{
    active_notes_with_tag, db_parent, ensure_tag, folder_by_id, insert_note, link_tag, new_id,
    note_by_id, notes_where, require_active_parent, require_note, require_tag, restore_ancestors,
    tags_of_note, update_note_row,
};
use crate::rows::ts;

/// SQLite-backed note storage
#[derive(Debug, Clone)]
pub struct SqliteNoteDao {
    pool: SqlitePool,
}

impl SqliteNoteDao {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl NoteDao for SqliteNoteDao {
    fn create_note(&self, note: &mut Note) -> StorageResult<String> {
        require_title(&note.title, "note")?;
        let id = note.id.clone().unwrap_or_else(new_id);
        require_id(&id, "note")?;

        let tags = self.pool.write("create_note", |tx| {
            require_active_parent(tx, note.parent_id.as_deref())?;
            insert_note(tx, &id, note)?;

            let mut stored = BTreeSet::new();
            for tag in &note.tags {
                let tag = ensure_tag(tx, tag)?;
                if let Some(tag_id) = tag.id.as_deref() {
                    link_tag(tx, &id, tag_id)?;
                }
                stored.insert(tag);
            }
            Ok(stored)
        })?;

        note.id = Some(id.clone());
        note.parent_id = db_parent(note.parent_id.as_deref()).map(str::to_string);
        note.tags = tags;
        debug!(id = %id, title = %note.title, "Created note");
        Ok(id)
    }

    fn get_note_by_id(&self, id: &str) -> StorageResult<Option<Note>> {
        require_id(id, "note")?;
        Ok(self.pool.read("get_note_by_id", |conn| note_by_id(conn, id))?)
    }

    fn update_note(&self, note: &mut Note) -> StorageResult<()> {
        let id = note
            .id
            .clone()
            .ok_or_else(|| StorageError::invalid("note has no id; create it first"))?;
        require_id(&id, "note")?;
        require_title(&note.title, "note")?;

        self.pool.write("update_note", |tx| {
            require_active_parent(tx, note.parent_id.as_deref())?;
            if update_note_row(tx, &id, note)? == 0 {
                return Err(SqliteError::not_found("note", &id));
            }
            Ok(())
        })?;
        debug!(id = %id, "Updated note");
        Ok(())
    }

    fn delete_note(&self, id: &str) -> StorageResult<()> {
        require_id(id, "note")?;
        let now = Utc::now();

        self.pool.write("delete_note", |tx| {
            let changed = tx.execute(
                "UPDATE notes SET is_deleted = 1, deleted_date = ?2 WHERE note_id = ?1 AND is_deleted = 0",
                params![id, ts(&now)],
            )?;
            if changed == 0 {
                // Already trashed is fine; absent is not
                require_note(tx, id)?;
            }
            Ok(())
        })?;
        debug!(id, "Moved note to trash");
        Ok(())
    }

    fn permanently_delete_note(&self, id: &str) -> StorageResult<()> {
        require_id(id, "note")?;

        self.pool.write("permanently_delete_note", |tx| {
            tx.execute("DELETE FROM tagsNotes WHERE note_id = ?1", [id])?;
            if tx.execute("DELETE FROM notes WHERE note_id = ?1", [id])? == 0 {
                return Err(SqliteError::not_found("note", id));
            }
            Ok(())
        })?;
        debug!(id, "Permanently deleted note");
        Ok(())
    }

    fn restore_note(&self, id: &str) -> StorageResult<String> {
        require_id(id, "note")?;

        self.pool.write("restore_note", |tx| {
            let note = require_note(tx, id)?;
            if !note.deleted {
                return Ok(());
            }
            tx.execute(
                "UPDATE notes SET is_deleted = 0, deleted_date = NULL WHERE note_id = ?1",
                [id],
            )?;
            let folders = restore_ancestors(tx, note.parent_id.as_deref())?;
            debug!(id, restored_folders = folders, "Restored note");
            Ok(())
        })?;
        Ok(id.to_string())
    }

    fn fetch_trash_notes(&self) -> StorageResult<Vec<Note>> {
        Ok(self
            .pool
            .read("fetch_trash_notes", |conn| notes_where(conn, "is_deleted = 1", []))?)
    }

    fn fetch_all_notes(&self) -> StorageResult<Vec<Note>> {
        Ok(self
            .pool
            .read("fetch_all_notes", |conn| notes_where(conn, "is_deleted = 0", []))?)
    }

    fn fetch_notes_by_folder_id(&self, folder_id: &str) -> StorageResult<Vec<Note>> {
        require_id(folder_id, "folder")?;
        Ok(self.pool.read("fetch_notes_by_folder_id", |conn| {
            if is_root_id(folder_id) {
                notes_where(conn, "parent_id IS NULL AND is_deleted = 0", [])
            } else {
                notes_where(conn, "parent_id = ?1 AND is_deleted = 0", [folder_id])
            }
        })?)
    }

    fn get_folder_of_note(&self, note_id: &str) -> StorageResult<Option<Folder>> {
        require_id(note_id, "note")?;
        Ok(self.pool.read("get_folder_of_note", |conn| {
            let note = require_note(conn, note_id)?;
            match db_parent(note.parent_id.as_deref()) {
                Some(parent) => folder_by_id(conn, parent),
                None => Ok(None),
            }
        })?)
    }

    fn add_tag(&self, note_id: &str, tag_id: &str) -> StorageResult<()> {
        require_id(note_id, "note")?;
        require_id(tag_id, "tag")?;

        self.pool.write("add_tag", |tx| {
            require_note(tx, note_id)?;
            require_tag(tx, tag_id)?;
            link_tag(tx, note_id, tag_id)
        })?;
        debug!(note_id, tag_id, "Tagged note");
        Ok(())
    }

    fn remove_tag(&self, note_id: &str, tag_id: &str) -> StorageResult<()> {
        require_id(note_id, "note")?;
        require_id(tag_id, "tag")?;

        self.pool.write("remove_tag", |tx| {
            require_note(tx, note_id)?;
            require_tag(tx, tag_id)?;
            tx.execute(
                "DELETE FROM tagsNotes WHERE note_id = ?1 AND tag_id = ?2",
                [note_id, tag_id],
            )?;
            Ok(())
        })?;
        debug!(note_id, tag_id, "Untagged note");
        Ok(())
    }

    fn fetch_tags(&self, note_id: &str) -> StorageResult<Vec<Tag>> {
        require_id(note_id, "note")?;
        Ok(self.pool.read("fetch_tags", |conn| {
            require_note(conn, note_id)?;
            tags_of_note(conn, note_id)
        })?)
    }

    fn fetch_notes_by_tag_id(&self, tag_id: &str) -> StorageResult<Vec<Note>> {
        require_id(tag_id, "tag")?;
        Ok(self
            .pool
            .read("fetch_notes_by_tag_id", |conn| active_notes_with_tag(conn, tag_id))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::folder_dao::SqliteFolderDao;
    use crate::tag_dao::SqliteTagDao;
    use chrono::TimeZone;
    use notecase_core::{FolderDao, TagDao, ROOT_FOLDER_ID};

    fn setup() -> (SqliteNoteDao, SqliteFolderDao, SqliteTagDao) {
        let pool = SqlitePool::memory().expect("memory pool");
        (
            SqliteNoteDao::new(pool.clone()),
            SqliteFolderDao::new(pool.clone()),
            SqliteTagDao::new(pool),
        )
    }

    #[test]
    fn test_create_and_fetch_round_trip() {
        let (notes, _, _) = setup();
        let mut note = Note::new("Trip", "pack bags").with_tags(["travel"]);
        note.latitude = Some(52.5);
        note.longitude = Some(13.4);
        note.author = Some("ana".into());
        note.source_url = Some("https://example.org".into());
        note.source = Some("web".into());
        note.source_application = Some("clipper".into());
        note.favorite = true;
        note.pinned = true;

        let id = notes.create_note(&mut note).unwrap();
        let fetched = notes.get_note_by_id(&id).unwrap().expect("stored note");

        assert_eq!(fetched, note);
        assert!(fetched.has_tag("travel"));
    }

    #[test]
    fn test_todo_round_trip() {
        let (notes, _, _) = setup();
        let due = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let mut todo = Note::todo("Call bank", Some(due));

        let id = notes.create_note(&mut todo).unwrap();
        let fetched = notes.get_note_by_id(&id).unwrap().unwrap();

        assert!(fetched.is_todo());
        assert_eq!(fetched.todo.unwrap().due, Some(due));
    }

    #[test]
    fn test_create_rejects_empty_title_and_missing_parent() {
        let (notes, _, _) = setup();

        let err = notes.create_note(&mut Note::new("  ", "")).unwrap_err();
        assert!(matches!(err, StorageError::InvalidParameter(_)));

        let err = notes
            .create_note(&mut Note::new("Orphan", "").in_folder("missing"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_root_parent_is_stored_as_top_level() {
        let (notes, _, _) = setup();
        let mut note = Note::new("Top", "").in_folder(ROOT_FOLDER_ID);
        let id = notes.create_note(&mut note).unwrap();

        assert_eq!(note.parent_id, None);
        let top = notes.fetch_notes_by_folder_id(ROOT_FOLDER_ID).unwrap();
        assert_eq!(top.len(), 1);
        assert!(notes.get_folder_of_note(&id).unwrap().is_none());
    }

    #[test]
    fn test_update_keeps_id() {
        let (notes, _, _) = setup();
        let mut note = Note::new("Draft", "v1");
        let id = notes.create_note(&mut note).unwrap();

        note.title = "Final".into();
        note.content = "v2".into();
        notes.update_note(&mut note).unwrap();

        let fetched = notes.get_note_by_id(&id).unwrap().unwrap();
        assert_eq!(fetched.id.as_deref(), Some(id.as_str()));
        assert_eq!(fetched.title, "Final");
        assert_eq!(fetched.content, "v2");
    }

    #[test]
    fn test_update_unknown_note_is_not_found() {
        let (notes, _, _) = setup();
        let mut ghost = Note::new("Ghost", "");
        ghost.id = Some("nope".into());
        assert!(notes.update_note(&mut ghost).unwrap_err().is_not_found());
    }

    #[test]
    fn test_trash_lifecycle() {
        let (notes, _, _) = setup();
        let mut note = Note::new("Old", "keep me");
        let id = notes.create_note(&mut note).unwrap();

        notes.delete_note(&id).unwrap();
        assert!(notes.fetch_all_notes().unwrap().is_empty());
        let trash = notes.fetch_trash_notes().unwrap();
        assert_eq!(trash.len(), 1);
        assert!(trash[0].deleted && trash[0].deleted_date.is_some());

        // Deleting twice is harmless
        notes.delete_note(&id).unwrap();

        assert_eq!(notes.restore_note(&id).unwrap(), id);
        let restored = notes.get_note_by_id(&id).unwrap().unwrap();
        assert!(!restored.deleted);
        assert_eq!(restored.content, "keep me");
        assert!(notes.fetch_trash_notes().unwrap().is_empty());

        notes.permanently_delete_note(&id).unwrap();
        assert!(notes.get_note_by_id(&id).unwrap().is_none());
        assert!(notes.delete_note(&id).unwrap_err().is_not_found());
        assert!(notes.restore_note(&id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_restore_note_revives_trashed_folder() {
        let (notes, folders, _) = setup();
        let mut work = Folder::new("Work");
        let work_id = folders.create_folder(&mut work).unwrap();
        let mut note = Note::new("Todo", "").in_folder(work_id.clone());
        let note_id = notes.create_note(&mut note).unwrap();

        folders.delete_folder(&work_id).unwrap();
        assert!(notes.fetch_all_notes().unwrap().is_empty());

        notes.restore_note(&note_id).unwrap();
        let folder = folders.get_folder_by_id(&work_id).unwrap().unwrap();
        assert!(!folder.deleted);
        assert_eq!(notes.fetch_notes_by_folder_id(&work_id).unwrap().len(), 1);
    }

    #[test]
    fn test_tag_edges() {
        let (notes, _, tags) = setup();
        let mut urgent = Tag::new("urgent");
        tags.create_tag(&mut urgent).unwrap();

        let mut a = Note::new("A", "");
        let mut b = Note::new("B", "");
        notes.create_note(&mut a).unwrap();
        notes.create_note(&mut b).unwrap();

        notes.add_tag_to_note(&mut a, &urgent).unwrap();
        notes.add_tag_to_note(&mut b, &urgent).unwrap();
        assert!(a.has_tag("urgent"));

        let tag_id = urgent.id.clone().unwrap();
        assert_eq!(notes.fetch_notes_by_tag_id(&tag_id).unwrap().len(), 2);

        notes.remove_tag_from_note(&mut a, &urgent).unwrap();
        assert!(!a.has_tag("urgent"));
        let tagged = notes.fetch_notes_by_tag_id(&tag_id).unwrap();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].title, "B");

        let mut reloaded = b.clone();
        reloaded.tags.clear();
        notes.load_tags(&mut reloaded).unwrap();
        assert_eq!(reloaded.tag_titles(), vec!["urgent".to_string()]);
    }

    #[test]
    fn test_add_tag_requires_both_sides() {
        let (notes, _, _) = setup();
        let mut note = Note::new("A", "");
        let id = notes.create_note(&mut note).unwrap();

        assert!(notes.add_tag(&id, "missing").unwrap_err().is_not_found());
        assert!(notes.add_tag("missing", "t").unwrap_err().is_not_found());
        assert!(matches!(
            notes.add_tag("", "t").unwrap_err(),
            StorageError::InvalidParameter(_)
        ));
    }

    #[test]
    fn test_trashed_notes_leave_tag_listing() {
        let (notes, _, tags) = setup();
        let mut note = Note::new("A", "").with_tags(["urgent"]);
        let id = notes.create_note(&mut note).unwrap();
        let tag_id = note.tags.iter().next().and_then(|t| t.id.clone()).unwrap();

        notes.delete_note(&id).unwrap();
        assert!(tags.fetch_all_notes_with_tag(&tag_id).unwrap().is_empty());
    }
}
