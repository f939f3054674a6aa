use crate::model::{Component, Folder, Hierarchy, Note, Tag};
use crate::naming::require_id;
use crate::{StorageError, StorageResult};

/// Note persistence
pub trait NoteDao: Send + Sync {
    /// Persist a new note, assigning its id when absent; returns the id
    fn create_note(&self, note: &mut Note) -> StorageResult<String>;

    fn get_note_by_id(&self, id: &str) -> StorageResult<Option<Note>>;

    /// Persist every field of `note`. Backends that derive ids from titles may
    /// re-key the note; the new id is written back into `note.id`.
    fn update_note(&self, note: &mut Note) -> StorageResult<()>;

    /// Soft delete: the note moves to the trash and stays restorable
    fn delete_note(&self, id: &str) -> StorageResult<()>;

    /// Irreversible removal, from the active set or from the trash
    fn permanently_delete_note(&self, id: &str) -> StorageResult<()>;

    /// Bring a trashed note back; returns its (possibly new) id
    fn restore_note(&self, id: &str) -> StorageResult<String>;

    /// Notes currently in the trash (all have `deleted == true`)
    fn fetch_trash_notes(&self) -> StorageResult<Vec<Note>>;

    /// All active notes (none has `deleted == true`)
    fn fetch_all_notes(&self) -> StorageResult<Vec<Note>>;

    /// Active notes directly inside `folder_id` (`ROOT` for top level)
    fn fetch_notes_by_folder_id(&self, folder_id: &str) -> StorageResult<Vec<Note>>;

    /// Containing folder; `None` for notes at the root
    fn get_folder_of_note(&self, note_id: &str) -> StorageResult<Option<Folder>>;

    fn add_tag(&self, note_id: &str, tag_id: &str) -> StorageResult<()>;

    fn remove_tag(&self, note_id: &str, tag_id: &str) -> StorageResult<()>;

    fn fetch_tags(&self, note_id: &str) -> StorageResult<Vec<Tag>>;

    /// Active notes carrying `tag_id`
    fn fetch_notes_by_tag_id(&self, tag_id: &str) -> StorageResult<Vec<Note>>;

    /// Object-pair form of [`NoteDao::add_tag`]; also updates `note.tags`
    fn add_tag_to_note(&self, note: &mut Note, tag: &Tag) -> StorageResult<()> {
        let note_id = persisted_id(note.id.as_deref(), "note")?;
        let tag_id = persisted_id(tag.id.as_deref(), "tag")?;
        self.add_tag(&note_id, &tag_id)?;
        note.tags.insert(tag.clone());
        Ok(())
    }

    /// Object-pair form of [`NoteDao::remove_tag`]; also updates `note.tags`
    fn remove_tag_from_note(&self, note: &mut Note, tag: &Tag) -> StorageResult<()> {
        let note_id = persisted_id(note.id.as_deref(), "note")?;
        let tag_id = persisted_id(tag.id.as_deref(), "tag")?;
        self.remove_tag(&note_id, &tag_id)?;
        note.tags.remove(tag);
        Ok(())
    }

    /// Replace `note.tags` with the stored associations
    fn load_tags(&self, note: &mut Note) -> StorageResult<()> {
        let note_id = persisted_id(note.id.as_deref(), "note")?;
        note.tags = self.fetch_tags(&note_id)?.into_iter().collect();
        Ok(())
    }
}

/// Folder persistence and hierarchy queries
pub trait FolderDao: Send + Sync {
    /// Persist a new folder under `folder.parent_id` (root if `None`); returns the id
    fn create_folder(&self, folder: &mut Folder) -> StorageResult<String>;

    /// Persist title/timestamps; may re-key the folder (filesystem backend)
    fn update_folder(&self, folder: &mut Folder) -> StorageResult<()>;

    /// Soft delete of the folder and everything below it
    fn delete_folder(&self, id: &str) -> StorageResult<()>;

    fn get_folder_by_id(&self, id: &str) -> StorageResult<Option<Folder>>;

    fn get_folder_by_note_id(&self, note_id: &str) -> StorageResult<Option<Folder>>;

    /// All active folders, flat
    fn fetch_all_folders_as_list(&self) -> StorageResult<Vec<Folder>>;

    /// All active folders linked into one arena
    fn fetch_all_folders_as_tree(&self) -> StorageResult<Hierarchy> {
        Hierarchy::from_folders(self.fetch_all_folders_as_list()?)
    }

    /// Put `note` into `folder`; updates both in-memory sides and the folder's `modified_date`
    fn add_note(&self, folder: &mut Folder, note: &mut Note) -> StorageResult<()>;

    /// Move `note` out of `folder` to the root
    fn remove_note(&self, folder: &mut Folder, note: &mut Note) -> StorageResult<()>;

    /// Nest `child` under `parent`; cycles are rejected
    fn add_sub_folder(&self, parent: &mut Folder, child: &mut Folder) -> StorageResult<()>;

    /// Move `child` out of `parent` to the root
    fn remove_sub_folder(&self, parent: &mut Folder, child: &mut Folder) -> StorageResult<()>;

    /// `folder` and its descendant folders, `max_depth` levels deep (`None` = unbounded)
    fn load_sub_folders(&self, folder: &Folder, max_depth: Option<usize>) -> StorageResult<Hierarchy>;

    /// Ancestors of `folder`, nearest first
    fn load_parent_folders(&self, folder: &Folder, max_depth: Option<usize>) -> StorageResult<Vec<Folder>>;

    /// Fill `folder.parent_id` from storage and return the parent
    fn load_parent_folder(&self, folder: &mut Folder) -> StorageResult<Option<Folder>> {
        let id = persisted_id(folder.id.as_deref(), "folder")?;
        let parent = self.get_parent_folder(&id)?;
        folder.set_parent_id(parent.as_ref().and_then(|p| p.id.clone()));
        if let (Some(parent), Some(me)) = (parent.clone(), folder.component_ref()) {
            let mut parent = parent;
            parent.add_child(me)?;
            return Ok(Some(parent));
        }
        Ok(parent)
    }

    fn get_parent_folder(&self, folder_id: &str) -> StorageResult<Option<Folder>>;

    /// `"/A/B"` path from the root; the root itself is `""`
    fn get_path_folder(&self, folder_id: &str) -> StorageResult<String>;

    /// Whether an active folder with this title exists
    fn exists_by_title(&self, title: &str) -> StorageResult<bool>;

    /// Trashed folders (the roots of trashed subtrees)
    fn fetch_trash_folders(&self) -> StorageResult<Vec<Folder>>;

    /// Bring a trashed folder back; returns its (possibly new) id
    fn restore_folder(&self, id: &str) -> StorageResult<String>;

    fn permanently_delete_folder(&self, id: &str) -> StorageResult<()>;

    /// Reconcile any in-memory cache with storage; no-op for uncached backends
    fn refresh_cache(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Tag persistence
pub trait TagDao: Send + Sync {
    fn create_tag(&self, tag: &mut Tag) -> StorageResult<String>;

    fn update_tag(&self, tag: &mut Tag) -> StorageResult<()>;

    fn delete_tag(&self, id: &str) -> StorageResult<()>;

    fn get_tag_by_id(&self, id: &str) -> StorageResult<Option<Tag>>;

    fn fetch_all_tags(&self) -> StorageResult<Vec<Tag>>;

    /// Active notes carrying `tag_id`
    fn fetch_all_notes_with_tag(&self, tag_id: &str) -> StorageResult<Vec<Note>>;

    fn exists_by_title(&self, title: &str) -> StorageResult<bool>;
}

/// Id of an entity that must already be persisted
fn persisted_id(id: Option<&str>, what: &str) -> StorageResult<String> {
    let id = id.ok_or_else(|| StorageError::invalid(format!("{what} has no id; create it first")))?;
    Ok(require_id(id, what)?.to_string())
}

