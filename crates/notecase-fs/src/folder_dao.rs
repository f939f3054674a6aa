//! [`FolderDao`] over directories
//!
//! Folder ids are directory paths, so moving or renaming a folder changes the
//! id of the folder and of everything below it. The in-memory objects passed
//! to the edge operations are updated with their new ids.

use std::sync::Arc;

use notecase_core::naming::{
    is_root_id, is_same_or_nested, last_segment, normalize_id, parent_of, require_id,
    require_title, sanitize_file_name,
};
use notecase_core::{
    Component, ComponentRef, Folder, FolderDao, Hierarchy, Note, StorageError, StorageResult,
    ROOT_FOLDER_ID,
};
use tracing::{debug, warn};

use crate::error::{at_boundary, FsResult};
use crate::manifest::EntryKind;
use crate::store::FsStore;

/// Filesystem-backed folder storage
#[derive(Debug, Clone)]
pub struct FsFolderDao {
    store: Arc<FsStore>,
}

impl FsFolderDao {
    pub fn new(store: Arc<FsStore>) -> Self {
        Self { store }
    }

    fn require_folder(&self, id: &str) -> FsResult<Folder> {
        match self.store.load_folder(id)? {
            Some(folder) => Ok(folder),
            None => Err(StorageError::not_found(format!("folder '{id}'")).into()),
        }
    }

    fn active_folders(&self) -> FsResult<Vec<Folder>> {
        let mut folders = Vec::new();
        for id in self.store.folder_ids() {
            if let Some(folder) = self.store.load_folder(&id)? {
                folders.push(folder);
            }
        }
        folders.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        Ok(folders)
    }

    fn ancestors(&self, id: &str, max_depth: Option<usize>) -> FsResult<Vec<Folder>> {
        let mut out = Vec::new();
        let mut current = parent_of(id).map(str::to_string);
        while let Some(parent) = current {
            if max_depth.is_some_and(|max| out.len() >= max) {
                break;
            }
            let Some(folder) = self.store.load_folder(&parent)? else { break };
            current = parent_of(&parent).map(str::to_string);
            out.push(folder);
        }
        Ok(out)
    }

    fn sub_folders(&self, start: &str, max_depth: Option<usize>) -> FsResult<Hierarchy> {
        let start = normalize_id(start);
        let start_depth = if is_root_id(&start) {
            0
        } else {
            start.split('/').count()
        };
        let mut collected = vec![self.require_folder(&start)?];

        for id in self.store.folder_ids() {
            let nested = is_root_id(&start) || (id != start && is_same_or_nested(&id, &start));
            if !nested {
                continue;
            }
            let depth = id.split('/').count() - start_depth;
            if max_depth.is_some_and(|max| depth > max) {
                continue;
            }
            if let Some(mut folder) = self.store.load_folder(&id)? {
                if folder.parent_id.is_none() {
                    folder.parent_id = Some(ROOT_FOLDER_ID.to_string());
                }
                collected.push(folder);
            }
        }
        Ok(Hierarchy::from_folders(collected)?)
    }
}

fn persisted(id: Option<&str>, what: &str) -> StorageResult<String> {
    let id = id.ok_or_else(|| StorageError::invalid(format!("{what} has no id; create it first")))?;
    Ok(normalize_id(require_id(id, what)?))
}

fn reject_root(id: &str, operation: &str) -> StorageResult<()> {
    if is_root_id(id) {
        return Err(StorageError::invalid(format!("cannot {operation} the root folder")));
    }
    Ok(())
}

impl FolderDao for FsFolderDao {
    fn create_folder(&self, folder: &mut Folder) -> StorageResult<String> {
        require_title(&folder.title, "folder")?;
        let parent = folder.parent_id.clone();
        let id = at_boundary(
            "create_folder",
            parent.as_deref().unwrap_or_default(),
            self.store.create_folder_dir(parent.as_deref(), &folder.title),
        )?;

        folder.id = Some(id.clone());
        folder.title = last_segment(&id).to_string();
        folder.parent_id = parent_of(&id).map(str::to_string);
        debug!(id = %id, "Created folder");
        Ok(id)
    }

    fn update_folder(&self, folder: &mut Folder) -> StorageResult<()> {
        let mut id = persisted(folder.id.as_deref(), "folder")?;
        reject_root(&id, "update")?;
        require_title(&folder.title, "folder")?;
        at_boundary("update_folder", &id, self.require_folder(&id))?;

        let name = last_segment(&id);
        if folder.title != name && sanitize_file_name(&folder.title) != name {
            match self.store.rename(&id, &folder.title, EntryKind::Folder) {
                Ok(new_id) => id = new_id,
                Err(e) => warn!(id = %id, error = %e, "Rename failed, keeping the old directory name"),
            }
        }

        let stored = at_boundary("update_folder", &id, self.require_folder(&id))?;
        folder.id = stored.id;
        folder.title = stored.title;
        folder.parent_id = stored.parent_id;
        folder.children = stored.children;
        folder.modified_date = stored.modified_date;
        debug!(id = %id, "Updated folder");
        Ok(())
    }

    fn delete_folder(&self, id: &str) -> StorageResult<()> {
        require_id(id, "folder")?;
        reject_root(id, "delete")?;
        let trash_id = at_boundary("delete_folder", id, self.store.trash(id, EntryKind::Folder))?;
        debug!(id, trash_id = %trash_id, "Moved folder to trash");
        Ok(())
    }

    fn get_folder_by_id(&self, id: &str) -> StorageResult<Option<Folder>> {
        require_id(id, "folder")?;
        at_boundary("get_folder_by_id", id, self.store.load_folder(id))
    }

    fn get_folder_by_note_id(&self, note_id: &str) -> StorageResult<Option<Folder>> {
        require_id(note_id, "note")?;
        let note = at_boundary("get_folder_by_note_id", note_id, self.store.read_note(note_id))?
            .ok_or_else(|| StorageError::not_found(format!("note '{note_id}'")))?;
        match note.parent_id {
            Some(parent) => at_boundary("get_folder_by_note_id", note_id, self.store.load_folder(&parent)),
            None => Ok(None),
        }
    }

    fn fetch_all_folders_as_list(&self) -> StorageResult<Vec<Folder>> {
        at_boundary("fetch_all_folders_as_list", "", self.active_folders())
    }

    fn add_note(&self, folder: &mut Folder, note: &mut Note) -> StorageResult<()> {
        let folder_id = persisted(folder.id.as_deref(), "folder")?;
        let note_id = persisted(note.id.as_deref(), "note")?;
        let new_id = at_boundary(
            "add_note",
            &note_id,
            self.store.move_into(&note_id, Some(&folder_id), EntryKind::Note),
        )?;

        folder.add_child(ComponentRef::Note(new_id.clone()))?;
        folder.touch();
        self.store.fill_identity(note, &new_id);
        debug!(folder_id = %folder_id, note_id = %new_id, "Added note to folder");
        Ok(())
    }

    fn remove_note(&self, folder: &mut Folder, note: &mut Note) -> StorageResult<()> {
        let folder_id = persisted(folder.id.as_deref(), "folder")?;
        let note_id = persisted(note.id.as_deref(), "note")?;
        let in_folder = match parent_of(&note_id) {
            Some(parent) => parent == folder_id,
            None => is_root_id(&folder_id),
        };
        if !in_folder {
            return Err(StorageError::invalid(format!(
                "note '{note_id}' is not in folder '{folder_id}'"
            )));
        }

        let new_id = at_boundary(
            "remove_note",
            &note_id,
            self.store.move_into(&note_id, None, EntryKind::Note),
        )?;

        folder.remove_child(&ComponentRef::Note(note_id.clone()))?;
        folder.touch();
        self.store.fill_identity(note, &new_id);
        debug!(folder_id = %folder_id, note_id = %new_id, "Moved note to root");
        Ok(())
    }

    fn add_sub_folder(&self, parent: &mut Folder, child: &mut Folder) -> StorageResult<()> {
        let parent_id = persisted(parent.id.as_deref(), "folder")?;
        let child_id = persisted(child.id.as_deref(), "folder")?;
        reject_root(&child_id, "move")?;
        if !is_root_id(&parent_id) && is_same_or_nested(&parent_id, &child_id) {
            return Err(StorageError::invalid(format!(
                "moving '{child_id}' under '{parent_id}' would create a cycle"
            )));
        }

        let new_id = at_boundary(
            "add_sub_folder",
            &child_id,
            self.store.move_into(&child_id, Some(&parent_id), EntryKind::Folder),
        )?;

        parent.add_child(ComponentRef::Folder(new_id.clone()))?;
        parent.touch();
        child.id = Some(new_id.clone());
        child.title = last_segment(&new_id).to_string();
        child.set_parent_id(parent_of(&new_id).map(str::to_string));
        debug!(parent_id = %parent_id, child_id = %new_id, "Nested folder");
        Ok(())
    }

    fn remove_sub_folder(&self, parent: &mut Folder, child: &mut Folder) -> StorageResult<()> {
        let parent_id = persisted(parent.id.as_deref(), "folder")?;
        let child_id = persisted(child.id.as_deref(), "folder")?;
        reject_root(&child_id, "move")?;
        if parent_of(&child_id) != Some(parent_id.as_str()) {
            return Err(StorageError::invalid(format!(
                "folder '{child_id}' is not inside '{parent_id}'"
            )));
        }

        let new_id = at_boundary(
            "remove_sub_folder",
            &child_id,
            self.store.move_into(&child_id, None, EntryKind::Folder),
        )?;

        parent.remove_child(&ComponentRef::Folder(child_id.clone()))?;
        parent.touch();
        child.id = Some(new_id.clone());
        child.title = last_segment(&new_id).to_string();
        child.set_parent_id(None);
        debug!(parent_id = %parent_id, child_id = %new_id, "Moved folder to root");
        Ok(())
    }

    fn load_sub_folders(&self, folder: &Folder, max_depth: Option<usize>) -> StorageResult<Hierarchy> {
        let id = persisted(folder.id.as_deref(), "folder")?;
        at_boundary("load_sub_folders", &id, self.sub_folders(&id, max_depth))
    }

    fn load_parent_folders(
        &self,
        folder: &Folder,
        max_depth: Option<usize>,
    ) -> StorageResult<Vec<Folder>> {
        let id = persisted(folder.id.as_deref(), "folder")?;
        at_boundary("load_parent_folders", &id, self.ancestors(&id, max_depth))
    }

    fn get_parent_folder(&self, folder_id: &str) -> StorageResult<Option<Folder>> {
        require_id(folder_id, "folder")?;
        if is_root_id(folder_id) {
            return Ok(None);
        }
        at_boundary("get_parent_folder", folder_id, self.require_folder(folder_id))?;
        match parent_of(folder_id) {
            Some(parent) => at_boundary("get_parent_folder", folder_id, self.store.load_folder(parent)),
            None => Ok(None),
        }
    }

    fn get_path_folder(&self, folder_id: &str) -> StorageResult<String> {
        require_id(folder_id, "folder")?;
        if is_root_id(folder_id) {
            return Ok(String::new());
        }
        let folder = at_boundary("get_path_folder", folder_id, self.require_folder(folder_id))?;
        let ancestors = at_boundary("get_path_folder", folder_id, self.ancestors(folder_id, None))?;
        let mut path: String = ancestors.iter().rev().map(|f| format!("/{}", f.title)).collect();
        path.push('/');
        path.push_str(&folder.title);
        Ok(path)
    }

    fn exists_by_title(&self, title: &str) -> StorageResult<bool> {
        Ok(self
            .store
            .folder_ids()
            .iter()
            .any(|id| last_segment(id).eq_ignore_ascii_case(title)))
    }

    fn fetch_trash_folders(&self) -> StorageResult<Vec<Folder>> {
        at_boundary("fetch_trash_folders", "", self.store.trashed_folders())
    }

    fn restore_folder(&self, id: &str) -> StorageResult<String> {
        require_id(id, "folder")?;
        reject_root(id, "restore")?;
        at_boundary("restore_folder", id, self.store.restore(id, EntryKind::Folder))
    }

    fn permanently_delete_folder(&self, id: &str) -> StorageResult<()> {
        require_id(id, "folder")?;
        reject_root(id, "delete")?;
        at_boundary("permanently_delete_folder", id, self.store.purge(id, EntryKind::Folder))
    }

    fn refresh_cache(&self) -> StorageResult<()> {
        at_boundary("refresh_cache", "", self.store.refresh_cache())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note_dao::FsNoteDao;
    use notecase_core::NoteDao;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FsFolderDao, FsNoteDao) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FsStore::open_root(dir.path()).unwrap());
        (dir, FsFolderDao::new(store.clone()), FsNoteDao::new(store))
    }

    fn folder(dao: &FsFolderDao, title: &str, parent: Option<&str>) -> Folder {
        let mut folder = Folder::new(title);
        folder.parent_id = parent.map(str::to_string);
        dao.create_folder(&mut folder).unwrap();
        folder
    }

    #[test]
    fn test_same_title_is_disambiguated() {
        let (dir, folders, _) = setup();
        let a = folder(&folders, "Work", None);
        let b = folder(&folders, "Work", None);

        assert_eq!(a.id.as_deref(), Some("Work"));
        assert_eq!(b.id.as_deref(), Some("Work (1)"));
        assert_eq!(b.title, "Work (1)");
        assert!(dir.path().join("Work (1)").is_dir());
        assert_eq!(folders.fetch_all_folders_as_list().unwrap().len(), 2);
    }

    #[test]
    fn test_create_under_missing_parent_fails() {
        let (_dir, folders, _) = setup();
        let mut orphan = Folder::new("Orphan").with_parent("Nowhere");
        assert!(folders.create_folder(&mut orphan).unwrap_err().is_not_found());
    }

    #[test]
    fn test_rename_moves_children() {
        let (dir, folders, notes) = setup();
        let mut work = folder(&folders, "Work", None);
        let mut note = Note::new("Todo", "milk").in_folder("Work");
        notes.create_note(&mut note).unwrap();

        work.title = "Job".into();
        folders.update_folder(&mut work).unwrap();

        assert_eq!(work.id.as_deref(), Some("Job"));
        assert!(dir.path().join("Job/Todo.md").is_file());
        assert!(folders.get_folder_by_id("Work").unwrap().is_none());
        let moved = notes.fetch_notes_by_folder_id("Job").unwrap();
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].content, "milk");
        assert_eq!(work.child_note_ids().collect::<Vec<_>>(), ["Job/Todo.md"]);
    }

    #[test]
    fn test_paths_and_parents() {
        let (_dir, folders, _) = setup();
        folder(&folders, "A", None);
        folder(&folders, "B", Some("A"));
        let c = folder(&folders, "C", Some("A/B"));

        assert_eq!(folders.get_path_folder("A/B").unwrap(), "/A/B");
        assert_eq!(folders.get_path_folder("A/B/C").unwrap(), "/A/B/C");
        assert_eq!(folders.get_path_folder(ROOT_FOLDER_ID).unwrap(), "");

        let parents = folders.load_parent_folders(&c, None).unwrap();
        let titles: Vec<_> = parents.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, ["B", "A"]);
        assert_eq!(folders.load_parent_folders(&c, Some(1)).unwrap().len(), 1);
        assert_eq!(
            folders.get_parent_folder("A/B/C").unwrap().and_then(|f| f.id),
            Some("A/B".to_string())
        );
        assert!(folders.get_parent_folder("A").unwrap().is_none());
        assert!(folders.get_path_folder("Z").unwrap_err().is_not_found());
    }

    #[test]
    fn test_sub_folders_depth() {
        let (_dir, folders, _) = setup();
        let a = folder(&folders, "A", None);
        folder(&folders, "B", Some("A"));
        folder(&folders, "C", Some("A/B"));

        assert_eq!(folders.load_sub_folders(&a, None).unwrap().len(), 3);
        let shallow = folders.load_sub_folders(&a, Some(1)).unwrap();
        assert_eq!(shallow.len(), 2);
        assert_eq!(shallow.children_of("A").len(), 1);

        let tree = folders.load_sub_folders(&Folder::root(), None).unwrap();
        assert_eq!(tree.children_of(ROOT_FOLDER_ID).len(), 1);
        let path = folders.get_path_folder("A/B/C").unwrap();
        assert_eq!(tree.path_of("A/B/C"), Some(path));
        assert_eq!(tree.path_of("A/B/C").as_deref(), Some("/A/B/C"));
    }

    #[test]
    fn test_add_note_moves_file() {
        let (dir, folders, notes) = setup();
        let mut work = folder(&folders, "Work", None);
        let mut note = Note::new("Loose", "x");
        notes.create_note(&mut note).unwrap();

        folders.add_note(&mut work, &mut note).unwrap();

        assert_eq!(note.id.as_deref(), Some("Work/Loose.md"));
        assert_eq!(note.parent_id.as_deref(), Some("Work"));
        assert!(dir.path().join("Work/Loose.md").is_file());
        assert!(work.children.contains(&ComponentRef::Note("Work/Loose.md".into())));

        folders.remove_note(&mut work, &mut note).unwrap();
        assert_eq!(note.id.as_deref(), Some("Loose.md"));
        assert!(note.parent_id.is_none());
        assert!(work.is_empty());
    }

    #[test]
    fn test_sub_folder_cycle_rejected() {
        let (_dir, folders, _) = setup();
        let mut a = folder(&folders, "A", None);
        let mut b = folder(&folders, "B", None);

        folders.add_sub_folder(&mut a, &mut b).unwrap();
        assert_eq!(b.id.as_deref(), Some("A/B"));

        let err = folders.add_sub_folder(&mut b, &mut a).unwrap_err();
        assert!(matches!(err, StorageError::InvalidParameter(_)));

        folders.remove_sub_folder(&mut a, &mut b).unwrap();
        assert_eq!(b.id.as_deref(), Some("B"));
        assert_eq!(folders.get_path_folder("B").unwrap(), "/B");
    }

    #[test]
    fn test_trash_and_restore_folder() {
        let (dir, folders, notes) = setup();
        folder(&folders, "Work", None);
        let mut note = Note::new("Todo", "milk").in_folder("Work");
        notes.create_note(&mut note).unwrap();

        folders.delete_folder("Work").unwrap();

        assert!(folders.fetch_all_folders_as_list().unwrap().is_empty());
        assert!(dir.path().join(".trash/Work/Todo.md").is_file());
        let trash = folders.fetch_trash_folders().unwrap();
        assert_eq!(trash.len(), 1);
        assert!(trash[0].deleted && trash[0].deleted_date.is_some());
        let trashed_notes = notes.fetch_trash_notes().unwrap();
        assert!(trashed_notes.iter().all(|n| n.deleted));

        let restored = folders.restore_folder(".trash/Work").unwrap();
        assert_eq!(restored, "Work");
        let back = notes.fetch_notes_by_folder_id("Work").unwrap();
        assert_eq!(back.len(), 1);
        assert!(!back[0].deleted);
        assert!(folders.fetch_trash_folders().unwrap().is_empty());
    }

    #[test]
    fn test_trashed_note_dir_is_not_a_trashed_folder() {
        let (_dir, folders, notes) = setup();
        folder(&folders, "Work", None);
        let mut note = Note::new("Todo", "").in_folder("Work");
        let id = notes.create_note(&mut note).unwrap();

        notes.delete_note(&id).unwrap();

        assert!(folders.fetch_trash_folders().unwrap().is_empty());
        assert_eq!(folders.fetch_all_folders_as_list().unwrap().len(), 1);
    }

    #[test]
    fn test_permanent_delete_purges_cache() {
        let (dir, folders, notes) = setup();
        folder(&folders, "Work", None);
        let mut note = Note::new("Todo", "").in_folder("Work");
        notes.create_note(&mut note).unwrap();

        folders.permanently_delete_folder("Work").unwrap();

        assert!(!dir.path().join("Work").exists());
        assert!(notes.fetch_all_notes().unwrap().is_empty());
        assert!(folders.get_folder_by_id("Work").unwrap().is_none());
        assert!(folders.permanently_delete_folder(ROOT_FOLDER_ID).is_err());
    }

    #[test]
    fn test_refresh_picks_up_external_changes() {
        let (dir, folders, _) = setup();
        fs::create_dir_all(dir.path().join("Outside/Inner")).unwrap();

        folders.refresh_cache().unwrap();

        let titles: Vec<_> = folders
            .fetch_all_folders_as_list()
            .unwrap()
            .into_iter()
            .map(|f| f.title)
            .collect();
        assert_eq!(titles, ["Inner", "Outside"]);
        assert!(folders.exists_by_title("outside").unwrap());
    }

    #[test]
    fn test_unchanged_update_keeps_disambiguated_id() {
        let (dir, folders, _) = setup();
        folder(&folders, "Work", None);
        let mut second = folder(&folders, "Work", None);
        let mut home = folder(&folders, "Home", None);

        folders.update_folder(&mut second).unwrap();
        assert_eq!(second.id.as_deref(), Some("Work (1)"));
        assert!(dir.path().join("Work (1)").is_dir());
        assert!(!dir.path().join("Work _1_").exists());

        folders.add_sub_folder(&mut home, &mut second).unwrap();
        assert_eq!(second.id.as_deref(), Some("Home/Work (1)"));
        assert_eq!(second.title, "Work (1)");
    }

    #[test]
    fn test_failed_rename_keeps_folder() {
        let (dir, folders, _) = setup();
        let mut work = folder(&folders, "Work", None);

        work.title = "a".repeat(300);
        folders.update_folder(&mut work).unwrap();

        assert_eq!(work.id.as_deref(), Some("Work"));
        assert_eq!(work.title, "Work");
        assert!(dir.path().join("Work").is_dir());
    }

    #[test]
    fn test_folder_operations_refuse_note_ids() {
        let (dir, folders, notes) = setup();
        folder(&folders, "Work", None);
        let todo = notes.create_note(&mut Note::new("Todo", "milk").in_folder("Work")).unwrap();

        assert!(folders.permanently_delete_folder(&todo).unwrap_err().is_not_found());
        assert!(folders.delete_folder(&todo).is_err());
        assert!(dir.path().join("Work/Todo.md").is_file());

        notes.delete_note(&todo).unwrap();
        assert!(folders.restore_folder(".trash/Work/Todo.md").is_err());
        assert!(folders.restore_folder(&todo).is_err());
        assert!(dir.path().join(".trash/Work/Todo.md").is_file());
    }
}
