//! [`FolderDao`] over the `folders` adjacency list
//!
//! Sub-tree operations (trash, restore, purge) use a recursive CTE on
//! `parent_id`; `UNION` rather than `UNION ALL` keeps them finite even if the
//! stored hierarchy were cyclic.

use std::collections::HashSet;

use chrono::Utc;
use notecase_core::naming::{is_root_id, require_id, require_title};
use notecase_core::{
    Component, ComponentRef, Folder, FolderDao, Hierarchy, Note, StorageError, StorageResult,
    ROOT_FOLDER_ID,
};
use rusqlite::params;
use tracing::debug;

use crate::connection::SqlitePool;
use crate::error::SqliteError;
use crate::queries::{
    ancestor_ids, child_folders, db_parent, folder_by_id, folders_where, new_id,
    require_active_parent, require_folder, require_note, restore_ancestors, set_note_parent,
    stored_parent_id, touch_folder, SUBTREE_CTE,
};
use crate::rows::ts;

/// SQLite-backed folder storage
#[derive(Debug, Clone)]
pub struct SqliteFolderDao {
    pool: SqlitePool,
}

impl SqliteFolderDao {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn persisted(id: Option<&str>, what: &str) -> StorageResult<String> {
    let id = id.ok_or_else(|| StorageError::invalid(format!("{what} has no id; create it first")))?;
    Ok(require_id(id, what)?.to_string())
}

fn reject_root(id: &str, operation: &str) -> StorageResult<()> {
    if is_root_id(id) {
        return Err(StorageError::invalid(format!("cannot {operation} the root folder")));
    }
    Ok(())
}

impl FolderDao for SqliteFolderDao {
    fn create_folder(&self, folder: &mut Folder) -> StorageResult<String> {
        require_title(&folder.title, "folder")?;
        let id = folder.id.clone().unwrap_or_else(new_id);
        require_id(&id, "folder")?;
        reject_root(&id, "create")?;

        self.pool.write("create_folder", |tx| {
            require_active_parent(tx, folder.parent_id.as_deref())?;
            tx.execute(
                "INSERT INTO folders (folder_id, title, created_date, modified_date, parent_id,
                     is_deleted, deleted_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, NULL)",
                params![
                    id,
                    folder.title,
                    ts(&folder.created_date),
                    ts(&folder.modified_date),
                    db_parent(folder.parent_id.as_deref()),
                ],
            )?;
            Ok(())
        })?;

        folder.id = Some(id.clone());
        folder.parent_id = db_parent(folder.parent_id.as_deref()).map(str::to_string);
        debug!(id = %id, title = %folder.title, "Created folder");
        Ok(id)
    }

    fn update_folder(&self, folder: &mut Folder) -> StorageResult<()> {
        let id = persisted(folder.id.as_deref(), "folder")?;
        reject_root(&id, "update")?;
        require_title(&folder.title, "folder")?;

        self.pool.write("update_folder", |tx| {
            let changed = tx.execute(
                "UPDATE folders SET title = ?2, created_date = ?3, modified_date = ?4
                 WHERE folder_id = ?1",
                params![
                    id,
                    folder.title,
                    ts(&folder.created_date),
                    ts(&folder.modified_date)
                ],
            )?;
            if changed == 0 {
                return Err(SqliteError::not_found("folder", &id));
            }
            Ok(())
        })?;
        debug!(id = %id, "Updated folder");
        Ok(())
    }

    fn delete_folder(&self, id: &str) -> StorageResult<()> {
        require_id(id, "folder")?;
        reject_root(id, "delete")?;
        let now = ts(&Utc::now());

        self.pool.write("delete_folder", |tx| {
            let folder = require_folder(tx, id)?;
            if folder.deleted {
                return Ok(());
            }
            let folders = tx.execute(
                &format!(
                    "{SUBTREE_CTE} UPDATE folders SET is_deleted = 1, deleted_date = ?2
                     WHERE is_deleted = 0 AND folder_id IN (SELECT id FROM subtree)"
                ),
                params![id, now],
            )?;
            let notes = tx.execute(
                &format!(
                    "{SUBTREE_CTE} UPDATE notes SET is_deleted = 1, deleted_date = ?2
                     WHERE is_deleted = 0 AND parent_id IN (SELECT id FROM subtree)"
                ),
                params![id, now],
            )?;
            debug!(id, folders, notes, "Moved folder subtree to trash");
            Ok(())
        })?;
        Ok(())
    }

    fn get_folder_by_id(&self, id: &str) -> StorageResult<Option<Folder>> {
        require_id(id, "folder")?;
        Ok(self.pool.read("get_folder_by_id", |conn| folder_by_id(conn, id))?)
    }

    fn get_folder_by_note_id(&self, note_id: &str) -> StorageResult<Option<Folder>> {
        require_id(note_id, "note")?;
        Ok(self.pool.read("get_folder_by_note_id", |conn| {
            let note = require_note(conn, note_id)?;
            match db_parent(note.parent_id.as_deref()) {
                Some(parent) => folder_by_id(conn, parent),
                None => Ok(None),
            }
        })?)
    }

    fn fetch_all_folders_as_list(&self) -> StorageResult<Vec<Folder>> {
        Ok(self
            .pool
            .read("fetch_all_folders_as_list", |conn| folders_where(conn, "is_deleted = 0", []))?)
    }

    fn add_note(&self, folder: &mut Folder, note: &mut Note) -> StorageResult<()> {
        let folder_id = persisted(folder.id.as_deref(), "folder")?;
        let note_id = persisted(note.id.as_deref(), "note")?;
        let now = Utc::now();

        self.pool.write("add_note", |tx| {
            require_active_parent(tx, Some(&folder_id))?;
            set_note_parent(tx, &note_id, Some(&folder_id))?;
            tx.execute(
                "UPDATE notes SET modified_date = ?2 WHERE note_id = ?1",
                params![note_id, ts(&now)],
            )?;
            touch_folder(tx, &folder_id, &now)
        })?;

        folder.add_child(ComponentRef::Note(note_id.clone()))?;
        note.set_parent_id(db_parent(Some(&folder_id)).map(str::to_string));
        note.modified_date = now;
        if !is_root_id(&folder_id) {
            folder.modified_date = now;
        }
        debug!(folder_id = %folder_id, note_id = %note_id, "Added note to folder");
        Ok(())
    }

    fn remove_note(&self, folder: &mut Folder, note: &mut Note) -> StorageResult<()> {
        let folder_id = persisted(folder.id.as_deref(), "folder")?;
        let note_id = persisted(note.id.as_deref(), "note")?;
        let now = Utc::now();

        self.pool.write("remove_note", |tx| {
            let stored = require_note(tx, &note_id)?;
            if db_parent(stored.parent_id.as_deref()) != db_parent(Some(&folder_id)) {
                return Err(SqliteError::InvalidOperation(format!(
                    "note '{note_id}' is not in folder '{folder_id}'"
                )));
            }
            set_note_parent(tx, &note_id, None)?;
            touch_folder(tx, &folder_id, &now)
        })?;

        folder.remove_child(&ComponentRef::Note(note_id.clone()))?;
        note.set_parent_id(None);
        if !is_root_id(&folder_id) {
            folder.modified_date = now;
        }
        debug!(folder_id = %folder_id, note_id = %note_id, "Removed note from folder");
        Ok(())
    }

    fn add_sub_folder(&self, parent: &mut Folder, child: &mut Folder) -> StorageResult<()> {
        let parent_id = persisted(parent.id.as_deref(), "folder")?;
        let child_id = persisted(child.id.as_deref(), "folder")?;
        reject_root(&child_id, "move")?;
        if parent_id == child_id {
            return Err(StorageError::invalid(format!(
                "folder '{child_id}' cannot contain itself"
            )));
        }
        let now = Utc::now();

        self.pool.write("add_sub_folder", |tx| {
            require_active_parent(tx, Some(&parent_id))?;
            require_folder(tx, &child_id)?;
            if !is_root_id(&parent_id)
                && ancestor_ids(tx, &parent_id, None)?.iter().any(|a| *a == child_id)
            {
                return Err(SqliteError::InvalidOperation(format!(
                    "moving '{child_id}' under '{parent_id}' would create a cycle"
                )));
            }
            tx.execute(
                "UPDATE folders SET parent_id = ?2, modified_date = ?3 WHERE folder_id = ?1",
                params![child_id, db_parent(Some(&parent_id)), ts(&now)],
            )?;
            touch_folder(tx, &parent_id, &now)
        })?;

        parent.add_child(ComponentRef::Folder(child_id.clone()))?;
        child.set_parent_id(db_parent(Some(&parent_id)).map(str::to_string));
        child.modified_date = now;
        if !is_root_id(&parent_id) {
            parent.modified_date = now;
        }
        debug!(parent_id = %parent_id, child_id = %child_id, "Nested folder");
        Ok(())
    }

    fn remove_sub_folder(&self, parent: &mut Folder, child: &mut Folder) -> StorageResult<()> {
        let parent_id = persisted(parent.id.as_deref(), "folder")?;
        let child_id = persisted(child.id.as_deref(), "folder")?;
        reject_root(&child_id, "move")?;
        let now = Utc::now();

        self.pool.write("remove_sub_folder", |tx| {
            let stored = stored_parent_id(tx, &child_id)?;
            if db_parent(stored.as_deref()) != db_parent(Some(&parent_id)) {
                return Err(SqliteError::InvalidOperation(format!(
                    "folder '{child_id}' is not inside '{parent_id}'"
                )));
            }
            tx.execute(
                "UPDATE folders SET parent_id = NULL, modified_date = ?2 WHERE folder_id = ?1",
                params![child_id, ts(&now)],
            )?;
            touch_folder(tx, &parent_id, &now)
        })?;

        parent.remove_child(&ComponentRef::Folder(child_id.clone()))?;
        child.set_parent_id(None);
        child.modified_date = now;
        if !is_root_id(&parent_id) {
            parent.modified_date = now;
        }
        debug!(parent_id = %parent_id, child_id = %child_id, "Moved folder to root");
        Ok(())
    }

    fn load_sub_folders(&self, folder: &Folder, max_depth: Option<usize>) -> StorageResult<Hierarchy> {
        let start_id = persisted(folder.id.as_deref(), "folder")?;

        let collected = self.pool.read("load_sub_folders", |conn| {
            let start = require_folder(conn, &start_id)?;
            let mut seen: HashSet<String> = HashSet::from([start_id.clone()]);
            let mut out = vec![start];
            let mut level = vec![start_id.clone()];
            let mut depth = 0;

            while !level.is_empty() && max_depth.map_or(true, |max| depth < max) {
                depth += 1;
                let mut next = Vec::new();
                for parent in &level {
                    for mut child in child_folders(conn, parent)? {
                        let Some(child_id) = child.id.clone() else { continue };
                        if !seen.insert(child_id.clone()) {
                            continue;
                        }
                        if is_root_id(parent) {
                            child.parent_id = Some(ROOT_FOLDER_ID.to_string());
                        }
                        next.push(child_id);
                        out.push(child);
                    }
                }
                level = next;
            }
            Ok(out)
        })?;

        Hierarchy::from_folders(collected)
    }

    fn load_parent_folders(
        &self,
        folder: &Folder,
        max_depth: Option<usize>,
    ) -> StorageResult<Vec<Folder>> {
        let id = persisted(folder.id.as_deref(), "folder")?;
        Ok(self.pool.read("load_parent_folders", |conn| {
            let mut parents = Vec::new();
            for ancestor in ancestor_ids(conn, &id, max_depth)? {
                match folder_by_id(conn, &ancestor)? {
                    Some(parent) => parents.push(parent),
                    None => break,
                }
            }
            Ok(parents)
        })?)
    }

    fn get_parent_folder(&self, folder_id: &str) -> StorageResult<Option<Folder>> {
        require_id(folder_id, "folder")?;
        if is_root_id(folder_id) {
            return Ok(None);
        }
        Ok(self.pool.read("get_parent_folder", |conn| {
            match stored_parent_id(conn, folder_id)? {
                Some(parent) => folder_by_id(conn, &parent),
                None => Ok(None),
            }
        })?)
    }

    fn get_path_folder(&self, folder_id: &str) -> StorageResult<String> {
        require_id(folder_id, "folder")?;
        if is_root_id(folder_id) {
            return Ok(String::new());
        }
        Ok(self.pool.read("get_path_folder", |conn| {
            let folder = require_folder(conn, folder_id)?;
            let mut titles = vec![folder.title];
            for ancestor in ancestor_ids(conn, folder_id, None)? {
                match folder_by_id(conn, &ancestor)? {
                    Some(parent) => titles.push(parent.title),
                    None => break,
                }
            }
            Ok(titles.iter().rev().map(|t| format!("/{t}")).collect())
        })?)
    }

    fn exists_by_title(&self, title: &str) -> StorageResult<bool> {
        Ok(self.pool.read("folder_exists_by_title", |conn| {
            Ok(conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM folders WHERE title = ?1 COLLATE NOCASE AND is_deleted = 0)",
                [title],
                |r| r.get::<_, bool>(0),
            )?)
        })?)
    }

    fn fetch_trash_folders(&self) -> StorageResult<Vec<Folder>> {
        Ok(self.pool.read("fetch_trash_folders", |conn| {
            folders_where(
                conn,
                "is_deleted = 1 AND (parent_id IS NULL OR parent_id NOT IN
                     (SELECT folder_id FROM folders WHERE is_deleted = 1))",
                [],
            )
        })?)
    }

    fn restore_folder(&self, id: &str) -> StorageResult<String> {
        require_id(id, "folder")?;
        reject_root(id, "restore")?;

        self.pool.write("restore_folder", |tx| {
            let folder = require_folder(tx, id)?;
            if !folder.deleted {
                return Ok(());
            }
            // Only what was trashed together with this folder comes back
            let stamp = folder.deleted_date.as_ref().map(ts);
            let folders = tx.execute(
                &format!(
                    "{SUBTREE_CTE} UPDATE folders SET is_deleted = 0, deleted_date = NULL
                     WHERE folder_id IN (SELECT id FROM subtree)
                       AND (folder_id = ?1 OR deleted_date IS ?2)"
                ),
                params![id, stamp],
            )?;
            let notes = tx.execute(
                &format!(
                    "{SUBTREE_CTE} UPDATE notes SET is_deleted = 0, deleted_date = NULL
                     WHERE parent_id IN (SELECT id FROM subtree) AND deleted_date IS ?2"
                ),
                params![id, stamp],
            )?;
            let ancestors = restore_ancestors(tx, folder.parent_id.as_deref())?;
            debug!(id, folders, notes, ancestors, "Restored folder subtree");
            Ok(())
        })?;
        Ok(id.to_string())
    }

    fn permanently_delete_folder(&self, id: &str) -> StorageResult<()> {
        require_id(id, "folder")?;
        reject_root(id, "delete")?;

        self.pool.write("permanently_delete_folder", |tx| {
            require_folder(tx, id)?;
            tx.execute(
                &format!(
                    "{SUBTREE_CTE} DELETE FROM tagsNotes WHERE note_id IN
                         (SELECT note_id FROM notes WHERE parent_id IN (SELECT id FROM subtree))"
                ),
                [id],
            )?;
            let notes = tx.execute(
                &format!("{SUBTREE_CTE} DELETE FROM notes WHERE parent_id IN (SELECT id FROM subtree)"),
                [id],
            )?;
            let folders = tx.execute(
                &format!("{SUBTREE_CTE} DELETE FROM folders WHERE folder_id IN (SELECT id FROM subtree)"),
                [id],
            )?;
            debug!(id, folders, notes, "Permanently deleted folder subtree");
            Ok(())
        })?;
        Ok(())
    }
}
