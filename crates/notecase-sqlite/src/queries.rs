//! SQL shared by the three DAOs
//!
//! Every function takes a plain `&Connection`; a `Transaction` derefs to one,
//! so the same helpers run inside `SqlitePool::write` and `SqlitePool::read`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use notecase_core::naming::is_root_id;
use notecase_core::{ComponentRef, Folder, Note, Tag};
use rusqlite::{params, Connection, OptionalExtension, Params};
use uuid::Uuid;

use crate::error::{SqliteError, SqliteResult};
use crate::rows::{folder_from_row, note_from_row, tag_from_row, ts};

/// Folder ids of `?1` and everything below it (cycle-safe through `UNION`)
pub(crate) const SUBTREE_CTE: &str = "WITH RECURSIVE subtree(id) AS (
    SELECT folder_id FROM folders WHERE folder_id = ?1
    UNION
    SELECT f.folder_id FROM folders f JOIN subtree s ON f.parent_id = s.id
)";

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Column value for a parent reference; root is stored as NULL
pub(crate) fn db_parent(parent_id: Option<&str>) -> Option<&str> {
    parent_id.filter(|p| !is_root_id(p))
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

pub(crate) fn notes_where<P: Params>(
    conn: &Connection,
    clause: &str,
    params: P,
) -> SqliteResult<Vec<Note>> {
    let sql = format!("SELECT * FROM notes WHERE {clause} ORDER BY title, note_id");
    let mut stmt = conn.prepare(&sql)?;
    let mut notes = stmt
        .query_map(params, note_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    for note in &mut notes {
        load_note_tags(conn, note)?;
    }
    Ok(notes)
}

pub(crate) fn note_by_id(conn: &Connection, id: &str) -> SqliteResult<Option<Note>> {
    let note = conn
        .query_row("SELECT * FROM notes WHERE note_id = ?1", [id], note_from_row)
        .optional()?;
    match note {
        Some(mut note) => {
            load_note_tags(conn, &mut note)?;
            Ok(Some(note))
        }
        None => Ok(None),
    }
}

pub(crate) fn require_note(conn: &Connection, id: &str) -> SqliteResult<Note> {
    note_by_id(conn, id)?.ok_or_else(|| SqliteError::not_found("note", id))
}

pub(crate) fn insert_note(conn: &Connection, id: &str, note: &Note) -> SqliteResult<()> {
    let todo = note.todo.as_ref();
    conn.execute(
        "INSERT INTO notes (note_id, title, content, created_date, modified_date, latitude,
             longitude, author, source_url, source, source_application, is_todo, todo_due,
             todo_completed, is_favorite, is_pinned, is_deleted, deleted_date, parent_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        params![
            id,
            note.title,
            note.content,
            ts(&note.created_date),
            ts(&note.modified_date),
            note.latitude,
            note.longitude,
            note.author,
            note.source_url,
            note.source,
            note.source_application,
            todo.is_some(),
            todo.and_then(|t| t.due.as_ref()).map(ts),
            todo.and_then(|t| t.completed.as_ref()).map(ts),
            note.favorite,
            note.pinned,
            note.deleted,
            note.deleted_date.as_ref().map(ts),
            db_parent(note.parent_id.as_deref()),
        ],
    )?;
    Ok(())
}

/// Rewrite every column except the id; returns the number of rows touched
pub(crate) fn update_note_row(conn: &Connection, id: &str, note: &Note) -> SqliteResult<usize> {
    let todo = note.todo.as_ref();
    let changed = conn.execute(
        "UPDATE notes SET title = ?2, content = ?3, created_date = ?4, modified_date = ?5,
             latitude = ?6, longitude = ?7, author = ?8, source_url = ?9, source = ?10,
             source_application = ?11, is_todo = ?12, todo_due = ?13, todo_completed = ?14,
             is_favorite = ?15, is_pinned = ?16, is_deleted = ?17, deleted_date = ?18,
             parent_id = ?19
         WHERE note_id = ?1",
        params![
            id,
            note.title,
            note.content,
            ts(&note.created_date),
            ts(&note.modified_date),
            note.latitude,
            note.longitude,
            note.author,
            note.source_url,
            note.source,
            note.source_application,
            todo.is_some(),
            todo.and_then(|t| t.due.as_ref()).map(ts),
            todo.and_then(|t| t.completed.as_ref()).map(ts),
            note.favorite,
            note.pinned,
            note.deleted,
            note.deleted_date.as_ref().map(ts),
            db_parent(note.parent_id.as_deref()),
        ],
    )?;
    Ok(changed)
}

pub(crate) fn set_note_parent(
    conn: &Connection,
    note_id: &str,
    parent_id: Option<&str>,
) -> SqliteResult<()> {
    let changed = conn.execute(
        "UPDATE notes SET parent_id = ?2 WHERE note_id = ?1",
        params![note_id, db_parent(parent_id)],
    )?;
    if changed == 0 {
        return Err(SqliteError::not_found("note", note_id));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

pub(crate) fn tags_of_note(conn: &Connection, note_id: &str) -> SqliteResult<Vec<Tag>> {
    let mut stmt = conn.prepare(
        "SELECT t.* FROM tags t JOIN tagsNotes tn ON tn.tag_id = t.tag_id
         WHERE tn.note_id = ?1 ORDER BY t.title",
    )?;
    let tags = stmt
        .query_map([note_id], tag_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}

fn load_note_tags(conn: &Connection, note: &mut Note) -> SqliteResult<()> {
    if let Some(id) = note.id.clone() {
        note.tags = tags_of_note(conn, &id)?.into_iter().collect();
    }
    Ok(())
}

pub(crate) fn tag_by_id(conn: &Connection, id: &str) -> SqliteResult<Option<Tag>> {
    Ok(conn
        .query_row("SELECT * FROM tags WHERE tag_id = ?1", [id], tag_from_row)
        .optional()?)
}

pub(crate) fn require_tag(conn: &Connection, id: &str) -> SqliteResult<Tag> {
    tag_by_id(conn, id)?.ok_or_else(|| SqliteError::not_found("tag", id))
}

/// Tag with exactly this title, created when missing
pub(crate) fn ensure_tag(conn: &Connection, tag: &Tag) -> SqliteResult<Tag> {
    let existing = conn
        .query_row("SELECT * FROM tags WHERE title = ?1", [&tag.title], tag_from_row)
        .optional()?;
    if let Some(existing) = existing {
        return Ok(existing);
    }
    let id = tag.id.clone().unwrap_or_else(new_id);
    conn.execute(
        "INSERT INTO tags (tag_id, title, created_date, modified_date) VALUES (?1, ?2, ?3, ?4)",
        params![id, tag.title, ts(&tag.created_date), ts(&tag.modified_date)],
    )?;
    Ok(tag.clone().with_id(id))
}

pub(crate) fn link_tag(conn: &Connection, note_id: &str, tag_id: &str) -> SqliteResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO tagsNotes (tag_id, note_id, added_date) VALUES (?1, ?2, ?3)",
        params![tag_id, note_id, ts(&Utc::now())],
    )?;
    Ok(())
}

pub(crate) fn active_notes_with_tag(conn: &Connection, tag_id: &str) -> SqliteResult<Vec<Note>> {
    notes_where(
        conn,
        "is_deleted = 0 AND note_id IN (SELECT note_id FROM tagsNotes WHERE tag_id = ?1)",
        [tag_id],
    )
}

// ---------------------------------------------------------------------------
// Folders
// ---------------------------------------------------------------------------

pub(crate) fn folders_where<P: Params>(
    conn: &Connection,
    clause: &str,
    params: P,
) -> SqliteResult<Vec<Folder>> {
    let sql = format!("SELECT * FROM folders WHERE {clause} ORDER BY title, folder_id");
    let mut stmt = conn.prepare(&sql)?;
    let mut folders = stmt
        .query_map(params, folder_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    for folder in &mut folders {
        fill_children(conn, folder)?;
    }
    Ok(folders)
}

/// Folder row by id, with its active children; the root is synthesized
pub(crate) fn folder_by_id(conn: &Connection, id: &str) -> SqliteResult<Option<Folder>> {
    let folder = if is_root_id(id) {
        Some(Folder::root())
    } else {
        conn.query_row("SELECT * FROM folders WHERE folder_id = ?1", [id], folder_from_row)
            .optional()?
    };
    match folder {
        Some(mut folder) => {
            fill_children(conn, &mut folder)?;
            Ok(Some(folder))
        }
        None => Ok(None),
    }
}

pub(crate) fn require_folder(conn: &Connection, id: &str) -> SqliteResult<Folder> {
    folder_by_id(conn, id)?.ok_or_else(|| SqliteError::not_found("folder", id))
}

/// Fail unless `parent_id` is the root or an active folder
pub(crate) fn require_active_parent(conn: &Connection, parent_id: Option<&str>) -> SqliteResult<()> {
    let Some(parent) = db_parent(parent_id) else {
        return Ok(());
    };
    match folder_by_id(conn, parent)? {
        Some(folder) if !folder.deleted => Ok(()),
        Some(_) => Err(SqliteError::InvalidOperation(format!(
            "folder '{parent}' is in the trash"
        ))),
        None => Err(SqliteError::not_found("folder", parent)),
    }
}

fn fill_children(conn: &Connection, folder: &mut Folder) -> SqliteResult<()> {
    let Some(id) = folder.id.clone() else {
        return Ok(());
    };
    let (folders, notes) = if is_root_id(&id) {
        (
            child_ids(conn, "SELECT folder_id FROM folders WHERE parent_id IS NULL AND is_deleted = 0", [])?,
            child_ids(conn, "SELECT note_id FROM notes WHERE parent_id IS NULL AND is_deleted = 0", [])?,
        )
    } else {
        (
            child_ids(conn, "SELECT folder_id FROM folders WHERE parent_id = ?1 AND is_deleted = 0", [&id])?,
            child_ids(conn, "SELECT note_id FROM notes WHERE parent_id = ?1 AND is_deleted = 0", [&id])?,
        )
    };

    folder.children = folders
        .into_iter()
        .map(ComponentRef::Folder)
        .chain(notes.into_iter().map(ComponentRef::Note))
        .collect();
    Ok(())
}

fn child_ids<P: Params>(conn: &Connection, sql: &str, params: P) -> SqliteResult<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map(params, |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

/// Direct active sub-folders of `id` (`ROOT` means top level)
pub(crate) fn child_folders(conn: &Connection, id: &str) -> SqliteResult<Vec<Folder>> {
    if is_root_id(id) {
        folders_where(conn, "parent_id IS NULL AND is_deleted = 0", [])
    } else {
        folders_where(conn, "parent_id = ?1 AND is_deleted = 0", [id])
    }
}

pub(crate) fn stored_parent_id(conn: &Connection, folder_id: &str) -> SqliteResult<Option<String>> {
    conn.query_row(
        "SELECT parent_id FROM folders WHERE folder_id = ?1",
        [folder_id],
        |r| r.get::<_, Option<String>>(0),
    )
    .optional()?
    .ok_or_else(|| SqliteError::not_found("folder", folder_id))
}

/// Ancestor ids of `folder_id`, nearest first; stops on a repeated id
pub(crate) fn ancestor_ids(
    conn: &Connection,
    folder_id: &str,
    max_depth: Option<usize>,
) -> SqliteResult<Vec<String>> {
    let mut seen: HashSet<String> = HashSet::from([folder_id.to_string()]);
    let mut out = Vec::new();
    if is_root_id(folder_id) {
        return Ok(out);
    }
    let mut current = stored_parent_id(conn, folder_id)?;

    while let Some(parent) = current {
        if max_depth.is_some_and(|max| out.len() >= max) || !seen.insert(parent.clone()) {
            break;
        }
        current = match stored_parent_id(conn, &parent) {
            Ok(next) => next,
            Err(SqliteError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };
        out.push(parent);
    }
    Ok(out)
}

pub(crate) fn touch_folder(conn: &Connection, folder_id: &str, now: &DateTime<Utc>) -> SqliteResult<()> {
    if is_root_id(folder_id) {
        return Ok(());
    }
    conn.execute(
        "UPDATE folders SET modified_date = ?2 WHERE folder_id = ?1",
        params![folder_id, ts(now)],
    )?;
    Ok(())
}

/// Clear the trash flags on every deleted ancestor of a folder
pub(crate) fn restore_ancestors(conn: &Connection, folder_id: Option<&str>) -> SqliteResult<usize> {
    let Some(start) = db_parent(folder_id) else {
        return Ok(0);
    };
    let restored = conn.execute(
        "WITH RECURSIVE up(id) AS (
             SELECT ?1
             UNION
             SELECT f.parent_id FROM folders f JOIN up ON f.folder_id = up.id
             WHERE f.parent_id IS NOT NULL
         )
         UPDATE folders SET is_deleted = 0, deleted_date = NULL
         WHERE is_deleted = 1 AND folder_id IN (SELECT id FROM up)",
        [start],
    )?;
    Ok(restored)
}
