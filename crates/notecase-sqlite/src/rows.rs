//! Row mapping
//!
//! Columns are read by name. Optional columns that a legacy database lacks
//! read as `None`/`false` instead of failing the whole row.

use chrono::{DateTime, Utc};
use notecase_core::{Folder, Note, Tag, TodoState};
use rusqlite::types::{FromSql, Type};
use rusqlite::Row;

/// Timestamps are stored as RFC 3339 text
pub(crate) fn ts(value: &DateTime<Utc>) -> String {
    value.to_rfc3339()
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn column_index(row: &Row<'_>, name: &str) -> Option<usize> {
    row.as_ref().column_index(name).ok()
}

/// Value of an optional column; absent columns and NULL both read as `None`
fn optional<T: FromSql>(row: &Row<'_>, name: &str) -> rusqlite::Result<Option<T>> {
    match column_index(row, name) {
        Some(idx) => row.get(idx),
        None => Ok(None),
    }
}

fn flag(row: &Row<'_>, name: &str) -> rusqlite::Result<bool> {
    Ok(optional::<i64>(row, name)?.unwrap_or(0) != 0)
}

fn required_ts(row: &Row<'_>, name: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(name)?;
    parse_ts(column_index(row, name).unwrap_or_default(), &raw)
}

fn optional_ts(row: &Row<'_>, name: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    optional::<String>(row, name)?
        .map(|raw| parse_ts(column_index(row, name).unwrap_or_default(), &raw))
        .transpose()
}

pub(crate) fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    let todo = if flag(row, "is_todo")? {
        Some(TodoState {
            due: optional_ts(row, "todo_due")?,
            completed: optional_ts(row, "todo_completed")?,
        })
    } else {
        None
    };

    let mut note = Note::new(row.get::<_, String>("title")?, "");
    note.id = Some(row.get("note_id")?);
    note.content = optional::<String>(row, "content")?.unwrap_or_default();
    note.created_date = required_ts(row, "created_date")?;
    note.modified_date = required_ts(row, "modified_date")?;
    note.parent_id = optional(row, "parent_id")?;
    note.latitude = optional(row, "latitude")?;
    note.longitude = optional(row, "longitude")?;
    note.author = optional(row, "author")?;
    note.source_url = optional(row, "source_url")?;
    note.source = optional(row, "source")?;
    note.source_application = optional(row, "source_application")?;
    note.favorite = flag(row, "is_favorite")?;
    note.pinned = flag(row, "is_pinned")?;
    note.deleted = flag(row, "is_deleted")?;
    note.deleted_date = optional_ts(row, "deleted_date")?;
    note.todo = todo;
    Ok(note)
}

pub(crate) fn folder_from_row(row: &Row<'_>) -> rusqlite::Result<Folder> {
    let mut folder = Folder::new(row.get::<_, String>("title")?);
    folder.id = Some(row.get("folder_id")?);
    folder.created_date = required_ts(row, "created_date")?;
    folder.modified_date = required_ts(row, "modified_date")?;
    folder.parent_id = optional(row, "parent_id")?;
    folder.deleted = flag(row, "is_deleted")?;
    folder.deleted_date = optional_ts(row, "deleted_date")?;
    Ok(folder)
}

pub(crate) fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
    let mut tag = Tag::new(row.get::<_, String>("title")?);
    tag.id = Some(row.get("tag_id")?);
    tag.created_date = required_ts(row, "created_date")?;
    tag.modified_date = required_ts(row, "modified_date")?;
    Ok(tag)
}
