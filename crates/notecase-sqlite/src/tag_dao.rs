//! [`TagDao`] over the `tags` table

use chrono::Utc;
use notecase_core::naming::{require_id, require_title};
use notecase_core::{Note, StorageError, StorageResult, Tag, TagDao};
use rusqlite::params;
use tracing::debug;

use crate::connection::SqlitePool;
use crate::error::SqliteError;
use crate::queries::{active_notes_with_tag, new_id, tag_by_id};
use crate::rows::{tag_from_row, ts};

/// SQLite-backed tag storage
#[derive(Debug, Clone)]
pub struct SqliteTagDao {
    pool: SqlitePool,
}

impl SqliteTagDao {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl TagDao for SqliteTagDao {
    fn create_tag(&self, tag: &mut Tag) -> StorageResult<String> {
        require_title(&tag.title, "tag")?;
        let id = tag.id.clone().unwrap_or_else(new_id);
        require_id(&id, "tag")?;

        self.pool.write("create_tag", |tx| {
            let taken: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM tags WHERE title = ?1)",
                [&tag.title],
                |r| r.get(0),
            )?;
            if taken {
                return Err(SqliteError::Conflict(format!("tag '{}' already exists", tag.title)));
            }
            tx.execute(
                "INSERT INTO tags (tag_id, title, created_date, modified_date) VALUES (?1, ?2, ?3, ?4)",
                params![id, tag.title, ts(&tag.created_date), ts(&tag.modified_date)],
            )?;
            Ok(())
        })?;

        tag.id = Some(id.clone());
        debug!(id = %id, title = %tag.title, "Created tag");
        Ok(id)
    }

    fn update_tag(&self, tag: &mut Tag) -> StorageResult<()> {
        let id = tag
            .id
            .clone()
            .ok_or_else(|| StorageError::invalid("tag has no id; create it first"))?;
        require_id(&id, "tag")?;
        require_title(&tag.title, "tag")?;
        tag.modified_date = Utc::now();

        self.pool.write("update_tag", |tx| {
            let changed = tx.execute(
                "UPDATE tags SET title = ?2, modified_date = ?3 WHERE tag_id = ?1",
                params![id, tag.title, ts(&tag.modified_date)],
            )?;
            if changed == 0 {
                return Err(SqliteError::not_found("tag", &id));
            }
            Ok(())
        })?;
        debug!(id = %id, title = %tag.title, "Updated tag");
        Ok(())
    }

    fn delete_tag(&self, id: &str) -> StorageResult<()> {
        require_id(id, "tag")?;

        self.pool.write("delete_tag", |tx| {
            let edges = tx.execute("DELETE FROM tagsNotes WHERE tag_id = ?1", [id])?;
            if tx.execute("DELETE FROM tags WHERE tag_id = ?1", [id])? == 0 {
                return Err(SqliteError::not_found("tag", id));
            }
            debug!(id, edges, "Deleted tag");
            Ok(())
        })?;
        Ok(())
    }

    fn get_tag_by_id(&self, id: &str) -> StorageResult<Option<Tag>> {
        require_id(id, "tag")?;
        Ok(self.pool.read("get_tag_by_id", |conn| tag_by_id(conn, id))?)
    }

    fn fetch_all_tags(&self) -> StorageResult<Vec<Tag>> {
        Ok(self.pool.read("fetch_all_tags", |conn| {
            let mut stmt = conn.prepare("SELECT * FROM tags ORDER BY title")?;
            let tags = stmt
                .query_map([], tag_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tags)
        })?)
    }

    fn fetch_all_notes_with_tag(&self, tag_id: &str) -> StorageResult<Vec<Note>> {
        require_id(tag_id, "tag")?;
        Ok(self
            .pool
            .read("fetch_all_notes_with_tag", |conn| active_notes_with_tag(conn, tag_id))?)
    }

    fn exists_by_title(&self, title: &str) -> StorageResult<bool> {
        Ok(self.pool.read("tag_exists_by_title", |conn| {
            Ok(conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM tags WHERE title = ?1 COLLATE NOCASE)",
                [title],
                |r| r.get::<_, bool>(0),
            )?)
        })?)
    }
}
