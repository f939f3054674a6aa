//! Schema management and migrations
//!
//! Migrations are numbered and recorded in `schema_migrations`; each one is
//! written so that running it against an already-migrated database is a no-op.

use crate::error::{SqliteError, SqliteResult};
use rusqlite::Connection;
use tracing::{debug, info};

/// Schema version - increment when adding a migration
pub const SCHEMA_VERSION: i32 = 2;

type Migration = fn(&Connection) -> SqliteResult<()>;

const MIGRATIONS: [(i32, Migration); 2] = [(1, apply_migration_v1), (2, apply_migration_v2)];

/// Apply all pending migrations
pub fn apply_migrations(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current_version = get_current_version(conn)?;
    debug!(current_version, target_version = SCHEMA_VERSION, "Checking migrations");

    if current_version < SCHEMA_VERSION {
        info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Applying schema migrations"
        );
    }

    for (version, migration) in MIGRATIONS {
        if version > current_version {
            migration(conn)?;
            record_migration(conn, version)?;
            info!(version, "Migration applied");
        }
    }

    Ok(())
}

/// Get current schema version
pub fn get_current_version(conn: &Connection) -> SqliteResult<i32> {
    let version: Option<i32> =
        conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })?;

    Ok(version.unwrap_or(0))
}

/// Record that a migration was applied
fn record_migration(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations (version) VALUES (?)",
        [version],
    )?;
    Ok(())
}

/// Migration v1: notes, folders, tags and the tag/note join table
fn apply_migration_v1(conn: &Connection) -> SqliteResult<()> {
    debug!("Applying migration v1: initial schema");

    conn.execute_batch(SCHEMA_V1)
        .map_err(|e| SqliteError::Schema(format!("Failed to apply v1 schema: {}", e)))
}

/// Migration v2: folder trash columns; back-fill note columns on legacy databases
fn apply_migration_v2(conn: &Connection) -> SqliteResult<()> {
    debug!("Applying migration v2: trash columns");

    ensure_column(conn, "folders", "is_deleted", "INTEGER NOT NULL DEFAULT 0")?;
    ensure_column(conn, "folders", "deleted_date", "TEXT")?;
    ensure_column(conn, "notes", "is_favorite", "INTEGER NOT NULL DEFAULT 0")?;
    ensure_column(conn, "notes", "is_pinned", "INTEGER NOT NULL DEFAULT 0")?;
    ensure_column(conn, "notes", "is_deleted", "INTEGER NOT NULL DEFAULT 0")?;
    ensure_column(conn, "notes", "deleted_date", "TEXT")?;

    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_folders_deleted ON folders(is_deleted);
         CREATE INDEX IF NOT EXISTS idx_notes_deleted ON notes(is_deleted);",
    )
    .map_err(|e| SqliteError::Schema(format!("Failed to apply v2 schema: {}", e)))
}

/// Whether `table` has a column named `column`
pub fn has_column(conn: &Connection, table: &str, column: &str) -> SqliteResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt.query_map([], |row| row.get::<_, String>("name"))?;
    for name in names {
        if name?.eq_ignore_ascii_case(column) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Add `column` to `table` unless it is already there
fn ensure_column(conn: &Connection, table: &str, column: &str, decl: &str) -> SqliteResult<()> {
    if has_column(conn, table, column)? {
        return Ok(());
    }
    debug!(table, column, "Adding missing column");
    conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {decl};"))
        .map_err(|e| SqliteError::Schema(format!("Failed to add {table}.{column}: {}", e)))
}

/// Initial schema SQL
const SCHEMA_V1: &str = r#"
-- Folder hierarchy as an adjacency list; NULL parent means root
CREATE TABLE IF NOT EXISTS folders (
    folder_id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    created_date TEXT NOT NULL,
    modified_date TEXT NOT NULL,
    parent_id TEXT REFERENCES folders(folder_id) ON DELETE CASCADE,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    deleted_date TEXT
);

CREATE INDEX IF NOT EXISTS idx_folders_parent ON folders(parent_id);

CREATE TABLE IF NOT EXISTS notes (
    note_id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    content TEXT NOT NULL DEFAULT '',
    created_date TEXT NOT NULL,
    modified_date TEXT NOT NULL,
    latitude REAL,
    longitude REAL,
    author TEXT,
    source_url TEXT,
    source TEXT,
    source_application TEXT,
    is_todo INTEGER NOT NULL DEFAULT 0,
    todo_due TEXT,
    todo_completed TEXT,
    is_favorite INTEGER NOT NULL DEFAULT 0,
    is_pinned INTEGER NOT NULL DEFAULT 0,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    deleted_date TEXT,
    parent_id TEXT REFERENCES folders(folder_id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_notes_parent ON notes(parent_id);

CREATE TABLE IF NOT EXISTS tags (
    tag_id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL UNIQUE,
    created_date TEXT NOT NULL,
    modified_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tagsNotes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tag_id TEXT NOT NULL REFERENCES tags(tag_id) ON DELETE CASCADE,
    note_id TEXT NOT NULL REFERENCES notes(note_id) ON DELETE CASCADE,
    added_date TEXT NOT NULL,
    UNIQUE(tag_id, note_id)
);

CREATE INDEX IF NOT EXISTS idx_tags_notes_note ON tagsNotes(note_id);
"#;
