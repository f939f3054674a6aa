//! SQLite connection management
//!
//! Uses a simple Arc<Mutex<Connection>> pattern; all three DAOs of one
//! backend share a single pool, and the mutex serializes their calls.

use crate::error::{SqliteError, SqliteResult};
use crate::schema;
use notecase_config::SqliteConfig;
use parking_lot::Mutex;
use rusqlite::{Connection, Transaction};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Thread-safe SQLite connection wrapper
#[derive(Clone)]
pub struct SqlitePool {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqlitePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlitePool").finish_non_exhaustive()
    }
}

impl SqlitePool {
    /// Open (or create) the database described by `config`
    pub fn new(config: SqliteConfig) -> SqliteResult<Self> {
        info!(path = ?config.path, "Opening SQLite database");

        let conn = if config.is_memory() {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    SqliteError::Connection(format!(
                        "Failed to create directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
            Connection::open(&config.path).map_err(|e| {
                SqliteError::Connection(format!("Failed to open {}: {}", config.path.display(), e))
            })?
        };

        configure_pragmas(&conn, &config)?;
        Self::from_connection(conn)
    }

    /// Create an in-memory pool for testing
    pub fn memory() -> SqliteResult<Self> {
        Self::new(SqliteConfig::memory())
    }

    /// Wrap a connection the caller already opened
    ///
    /// Nothing is opened here. Pending schema migrations are applied, so the
    /// connection must be writable.
    pub fn from_connection(conn: Connection) -> SqliteResult<Self> {
        schema::apply_migrations(&conn)?;
        debug!("SQLite schema ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Execute a closure with the connection
    pub fn with_connection<F, T>(&self, f: F) -> SqliteResult<T>
    where
        F: FnOnce(&Connection) -> SqliteResult<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Execute a closure with mutable access to the connection
    pub fn with_connection_mut<F, T>(&self, f: F) -> SqliteResult<T>
    where
        F: FnOnce(&mut Connection) -> SqliteResult<T>,
    {
        let mut conn = self.conn.lock();
        f(&mut conn)
    }

    /// Read-only access, logging any failure under `operation`
    pub fn read<F, T>(&self, operation: &str, f: F) -> SqliteResult<T>
    where
        F: FnOnce(&Connection) -> SqliteResult<T>,
    {
        self.with_connection(f).map_err(|e| {
            error!(operation, error = %e, "SQLite query failed");
            e
        })
    }

    /// Run `f` inside one transaction
    ///
    /// Commits when `f` returns `Ok`. Otherwise the transaction is rolled back,
    /// the failure is logged under `operation`, and the error is returned.
    pub fn write<F, T>(&self, operation: &str, f: F) -> SqliteResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> SqliteResult<T>,
    {
        self.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            match f(&tx) {
                Ok(value) => {
                    tx.commit()?;
                    debug!(operation, "Transaction committed");
                    Ok(value)
                }
                Err(e) => {
                    if let Err(rollback) = tx.rollback() {
                        error!(operation, error = %rollback, "Rollback failed");
                    }
                    error!(operation, error = %e, "Transaction rolled back");
                    Err(e)
                }
            }
        })
    }
}

/// Apply PRAGMA settings from the configuration
fn configure_pragmas(conn: &Connection, config: &SqliteConfig) -> SqliteResult<()> {
    debug!("Configuring SQLite pragmas");

    if config.wal_mode && !config.is_memory() {
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
    }

    if config.foreign_keys {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    }

    conn.execute_batch(&format!("PRAGMA busy_timeout = {};", config.busy_timeout_ms))?;
    conn.execute_batch(&format!("PRAGMA cache_size = {};", config.cache_size))?;
    conn.execute_batch("PRAGMA temp_store = MEMORY;")?;

    Ok(())
}
