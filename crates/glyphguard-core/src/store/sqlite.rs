//! SQLite-backed option store.

use super::traits::OptionStore;
use crate::config::StoreConfig;
use crate::error::{GlyphError, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Option store persisted in a single SQLite database.
///
/// Uses WAL mode for safe concurrent access across processes and
/// `Arc<Mutex<Connection>>` for thread safety within a process.
pub struct SqliteOptionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteOptionStore {
    /// Open the store at `db_path`, creating the database and parent
    /// directories if they don't exist.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| GlyphError::Io {
                    message: format!("Failed to create store directory: {}", parent.display()),
                    path: Some(parent.to_path_buf()),
                    source: Some(e),
                })?;
            }
        }

        let conn = Connection::open(db_path).map_err(|e| GlyphError::Database {
            message: format!("Failed to open option database: {}", e),
            source: Some(e),
        })?;
        Self::configure_connection(&conn)?;
        Self::ensure_schema(&conn)?;

        debug!("Opened option store at {}", db_path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a private in-process database. Nothing survives the handle.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::ensure_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode=WAL;\n\
             PRAGMA busy_timeout={};\n\
             PRAGMA synchronous=NORMAL;",
            StoreConfig::BUSY_TIMEOUT_MS,
        ))?;
        Ok(())
    }

    fn ensure_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS options (
                name TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| GlyphError::Database {
            message: "Failed to acquire option store lock".to_string(),
            source: None,
        })
    }
}

impl OptionStore for SqliteOptionStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let conn = self.lock_conn()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM options WHERE name = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(raw) => {
                let value = serde_json::from_str(&raw).map_err(|e| GlyphError::Json {
                    message: format!("Corrupt value stored under {}: {}", key, e),
                    source: Some(e),
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn update(&self, key: &str, value: &Value) -> Result<bool> {
        let serialized = serde_json::to_string(value)?;
        let now = Utc::now().to_rfc3339();
        let conn = self.lock_conn()?;
        let rows = conn.execute(
            "INSERT INTO options (name, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, serialized, now],
        )?;
        debug!("Wrote option {} ({} bytes)", key, serialized.len());
        Ok(rows > 0)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let conn = self.lock_conn()?;
        let rows = conn.execute("DELETE FROM options WHERE name = ?1", params![key])?;
        if rows > 0 {
            debug!("Deleted option {}", key);
        }
        Ok(rows > 0)
    }
}
