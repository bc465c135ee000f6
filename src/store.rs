//! Local key-value storage for the persisted collections.
//!
//! Values are JSON text blobs stored under fixed keys. Reads are tolerant:
//! a missing or unparsable blob loads as an empty collection. Writes that
//! fail are logged and otherwise ignored, the in-memory copy stays
//! authoritative for the rest of the session.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::error::StoreError;

pub const HISTORY_KEY: &str = "arxivChat_searchHistory";
pub const BOOKMARKS_KEY: &str = "arxivChat_bookmarks";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// SQLite-backed store, one row per key.
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

fn ensure_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

impl SqliteStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        ensure_dir(&path)?;
        let conn = Connection::open(&path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        debug!("opened key-value store at {}", path.display());
        Ok(SqliteStore { conn, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

/// Volatile store. Used in tests and when the database cannot be opened.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    read_only: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects every write, like a full or locked-down storage area.
    pub fn read_only() -> Self {
        MemoryStore {
            values: HashMap::new(),
            read_only: true,
        }
    }

    pub fn with_value(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::Unavailable("store is read-only".to_string()));
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::Unavailable("store is read-only".to_string()));
        }
        self.values.remove(key);
        Ok(())
    }
}

pub fn load_collection<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Vec<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!("could not read {}: {}", key, e);
            return Vec::new();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(items) => items,
        Err(e) => {
            warn!("discarding unparsable data under {}: {}", key, e);
            Vec::new()
        }
    }
}

/// Returns false when the write did not reach the store.
pub fn save_collection<T: Serialize>(store: &mut dyn KeyValueStore, key: &str, items: &[T]) -> bool {
    let json = match serde_json::to_string(items) {
        Ok(json) => json,
        Err(e) => {
            warn!("could not serialize {}: {}", key, e);
            return false;
        }
    };

    match store.set(key, &json) {
        Ok(()) => true,
        Err(e) => {
            warn!("could not persist {}: {}", key, e);
            false
        }
    }
}

pub fn remove_collection(store: &mut dyn KeyValueStore, key: &str) -> bool {
    match store.remove(key) {
        Ok(()) => true,
        Err(e) => {
            warn!("could not remove {}: {}", key, e);
            false
        }
    }
}
