//! Durable key/value client state.
//!
//! Each collaborator owns a fixed key and stores one JSON document under it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rusqlite::OptionalExtension;

use tribune_core::error::TribuneError;

use crate::db::Database;

/// Conversation log, a JSON array of messages.
pub const CONVERSATION_KEY: &str = "tribune.conversation";
/// Offline response cache, a JSON object of normalized question to answer.
pub const RESPONSE_CACHE_KEY: &str = "tribune.response_cache";
/// Provider keys, written by the settings collaborator.
pub const SETTINGS_KEY: &str = "tribune.settings.api_keys";

/// Key/value persistence for client state.
pub trait StateStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, TribuneError>;
    fn write(&self, key: &str, value: &str) -> Result<(), TribuneError>;
    fn remove(&self, key: &str) -> Result<(), TribuneError>;
}

/// [`StateStore`] backed by the `kv_state` SQLite table.
#[derive(Debug)]
pub struct SqliteStateStore {
    db: Arc<Database>,
}

impl SqliteStateStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl StateStore for SqliteStateStore {
    fn read(&self, key: &str) -> Result<Option<String>, TribuneError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM kv_state WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| TribuneError::Storage(format!("Failed to read {}: {}", key, e)))
        })
    }

    fn write(&self, key: &str, value: &str) -> Result<(), TribuneError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv_state (key, value, updated_at)
                 VALUES (?1, ?2, strftime('%s', 'now'))
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at",
                rusqlite::params![key, value],
            )
            .map_err(|e| TribuneError::Storage(format!("Failed to write {}: {}", key, e)))?;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> Result<(), TribuneError> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM kv_state WHERE key = ?1", rusqlite::params![key])
                .map_err(|e| TribuneError::Storage(format!("Failed to remove {}: {}", key, e)))?;
            Ok(())
        })
    }
}

/// Process-local [`StateStore`], used for ephemeral sessions and tests.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    entries: Mutex<HashMap<String, String>>,
    writes: Mutex<u64>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> u64 {
        self.writes.lock().map(|w| *w).unwrap_or(0)
    }
}

impl StateStore for MemoryStateStore {
    fn read(&self, key: &str) -> Result<Option<String>, TribuneError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| TribuneError::Storage(format!("state lock poisoned: {}", e)))?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), TribuneError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| TribuneError::Storage(format!("state lock poisoned: {}", e)))?;
        entries.insert(key.to_string(), value.to_string());
        if let Ok(mut writes) = self.writes.lock() {
            *writes += 1;
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), TribuneError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| TribuneError::Storage(format!("state lock poisoned: {}", e)))?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_store() -> SqliteStateStore {
        SqliteStateStore::new(Arc::new(Database::in_memory().unwrap()))
    }

    #[test]
    fn test_sqlite_read_missing_key() {
        assert_eq!(sqlite_store().read("absent").unwrap(), None);
    }

    #[test]
    fn test_sqlite_write_then_overwrite() {
        let store = sqlite_store();
        store.write(CONVERSATION_KEY, "[]").unwrap();
        store.write(CONVERSATION_KEY, "[1]").unwrap();
        assert_eq!(store.read(CONVERSATION_KEY).unwrap().as_deref(), Some("[1]"));
    }

    #[test]
    fn test_sqlite_keys_are_independent() {
        let store = sqlite_store();
        store.write(CONVERSATION_KEY, "[]").unwrap();
        store.write(RESPONSE_CACHE_KEY, "{}").unwrap();
        store.remove(CONVERSATION_KEY).unwrap();
        assert_eq!(store.read(CONVERSATION_KEY).unwrap(), None);
        assert_eq!(store.read(RESPONSE_CACHE_KEY).unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_sqlite_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.db");
        {
            let store = SqliteStateStore::new(Arc::new(Database::new(&path).unwrap()));
            store.write(SETTINGS_KEY, r#"{"chatProviderKey":"k"}"#).unwrap();
        }
        let store = SqliteStateStore::new(Arc::new(Database::new(&path).unwrap()));
        assert!(store.read(SETTINGS_KEY).unwrap().unwrap().contains("chatProviderKey"));
    }

    #[test]
    fn test_memory_store_counts_writes() {
        let store = MemoryStateStore::new();
        assert_eq!(store.write_count(), 0);
        store.write("a", "1").unwrap();
        store.write("a", "2").unwrap();
        assert_eq!(store.write_count(), 2);
        assert_eq!(store.read("a").unwrap().as_deref(), Some("2"));
        store.remove("a").unwrap();
        assert_eq!(store.read("a").unwrap(), None);
    }
}
