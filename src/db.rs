// 🗄️ Persistence Gateway - Transaction collection ↔ key-value store
// Best-effort: failures are logged and treated as "no data"

use crate::transaction::Transaction;
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use tracing::{debug, warn};

/// Key under which the whole collection is stored.
pub const STORAGE_KEY: &str = "finta.movimentos";

// ============================================================================
// KEY-VALUE STORE
// ============================================================================

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replaces any previous value under `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// SQLite-backed store (one row per key).
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;

        Ok(())
    }
}

/// In-process store, used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .read()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ============================================================================
// TRANSACTION REPOSITORY
// ============================================================================

/// Saves and loads the full collection under [`STORAGE_KEY`].
///
/// Neither operation ever fails from the caller's point of view.
pub struct TransactionRepository<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> TransactionRepository<S> {
    pub fn new(store: S) -> Self {
        TransactionRepository { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Replace the stored collection. Returns whether the write went through.
    pub fn save(&self, transactions: &[Transaction]) -> bool {
        let result = serde_json::to_string(transactions)
            .context("Failed to serialize transactions")
            .and_then(|json| self.store.set(STORAGE_KEY, &json));

        match result {
            Ok(()) => {
                debug!(count = transactions.len(), "Saved transactions");
                true
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "Could not save transactions; continuing");
                false
            }
        }
    }

    /// Stored collection, or empty when absent or unreadable.
    pub fn load(&self) -> Vec<Transaction> {
        let raw = match self.store.get(STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "Could not read stored transactions");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Transaction>>(&raw) {
            Ok(transactions) => {
                debug!(count = transactions.len(), "Loaded transactions");
                transactions
            }
            Err(err) => {
                warn!(%err, "Stored transactions are corrupt; starting empty");
                Vec::new()
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
