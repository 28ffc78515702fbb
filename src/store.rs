use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Mapping = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("namespace not found: {0}")]
    NotFound(String),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Persistent get/put store of string mappings grouped by namespace.
pub trait KeyedStore: Send + Sync {
    fn get(&self, namespace: &str) -> Result<Mapping, StoreError>;
    fn put(&self, namespace: &str, mapping: &Mapping) -> Result<(), StoreError>;
}

/// SQLite backed store, one JSON document per namespace.
#[derive(Clone)]
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    pub fn new(datadir: &Path) -> Result<Self, StoreError> {
        let store = Self {
            db_path: datadir.join("walletctl.db"),
        };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<(), StoreError> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS store (
                namespace TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }
}

impl KeyedStore for SqliteStore {
    fn get(&self, namespace: &str) -> Result<Mapping, StoreError> {
        let conn = Connection::open(&self.db_path)?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM store WHERE namespace = ?1",
                params![namespace],
                |row| row.get(0),
            )
            .optional()?;
        match payload {
            Some(payload) => Ok(serde_json::from_str(&payload)?),
            None => Err(StoreError::NotFound(namespace.to_string())),
        }
    }

    fn put(&self, namespace: &str, mapping: &Mapping) -> Result<(), StoreError> {
        let now = chrono::Utc::now().timestamp();
        let payload = serde_json::to_string(mapping)?;
        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "INSERT INTO store (namespace, payload, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(namespace) DO UPDATE SET payload = ?2, updated_at = ?3",
            params![namespace, payload, now],
        )?;
        log::debug!("Stored {} entries under {namespace}", mapping.len());
        Ok(())
    }
}
