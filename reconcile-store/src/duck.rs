//! DuckDB-backed entity store.
//!
//! Entities are stored one row per key with their attributes as a JSON
//! text column. Shadow values are never written.

use duckdb::Connection;
use reconcile_model::Entity;
use reconcile_types::EntityKey;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{EntityStore, StorageError, StorageResult};

/// Entity store persisted in a DuckDB database.
pub struct DuckDbEntityStore {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbEntityStore {
    /// Opens (or creates) a database file.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = open_duckdb_with_wal_recovery(path)?;
        Self::open_with_conn(Arc::new(Mutex::new(conn)))
    }

    /// Opens a throwaway in-memory database.
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::open_with_conn(Arc::new(Mutex::new(conn)))
    }

    /// Uses a connection shared with other components.
    pub fn open_with_conn(conn: Arc<Mutex<Connection>>) -> StorageResult<Self> {
        let store = Self { conn };
        store.ensure_tables()?;
        Ok(store)
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Storage(format!("connection lock poisoned: {e}")))
    }

    fn ensure_tables(&self) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS entities (
                key VARCHAR PRIMARY KEY,
                entity_type VARCHAR NOT NULL,
                data VARCHAR NOT NULL
            )",
        )?;
        Ok(())
    }

    /// Number of stored entities.
    pub fn count(&self) -> StorageResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM entities", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl EntityStore for DuckDbEntityStore {
    fn batch_get(&self, keys: &[EntityKey]) -> StorageResult<Vec<Option<Entity>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.lock()?;
        let placeholders = vec!["?"; keys.len()].join(", ");
        let sql = format!("SELECT key, entity_type, data FROM entities WHERE key IN ({placeholders})");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(duckdb::params_from_iter(keys.iter().map(EntityKey::as_str)), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut found = HashMap::new();
        for row in rows {
            let (key, entity_type, data) = row?;
            let data: Map<String, Value> = serde_json::from_str(&data)?;
            found.insert(key.clone(), Entity::with_data(key, entity_type, data));
        }
        debug!("Fetched {} of {} entities", found.len(), keys.len());

        Ok(keys.iter().map(|k| found.get(k.as_str()).cloned()).collect())
    }

    fn batch_put(&self, entities: &[&Entity]) -> StorageResult<()> {
        if entities.is_empty() {
            return Ok(());
        }
        // One row per key, last occurrence wins.
        let mut seen = HashSet::with_capacity(entities.len());
        let mut rows = Vec::with_capacity(entities.len());
        for entity in entities.iter().rev() {
            if !seen.insert(entity.key.as_str()) {
                continue;
            }
            rows.push((entity.key.to_string(), entity.entity_type.clone(), serde_json::to_string(&entity.data)?));
        }
        rows.reverse();

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for (key, entity_type, data) in &rows {
            tx.execute(
                "INSERT OR REPLACE INTO entities (key, entity_type, data) VALUES (?, ?, ?)",
                duckdb::params![key, entity_type, data],
            )?;
        }
        tx.commit()?;
        debug!("Stored {} entities", rows.len());
        Ok(())
    }
}

/// Open a DuckDB connection with stale WAL recovery.
///
/// If the initial open fails and a `.wal` file exists alongside the database,
/// it is removed and the open is retried once.
fn open_duckdb_with_wal_recovery(path: &Path) -> StorageResult<Connection> {
    match Connection::open(path) {
        Ok(conn) => Ok(conn),
        Err(first_err) => {
            let wal_path = path.with_extension(
                path.extension()
                    .map(|ext| format!("{}.wal", ext.to_string_lossy()))
                    .unwrap_or_else(|| "wal".to_string()),
            );
            if wal_path.exists() {
                warn!(
                    "DuckDB open failed, removing stale WAL and retrying: {}",
                    wal_path.display()
                );
                if std::fs::remove_file(&wal_path).is_ok() {
                    return Connection::open(path).map_err(Into::into);
                }
            }
            Err(first_err.into())
        }
    }
}
