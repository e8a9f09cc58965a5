//! In-process entity store.

use reconcile_model::Entity;
use reconcile_types::EntityKey;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};
use tracing::debug;

use crate::{EntityStore, StorageError, StorageResult};

/// Call accounting for a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of `batch_get` round trips.
    pub get_calls: usize,
    /// Number of `batch_put` round trips.
    pub put_calls: usize,
    /// Keys written by each `batch_put`, in call order.
    pub put_batches: Vec<Vec<EntityKey>>,
}

/// Entities held in a lock-protected map.
///
/// Stored copies carry only persisted state: shadow values are dropped on
/// write, the same as a round trip through a real database.
#[derive(Debug)]
pub struct MemoryStore {
    entities: RwLock<HashMap<EntityKey, Entity>>,
    stats: Mutex<StoreStats>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
            stats: Mutex::new(StoreStats::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Creates a store pre-populated with `entities`. Seeding is not counted.
    pub fn with_entities(entities: impl IntoIterator<Item = Entity>) -> Self {
        let map = entities
            .into_iter()
            .map(|e| (e.key.clone(), persisted_copy(&e)))
            .collect();
        Self {
            entities: RwLock::new(map),
            ..Self::new()
        }
    }

    /// Reads one entity directly, outside of the counted batch API.
    pub fn get(&self, key: &EntityKey) -> StorageResult<Option<Entity>> {
        let entities = self
            .entities
            .read()
            .map_err(|e| StorageError::Storage(format!("lock poisoned: {e}")))?;
        Ok(entities.get(key).cloned())
    }

    /// Number of stored entities.
    ///
    /// Reads through a poisoned lock; only the batch calls report poisoning
    /// as [`StorageError::Storage`].
    pub fn len(&self) -> usize {
        self.entities
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the call counters. Reads through a poisoned lock.
    pub fn stats(&self) -> StoreStats {
        self.stats
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Simulates an outage: while unavailable every batch call fails.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> StorageResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Unavailable("memory store offline".to_string()))
        }
    }

    fn record(&self, f: impl FnOnce(&mut StoreStats)) -> StorageResult<()> {
        let mut stats = self
            .stats
            .lock()
            .map_err(|e| StorageError::Storage(format!("lock poisoned: {e}")))?;
        f(&mut stats);
        Ok(())
    }
}

impl EntityStore for MemoryStore {
    fn batch_get(&self, keys: &[EntityKey]) -> StorageResult<Vec<Option<Entity>>> {
        self.check_available()?;
        self.record(|s| s.get_calls += 1)?;
        let entities = self
            .entities
            .read()
            .map_err(|e| StorageError::Storage(format!("lock poisoned: {e}")))?;
        Ok(keys.iter().map(|k| entities.get(k).cloned()).collect())
    }

    fn batch_put(&self, entities: &[&Entity]) -> StorageResult<()> {
        self.check_available()?;
        self.record(|s| {
            s.put_calls += 1;
            s.put_batches.push(entities.iter().map(|e| e.key.clone()).collect());
        })?;
        let mut stored = self
            .entities
            .write()
            .map_err(|e| StorageError::Storage(format!("lock poisoned: {e}")))?;
        for entity in entities {
            stored.insert(entity.key.clone(), persisted_copy(entity));
        }
        debug!("Stored {} entities in memory", entities.len());
        Ok(())
    }
}

fn persisted_copy(entity: &Entity) -> Entity {
    Entity::with_data(entity.key.clone(), entity.entity_type.clone(), entity.data.clone())
}
