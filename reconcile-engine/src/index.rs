//! Reverse reference index.
//!
//! Maps `(reference attribute, value)` to the keys of the entities whose
//! attribute currently holds that value, e.g. `("event", "2024casj")` to
//! every match played at that event. Bucket values are the text of the
//! reference: a string as-is, any other scalar as its JSON text, so `5`
//! and `"5"` land in the same bucket.
//!
//! The index is never rebuilt wholesale. After each commit it revisits only
//! the buckets listed in each entity's affected references: a value the
//! entity still holds keeps (or gains) the key, a value it no longer holds
//! loses it. Because affected references never shrink within a cycle, a
//! value removed by the merge is still revisited and cleaned up.

use reconcile_model::Tracked;
use reconcile_types::EntityKey;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::hooks::CacheInvalidator;

type Bucket = (String, String);

/// Reverse index from reference values to entity keys.
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    buckets: RwLock<BTreeMap<Bucket, BTreeSet<EntityKey>>>,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys of entities whose `attr` currently holds `value`.
    pub fn lookup(&self, attr: &str, value: &str) -> BTreeSet<EntityKey> {
        self.read()
            .get(&(attr.to_string(), value.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Number of non-empty buckets.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Recomputes every bucket named in the entities' affected references.
    ///
    /// Returns the number of buckets visited.
    pub fn refresh(&self, entities: &[Tracked]) -> usize {
        let mut buckets = self.write();
        let mut visited = 0;
        for tracked in entities {
            let key = &tracked.entity.key;
            for (attr, values) in &tracked.state.affected_references {
                let current: BTreeSet<String> =
                    tracked.entity.reference_values(attr).into_iter().collect();
                for value in values {
                    visited += 1;
                    let bucket = (attr.clone(), value.clone());
                    if current.contains(value) {
                        buckets.entry(bucket).or_default().insert(key.clone());
                    } else if let Some(keys) = buckets.get_mut(&bucket) {
                        keys.remove(key);
                        if keys.is_empty() {
                            buckets.remove(&bucket);
                        }
                    }
                }
            }
        }
        debug!("Refreshed {} reference buckets for {} entities", visited, entities.len());
        visited
    }

    // Poisoning is recovered: a bucket left stale is fixed by its next refresh.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<Bucket, BTreeSet<EntityKey>>> {
        self.buckets.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<Bucket, BTreeSet<EntityKey>>> {
        self.buckets.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CacheInvalidator for ReferenceIndex {
    fn on_entities_changed(&self, entities: &[Tracked]) {
        self.refresh(entities);
    }
}
