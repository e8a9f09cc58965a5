//! Entity store layer for reconcile.
//!
//! The merge engine needs exactly two primitives from a backing store:
//! one uncached batched read and one batched write. [`EntityStore`] is that
//! contract; this crate ships two implementations:
//!
//! - [`MemoryStore`]: a lock-protected map with call accounting, used by
//!   tests and embedders that keep state in process
//! - [`DuckDbEntityStore`]: entities persisted as JSON rows in DuckDB
//!
//! Retry policy, if any, belongs to the store. Errors are returned to the
//! engine unmodified.

mod duck;
mod error;
mod memory;

pub use duck::DuckDbEntityStore;
pub use error::{StorageError, StorageResult};
pub use memory::{MemoryStore, StoreStats};

use reconcile_model::Entity;
use reconcile_types::EntityKey;

/// Batched access to persisted entities.
///
/// Both methods are a single round trip regardless of batch size.
pub trait EntityStore: Send + Sync {
    /// Fetches the stored version of every key, bypassing any read cache.
    ///
    /// The result is positional: `result[i]` belongs to `keys[i]`, and
    /// `None` means no entity is stored under that key.
    fn batch_get(&self, keys: &[EntityKey]) -> StorageResult<Vec<Option<Entity>>>;

    /// Writes every entity, replacing any stored version with the same key.
    fn batch_put(&self, entities: &[&Entity]) -> StorageResult<()>;
}

impl<S: EntityStore + ?Sized> EntityStore for std::sync::Arc<S> {
    fn batch_get(&self, keys: &[EntityKey]) -> StorageResult<Vec<Option<Entity>>> {
        (**self).batch_get(keys)
    }

    fn batch_put(&self, entities: &[&Entity]) -> StorageResult<()> {
        (**self).batch_put(entities)
    }
}
