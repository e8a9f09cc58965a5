//! Read-modify-write merge engine.
//!
//! Given a batch of caller-built (often partial) entities, the engine finds
//! each one's stored version, merges the new values in under the kind's
//! field policy, writes back only what actually changed, and tells
//! downstream caches which entities and reference buckets were touched.
//!
//! # Architecture
//!
//! - **Batch Resolver** ([`Manipulator::find_or_spawn`]): one uncached
//!   `batch_get` for the whole batch, paired positionally with the inputs
//! - **Merge Core** ([`Manipulator::merge_one`]): create path or merge path
//!   per entity, running the kind's [`KindHandler`] over the default
//!   [`FieldMerge`]
//! - **Commit** ([`Manipulator::create_or_update`]): one `batch_put` of the
//!   dirty subset, then every [`CacheInvalidator`], then dirty flags cleared
//! - **Reference index** ([`ReferenceIndex`]): a reverse index kept current
//!   from each entity's affected references
//!
//! # Example
//!
//! ```
//! use reconcile_engine::{EntitySchema, Entity, Manipulator, MemoryStore};
//!
//! let schema = EntitySchema::builder("team")
//!     .mutable(["nickname"])
//!     .union_lists(["years"])
//!     .build()?;
//! let teams = Manipulator::new(schema, MemoryStore::new())?;
//!
//! let created = teams.create_or_update(Entity::new("frc254", "team").with("nickname", "Poofs"))?;
//! assert!(created.into_one().is_some_and(|t| t.is_new()));
//! # Ok::<(), reconcile_engine::EngineError>(())
//! ```

mod config;
mod error;
mod hooks;
mod index;
pub mod logging;
mod manipulator;

pub use config::{EngineConfig, DEFAULT_MAX_BATCH_SIZE};
pub use error::{EngineError, EngineResult};
pub use hooks::{CacheInvalidator, NoopInvalidator};
pub use index::ReferenceIndex;
pub use manipulator::Manipulator;

pub use reconcile_model::{
    DefaultHandler, Entity, EntitySchema, FieldMerge, KindHandler, MergeState, ModelError, Tracked,
};
pub use reconcile_store::{DuckDbEntityStore, EntityStore, MemoryStore, StorageError};
pub use reconcile_types::{EntityKey, OneOrMany};
