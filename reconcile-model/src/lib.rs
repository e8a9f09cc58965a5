//! Entity model for the reconcile merge engine.
//!
//! Defines the types that the store and engine layers are generic over:
//! - [`Entity`]: the generic record (identity key, kind, JSON attributes)
//! - [`EntitySchema`]: a kind's static descriptor: which attributes fall in
//!   which merge category and which feed the reverse reference index
//! - [`Tracked`] / [`MergeState`]: transient merge metadata carried next to
//!   an entity during one read-modify-write cycle, never persisted
//! - [`FieldMerge`]: the default attribute-by-attribute merge policy
//! - [`KindHandler`]: optional per-kind validation and merge refinement
//!
//! The field-merge policy is pure: it never touches a store.

mod entity;
mod error;
mod handler;
mod merge;
mod schema;
mod tracked;

pub use entity::Entity;
pub use error::{ModelError, ModelResult};
pub use handler::{DefaultHandler, KindHandler};
pub use merge::{FieldMerge, NONE_SENTINEL};
pub use schema::{EntitySchema, EntitySchemaBuilder, FieldPolicy, OpaqueField};
pub use tracked::{MergeState, Tracked};
