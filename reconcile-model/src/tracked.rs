//! Transient merge metadata.
//!
//! A [`Tracked`] pairs an entity with the [`MergeState`] of the current
//! read-modify-write cycle. Only the entity half is ever persisted.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::entity::Entity;
use crate::schema::EntitySchema;

/// Per-cycle merge bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeState {
    /// Some persisted attribute changed since the last commit.
    pub dirty: bool,
    /// No prior version existed in the store.
    pub is_new: bool,
    /// Attributes changed by the most recent merge.
    pub updated_attrs: BTreeSet<String>,
    /// Every value observed per reference attribute, old and new. Only grows.
    pub affected_references: BTreeMap<String, BTreeSet<String>>,
}

impl MergeState {
    /// Folds the reference values of `entity` into the affected set.
    ///
    /// Every declared reference attribute gets an entry, even when empty.
    pub fn observe_references(&mut self, schema: &EntitySchema, entity: &Entity) {
        for attr in &schema.references {
            self.affected_references
                .entry(attr.clone())
                .or_default()
                .extend(reference_values(entity.get(attr)));
        }
    }
}

/// An entity together with its merge metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Tracked {
    pub entity: Entity,
    pub state: MergeState,
}

impl Tracked {
    /// Wraps an entity read from the store: not new, not dirty.
    pub fn loaded(entity: Entity) -> Self {
        Self {
            entity,
            state: MergeState::default(),
        }
    }

    /// Wraps an entity that has no stored version yet.
    pub fn created(entity: Entity) -> Self {
        Self {
            entity,
            state: MergeState {
                dirty: true,
                is_new: true,
                ..Default::default()
            },
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.state.dirty
    }

    pub fn is_new(&self) -> bool {
        self.state.is_new
    }

    pub fn updated_attrs(&self) -> &BTreeSet<String> {
        &self.state.updated_attrs
    }

    /// Values seen so far for one reference attribute.
    pub fn affected(&self, attr: &str) -> Option<&BTreeSet<String>> {
        self.state.affected_references.get(attr)
    }

    /// Starts a new merge: forgets the attributes changed by the previous one.
    ///
    /// `dirty` and the affected references are kept until commit.
    pub fn begin_merge(&mut self) {
        self.state.updated_attrs.clear();
    }

    /// Records an attribute change made outside the default field merge.
    pub fn record_change(&mut self, attr: &str) {
        self.state.updated_attrs.insert(attr.to_string());
        self.state.dirty = true;
    }

    /// Folds the reference values of `entity` into the affected set.
    pub fn observe_references(&mut self, schema: &EntitySchema, entity: &Entity) {
        self.state.observe_references(schema, entity);
    }

    /// Folds this entity's own reference values into the affected set.
    pub fn observe_own_references(&mut self, schema: &EntitySchema) {
        self.state.observe_references(schema, &self.entity);
    }

    /// Clears the dirty flag once the entity has been written.
    pub fn mark_committed(&mut self) {
        self.state.dirty = false;
    }

    pub fn into_entity(self) -> Entity {
        self.entity
    }
}

/// Flattens a reference attribute into index-bucket values.
///
/// Lists contribute each element; `null` contributes nothing. Strings are
/// kept as-is and other scalars become their JSON text, so the number `5`
/// and the string `"5"` name the same bucket.
pub(crate) fn reference_values(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().flat_map(reference_values).collect(),
        Value::String(s) => vec![s.clone()],
        other => vec![other.to_string()],
    }
}

impl Entity {
    /// Current index-bucket values of a reference attribute.
    pub fn reference_values(&self, attr: &str) -> Vec<String> {
        reference_values(self.get(attr))
    }
}
