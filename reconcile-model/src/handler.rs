use crate::{Entity, FieldMerge, ModelResult, Tracked};

/// Optional per-kind hooks layered over the generic merge engine.
///
/// Most kinds do NOT need to implement this; the default field merge
/// driven by the kind's `EntitySchema` handles everything.
///
/// Only implement this if you need:
/// - Input validation before a batch is written
/// - Merge rules the attribute categories cannot express (e.g. a field
///   that may only move forward, or one derived from two others)
pub trait KindHandler: Send + Sync {
    /// Validate an entity before it is persisted.
    /// Return `Err(message)` to reject the whole batch.
    fn validate(&self, entity: &Entity) -> Result<(), String> {
        let _ = entity;
        Ok(())
    }

    /// Merges `new` into the stored `existing` version.
    ///
    /// `field_merge` is the default policy; call it before or after custom
    /// rules to build on the generic behavior, or leave it out to replace
    /// it. Extra changes must be recorded with [`Tracked::record_change`] so
    /// they are written. The caller clears `updated_attrs` (see
    /// [`Tracked::begin_merge`]) before this runs, and the field merge only
    /// adds to it.
    fn update_merge(
        &self,
        new: &Entity,
        existing: &mut Tracked,
        auto_union: bool,
        field_merge: &FieldMerge<'_>,
    ) -> ModelResult<()> {
        field_merge.apply(new, existing, auto_union)
    }
}

/// Handler that uses every default.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHandler;

impl KindHandler for DefaultHandler {}
