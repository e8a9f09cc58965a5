//! The read-modify-write cycle for one entity kind.

use reconcile_model::{DefaultHandler, Entity, EntitySchema, FieldMerge, KindHandler, Tracked};
use reconcile_store::EntityStore;
use reconcile_types::{EntityKey, OneOrMany};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::hooks::CacheInvalidator;

/// Read-modify-write manipulator for a single entity kind.
///
/// Each batch call makes at most one `batch_get` and one `batch_put`
/// against the store, however many entities it carries.
pub struct Manipulator<S> {
    schema: Arc<EntitySchema>,
    store: S,
    handler: Arc<dyn KindHandler>,
    invalidators: Vec<Arc<dyn CacheInvalidator>>,
    config: EngineConfig,
}

impl<S: EntityStore> Manipulator<S> {
    /// Creates a manipulator, rejecting schemas with ambiguous categories.
    pub fn new(schema: EntitySchema, store: S) -> EngineResult<Self> {
        schema.validate()?;
        Ok(Self {
            schema: Arc::new(schema),
            store,
            handler: Arc::new(DefaultHandler),
            invalidators: Vec::new(),
            config: EngineConfig::default(),
        })
    }

    /// Sets the kind-specific validation and merge rules.
    pub fn with_handler(mut self, handler: Arc<dyn KindHandler>) -> Self {
        self.handler = handler;
        self
    }

    /// Adds a post-commit hook. Hooks run in registration order.
    pub fn with_invalidator(mut self, invalidator: Arc<dyn CacheInvalidator>) -> Self {
        self.invalidators.push(invalidator);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Batch Resolver ───────────────────────────────────────────

    /// Merges new values with their stored versions without writing.
    ///
    /// Uses the configured auto-union. The result has the input's shape.
    pub fn find_or_spawn(&self, new: impl Into<OneOrMany<Entity>>) -> EngineResult<OneOrMany<Tracked>> {
        self.find_or_spawn_with(new, self.config.auto_union)
    }

    /// [`find_or_spawn`](Self::find_or_spawn) with an explicit auto-union.
    pub fn find_or_spawn_with(
        &self,
        new: impl Into<OneOrMany<Entity>>,
        auto_union: bool,
    ) -> EngineResult<OneOrMany<Tracked>> {
        let (shape, new_entities) = new.into().into_parts();
        let resolved = self.resolve(new_entities, auto_union)?;
        Ok(shape.rebuild(resolved))
    }

    fn resolve(&self, new_entities: Vec<Entity>, auto_union: bool) -> EngineResult<Vec<Tracked>> {
        let max = self.config.max_batch_size;
        if max > 0 && new_entities.len() > max {
            return Err(EngineError::BatchTooLarge {
                size: new_entities.len(),
                max,
            });
        }
        for entity in &new_entities {
            self.check_kind(entity)?;
        }

        let keys: Vec<EntityKey> = new_entities.iter().map(|e| e.key.clone()).collect();
        let mut seen = HashSet::with_capacity(keys.len());
        for key in &keys {
            if !seen.insert(key) {
                warn!("Key {} appears more than once in one batch; the last write wins", key);
            }
        }

        let existing = self.store.batch_get(&keys)?;
        if existing.len() != keys.len() {
            return Err(EngineError::ShortRead {
                expected: keys.len(),
                found: existing.len(),
            });
        }

        new_entities
            .into_iter()
            .zip(existing)
            .map(|(new, old)| self.merge_one(new, old.map(Tracked::loaded), auto_union))
            .collect()
    }

    // ── Merge Core ───────────────────────────────────────────────

    /// Merges one new value into its stored version, or creates it.
    ///
    /// With no `existing`, `new` is returned as a new, dirty entity and no
    /// field policy runs. Otherwise the affected references of both versions
    /// are folded into `existing` and the kind handler merges `new` into it.
    pub fn merge_one(
        &self,
        new: Entity,
        existing: Option<Tracked>,
        auto_union: bool,
    ) -> EngineResult<Tracked> {
        self.check_kind(&new)?;

        let Some(mut existing) = existing else {
            let mut created = Tracked::created(new);
            created.observe_own_references(&self.schema);
            debug!("Spawned new {} {}", self.schema.entity_type, created.entity.key);
            return Ok(created);
        };

        let before = existing.entity.key.clone();
        if new.key != before {
            return Err(EngineError::IdentityChanged {
                before,
                after: new.key,
            });
        }

        existing.observe_own_references(&self.schema);
        existing.observe_references(&self.schema, &new);

        existing.begin_merge();
        let field_merge = FieldMerge::new(&self.schema);
        self.handler
            .update_merge(&new, &mut existing, auto_union, &field_merge)?;

        if existing.entity.key != before {
            return Err(EngineError::IdentityChanged {
                before,
                after: existing.entity.key,
            });
        }
        debug!(
            "Merged {} {} (changed: {:?})",
            self.schema.entity_type,
            existing.entity.key,
            existing.updated_attrs()
        );
        Ok(existing)
    }

    // ── Commit ───────────────────────────────────────────────────

    /// Resolves the batch, writes the entities that changed, runs the
    /// invalidation hooks and clears dirty flags.
    ///
    /// Uses the configured auto-union. The result has the input's shape.
    pub fn create_or_update(&self, new: impl Into<OneOrMany<Entity>>) -> EngineResult<OneOrMany<Tracked>> {
        self.create_or_update_with(new, self.config.auto_union)
    }

    /// [`create_or_update`](Self::create_or_update) with an explicit auto-union.
    ///
    /// Nothing is written unless every entity in the batch merged (and, if
    /// configured, validated) successfully.
    pub fn create_or_update_with(
        &self,
        new: impl Into<OneOrMany<Entity>>,
        auto_union: bool,
    ) -> EngineResult<OneOrMany<Tracked>> {
        let (shape, new_entities) = new.into().into_parts();
        let mut resolved = self.resolve(new_entities, auto_union)?;

        let dirty: Vec<&Entity> = resolved
            .iter()
            .filter(|t| t.is_dirty())
            .map(|t| &t.entity)
            .collect();

        if self.config.validate_before_commit {
            for entity in &dirty {
                self.handler
                    .validate(entity)
                    .map_err(|reason| EngineError::Validation {
                        key: entity.key.clone(),
                        reason,
                    })?;
            }
        }

        if !dirty.is_empty() {
            self.store.batch_put(&dirty)?;
        }
        info!(
            "Committed {} of {} {} entities",
            dirty.len(),
            resolved.len(),
            self.schema.entity_type
        );

        for invalidator in &self.invalidators {
            invalidator.on_entities_changed(&resolved);
        }
        for tracked in &mut resolved {
            tracked.mark_committed();
        }
        Ok(shape.rebuild(resolved))
    }

    fn check_kind(&self, entity: &Entity) -> EngineResult<()> {
        if entity.entity_type != self.schema.entity_type {
            return Err(EngineError::KindMismatch {
                key: entity.key.clone(),
                expected: self.schema.entity_type.clone(),
                found: entity.entity_type.clone(),
            });
        }
        Ok(())
    }
}
