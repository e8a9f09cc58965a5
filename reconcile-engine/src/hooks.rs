use reconcile_model::Tracked;

/// Called after every commit with the full resolved batch.
///
/// Dirty flags and affected references are still intact when this runs, so
/// implementations can tell written entities from untouched ones and know
/// which reference buckets to recompute. How the refresh is scheduled is up
/// to the implementation.
pub trait CacheInvalidator: Send + Sync {
    fn on_entities_changed(&self, entities: &[Tracked]);
}

/// Does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInvalidator;

impl CacheInvalidator for NoopInvalidator {
    fn on_entities_changed(&self, _entities: &[Tracked]) {}
}

impl<F> CacheInvalidator for F
where
    F: Fn(&[Tracked]) + Send + Sync,
{
    fn on_entities_changed(&self, entities: &[Tracked]) {
        self(entities)
    }
}
