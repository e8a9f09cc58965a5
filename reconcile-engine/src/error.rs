//! Error types for the engine.

use reconcile_model::ModelError;
use reconcile_store::StorageError;
use reconcile_types::EntityKey;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised by a batch call.
///
/// Any error aborts the whole batch before the write step.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Store failure, passed through unmodified.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Schema or merge failure (ambiguous category, malformed opaque text).
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// An input entity does not belong to this manipulator's kind.
    #[error("entity {key} has kind {found:?}, expected {expected:?}")]
    KindMismatch {
        key: EntityKey,
        expected: String,
        found: String,
    },

    /// A merge produced an entity with a different identity key.
    #[error("merge changed identity key from {before} to {after}")]
    IdentityChanged { before: EntityKey, after: EntityKey },

    /// The store answered a batch read with the wrong number of results.
    #[error("store returned {found} results for {expected} keys")]
    ShortRead { expected: usize, found: usize },

    /// The batch is larger than the configured maximum.
    #[error("batch of {size} entities exceeds maximum of {max}")]
    BatchTooLarge { size: usize, max: usize },

    /// The kind handler rejected an entity before commit.
    #[error("validation failed for {key}: {reason}")]
    Validation { key: EntityKey, reason: String },

    /// Configuration could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}
