//! Error types for the model layer.

use thiserror::Error;

use crate::schema::FieldPolicy;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while validating schemas or merging entities.
#[derive(Debug, Error)]
pub enum ModelError {
    /// An attribute is declared in more than one merge category.
    #[error("attribute {attr:?} of kind {entity_type:?} declared as both {first} and {second}")]
    AmbiguousAttributeCategory {
        entity_type: String,
        attr: String,
        first: FieldPolicy,
        second: FieldPolicy,
    },

    /// A null-permitted attribute that is not a mutable scalar.
    #[error("attribute {attr:?} of kind {entity_type:?} permits null but is not a mutable scalar")]
    NullableNotMutable { entity_type: String, attr: String },

    /// An opaque attribute's text could not be decoded.
    #[error("malformed opaque attribute {attr:?} on {key}: {reason}")]
    MalformedOpaqueAttribute {
        key: String,
        attr: String,
        reason: String,
    },

    /// A list-category attribute holds something other than a list.
    #[error("attribute {attr:?} on {key} must be a list, found {found}")]
    NotAList {
        key: String,
        attr: String,
        found: String,
    },
}
