//! Core type definitions for the reconcile merge engine.
//!
//! This crate defines the small, kind-agnostic types every other layer
//! depends on:
//! - [`EntityKey`]: the stable identity key used to find existing versions
//! - [`OneOrMany`] / [`Shape`]: the singular-or-sequence batch shape that
//!   the engine mirrors from its input to its output
//!
//! Field layouts and merge policies belong in `reconcile-model`, not here.

mod batch;
mod key;

pub use batch::{OneOrMany, Shape};
pub use key::EntityKey;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid entity key: {0:?}")]
    InvalidKey(String),
}
