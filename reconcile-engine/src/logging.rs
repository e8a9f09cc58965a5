//! Logging setup for binaries and tests that embed the engine.
//!
//! The engine itself only emits `tracing` events; installing a subscriber is
//! left to the host. This helper is the stock choice: a compact fmt
//! subscriber filtered by `RUST_LOG`, falling back to `info` (or `debug`
//! when verbose).

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber.
///
/// Returns `false` if a global subscriber was already installed, in which
/// case the existing one is left in place.
pub fn init_logging(verbose: bool) -> bool {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .is_ok()
}
