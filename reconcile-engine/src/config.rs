use serde::{Deserialize, Serialize};

use crate::EngineResult;

/// Default cap on entities per batch call.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 1000;

/// Configuration for a [`Manipulator`](crate::Manipulator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Auto-union used by `find_or_spawn` and `create_or_update`.
    pub auto_union: bool,
    /// Largest batch accepted in one call. `0` disables the limit.
    pub max_batch_size: usize,
    /// Run `KindHandler::validate` on dirty entities before writing.
    pub validate_before_commit: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            auto_union: true,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            validate_before_commit: true,
        }
    }
}

impl EngineConfig {
    /// Parses a config from TOML; missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> EngineResult<Self> {
        Ok(toml::from_str(s)?)
    }
}
