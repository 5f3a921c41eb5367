//! Engine configuration.
//!
//! Everything has a default, so a config file only needs the fields it wants
//! to change:
//!
//! ```json
//! { "initial_capacity": 4096 }
//! ```

use serde::{Deserialize, Serialize};

use crate::ecs::slot_store::DEFAULT_CAPACITY;

/// Sizing knobs for an [`Engine`](crate::ecs::Engine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Entity slots allocated up front. The store doubles from here when full.
    pub initial_capacity: usize,
    /// Systems reserved up front.
    pub system_capacity: usize,
}

impl EngineConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_CAPACITY,
            system_capacity: 8,
        }
    }
}
