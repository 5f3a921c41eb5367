//! Engine diagnostics.
//!
//! With the `diagnostics` feature the engine times every system during
//! [`Engine::run`](crate::ecs::Engine::run) and counts entity churn per tick.
//! [`Engine::diagnostics`](crate::ecs::Engine::diagnostics) bundles that into
//! a [`DiagSnapshot`], which serializes to JSON for logging.

use serde::Serialize;

/// Wall-clock time one system took during the most recent tick.
#[derive(Debug, Clone, Serialize)]
pub struct SystemTiming {
    pub name: String,
    pub duration_us: f64,
}

/// Point-in-time view of an engine.
#[derive(Debug, Clone, Serialize)]
pub struct DiagSnapshot {
    /// Number of completed ticks.
    pub tick: u64,
    pub entity_count: usize,
    /// Entity slots allocated (occupied or not).
    pub entity_capacity: usize,
    pub system_count: usize,
    /// Entities created since the start of the most recent tick.
    pub created_this_tick: u32,
    /// Entities deleted since the start of the most recent tick.
    pub deleted_this_tick: u32,
    /// Per-system timings of the most recent tick, in run order.
    pub system_timings: Vec<SystemTiming>,
}

impl DiagSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Sum of all system timings, in microseconds.
    pub fn total_system_us(&self) -> f64 {
        self.system_timings.iter().map(|t| t.duration_us).sum()
    }
}
