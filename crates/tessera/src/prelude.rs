//! Convenience re-exports: `use tessera::prelude::*` for the common items.

pub use crate::config::EngineConfig;
pub use crate::ecs::{
    Bundle, Engine, Entity, EntityData, EntityMut, Match, Query, QueryIter, System,
};
pub use crate::error::EcsError;
pub use crate::math::{Mat4, Quat, Transform, Vec2, Vec3, Vec4};
pub use crate::time::Time;

#[cfg(feature = "diagnostics")]
pub use crate::diag::{DiagSnapshot, SystemTiming};
