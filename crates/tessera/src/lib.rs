//! # Tessera — A Small Entity-Component Engine
//!
//! Entities are lightweight handles to bags of typed components. Systems run
//! once per frame, in the order they were added, and find their work through
//! type-based queries.
//!
//! ```ignore
//! use tessera::prelude::*;
//!
//! let mut engine = Engine::new();
//! engine.create_entity((Transform::from_xyz(0.0, 0.0, -5.0), Spin(1.0)))?;
//! engine.add_system(|engine: &mut Engine, delta: f32| {
//!     for m in engine.find_entities_with::<(&mut Transform, &Spin)>() {
//!         let (transform, spin) = m.components;
//!         transform.rotation *= Quat::from_rotation_y(spin.0 * delta);
//!     }
//! });
//! engine.run(1.0 / 60.0);
//! ```
//!
//! Start with `use tessera::prelude::*`. Everything is single-threaded:
//! handles are reference-counted and deliberately `!Send`.

pub mod config;
pub mod ecs;
pub mod error;
pub mod math;
pub mod prelude;
pub mod time;

#[cfg(feature = "diagnostics")]
pub mod diag;

pub use config::EngineConfig;
pub use ecs::{Engine, Entity};
pub use error::{EcsError, Result};
