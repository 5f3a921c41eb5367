//! # Entity-Component Core
//!
//! A deliberately small ECS: entities are bags of components keyed by type,
//! stored densely in one slot store and visited by type-based queries.
//!
//! ## Module Overview
//!
//! - [`slot_store`]: Dense swap-remove storage with self-updating handles
//! - [`entity`]: Entity handles, per-entity component maps, bundles
//! - [`query`]: Allocation-free iteration over entities by component type
//! - [`system`]: System trait (closures are systems too)
//! - [`engine`]: Central container driving entities and systems

pub mod engine;
pub mod entity;
pub mod query;
pub mod slot_store;
pub mod system;

pub use engine::Engine;
pub use entity::{Bundle, Entity, EntityData, EntityMut};
pub use query::{Match, Query, QueryIter};
pub use slot_store::{Handle, SlotStore, Slotted};
pub use system::System;
