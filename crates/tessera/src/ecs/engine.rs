//! # Engine — The Central Container
//!
//! The [`Engine`] owns every entity and every system. It's the one object a
//! screen of the application creates, fills during setup, and ticks once per
//! frame.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ Engine                                               │
//! │                                                      │
//! │  entities: SlotStore<EntityData>                     │
//! │    dense, swap-remove; each entry knows its slot     │
//! │                                                      │
//! │  systems: Vec<Box<dyn System>>                       │
//! │    run in insertion order by run(delta)              │
//! │                                                      │
//! │  pending_deletes: Vec<Entity>                        │
//! │    applied after the last system of a tick           │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Semantics
//!
//! Lifecycle calls report "not here" with `false` / `None`: deleting twice,
//! enabling a deleted entity, or passing a handle from a different engine
//! are all ordinary outcomes. Attaching a duplicate component type is a
//! programmer error and comes back as [`EcsError::DuplicateComponent`].
//!
//! ## Mutating During a Tick
//!
//! A system may create and delete entities freely *between* queries; later
//! systems in the same tick see the result. While a query iterator is alive
//! the engine is mutably borrowed, so structural changes have to wait. Queue
//! them with [`Engine::defer_delete`] and they are applied once every system
//! has run.

use log::{debug, trace, warn};

use super::entity::{Bundle, Entity, EntityData, EntityMut};
use super::query::{Match, Query, QueryIter};
use super::slot_store::SlotStore;
use super::system::{NamedSystem, System};
use crate::config::EngineConfig;
use crate::error::{EcsError, Result};

#[cfg(feature = "diagnostics")]
use crate::diag::{DiagSnapshot, SystemTiming};

/// Owns entities and systems; drives one tick per [`run`](Engine::run).
pub struct Engine {
    entities: SlotStore<EntityData>,
    systems: Vec<NamedSystem>,
    /// Deletions queued with `defer_delete`, applied at the end of `run`.
    pending_deletes: Vec<Entity>,
    /// Number of completed ticks.
    tick: u64,
    #[cfg(feature = "diagnostics")]
    created_this_tick: u32,
    #[cfg(feature = "diagnostics")]
    deleted_this_tick: u32,
    /// Per-system timings from the most recent `run()` call.
    #[cfg(feature = "diagnostics")]
    timings: Vec<SystemTiming>,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            entities: SlotStore::with_capacity(config.initial_capacity),
            systems: Vec::with_capacity(config.system_capacity),
            pending_deletes: Vec::new(),
            tick: 0,
            #[cfg(feature = "diagnostics")]
            created_this_tick: 0,
            #[cfg(feature = "diagnostics")]
            deleted_this_tick: 0,
            #[cfg(feature = "diagnostics")]
            timings: Vec::with_capacity(config.system_capacity),
        }
    }

    // ── Entity Lifecycle ─────────────────────────────────────────────

    /// Create an enabled entity carrying `bundle` (a tuple of components, or `()`).
    ///
    /// # Errors
    ///
    /// [`EcsError::DuplicateComponent`] if the bundle holds two components of
    /// one type; nothing is inserted in that case. [`EcsError::Allocation`] if
    /// the entity store can't grow.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let cube = engine.create_entity((Mesh::cube(), Transform::from_xyz(3.0, 0.0, 0.0)))?;
    /// ```
    pub fn create_entity<B: Bundle>(&mut self, bundle: B) -> Result<Entity> {
        let entity = Entity::new();
        let mut data = EntityData::new(entity.clone());
        bundle.attach(&mut data)?;
        data.set_enabled(true);
        self.entities.add(data)?;
        #[cfg(feature = "diagnostics")]
        bump(&mut self.created_this_tick, 1);
        debug!("created {entity:?}");
        Ok(entity)
    }

    /// Create an enabled entity with no components.
    pub fn create_empty(&mut self) -> Result<Entity> {
        self.create_entity(())
    }

    /// Delete an entity and drop its components.
    ///
    /// Returns `false` (and does nothing) if the entity isn't owned by this
    /// engine, including when it was already deleted.
    pub fn delete_entity(&mut self, entity: &Entity) -> bool {
        let Some(mut data) = self.entities.remove_item(&entity.0) else {
            self.reject("delete", entity);
            return false;
        };
        data.dispose();
        #[cfg(feature = "diagnostics")]
        bump(&mut self.deleted_this_tick, 1);
        debug!("deleted entity ({} left)", self.entities.len());
        true
    }

    /// Queue a deletion for the end of the current (or next) tick.
    ///
    /// Safe to call for any handle at any time; handles that are gone by the
    /// time the queue is applied are skipped.
    pub fn defer_delete(&mut self, entity: &Entity) {
        self.pending_deletes.push(entity.clone());
    }

    /// Apply every deletion queued with [`defer_delete`](Self::defer_delete).
    ///
    /// [`run`](Self::run) calls this after the last system. Returns how many
    /// entities were actually deleted.
    pub fn apply_deferred(&mut self) -> usize {
        if self.pending_deletes.is_empty() {
            return 0;
        }
        let mut pending = std::mem::take(&mut self.pending_deletes);
        let mut deleted = 0;
        for entity in pending.drain(..) {
            if self.delete_entity(&entity) {
                deleted += 1;
            }
        }
        // Hand the emptied buffer back so its capacity is reused next tick.
        self.pending_deletes = pending;
        deleted
    }

    /// Delete every entity for which `condition` returns `true`.
    ///
    /// Returns the number deleted. Each entity is examined exactly once.
    pub fn delete_entities_where(&mut self, mut condition: impl FnMut(&EntityData) -> bool) -> usize {
        let mut deleted = 0;
        self.entities.retain(|data| {
            if condition(&*data) {
                data.dispose();
                deleted += 1;
                false
            } else {
                true
            }
        });
        #[cfg(feature = "diagnostics")]
        bump(&mut self.deleted_this_tick, deleted);
        deleted
    }

    /// Hide an entity from every query without touching its components.
    ///
    /// Returns `false` if the entity isn't owned by this engine.
    pub fn disable_entity(&mut self, entity: &Entity) -> bool {
        self.set_enabled(entity, false)
    }

    /// Make a disabled entity visible to queries again.
    ///
    /// Returns `false` if the entity isn't owned by this engine.
    pub fn enable_entity(&mut self, entity: &Entity) -> bool {
        self.set_enabled(entity, true)
    }

    fn set_enabled(&mut self, entity: &Entity, enabled: bool) -> bool {
        match self.entities.get_by_handle_mut(&entity.0) {
            Some(data) => {
                data.set_enabled(enabled);
                true
            }
            None => {
                self.reject(if enabled { "enable" } else { "disable" }, entity);
                false
            }
        }
    }

    /// Log a lifecycle call that named an entity this engine doesn't own.
    fn reject(&self, action: &str, entity: &Entity) {
        if entity.is_attached() {
            warn!("{action} ignored for {entity:?}: owned by another engine");
        } else {
            trace!("{action} ignored: entity already deleted");
        }
    }

    /// Delete every entity. Capacity is kept.
    pub fn clear(&mut self) {
        let count = self.entities.len();
        for data in self.entities.iter_mut() {
            data.dispose();
        }
        self.entities.clear();
        self.pending_deletes.clear();
        if count > 0 {
            debug!("cleared {count} entities");
        }
    }

    // ── Entity Access ────────────────────────────────────────────────

    /// Returns `true` if `entity` is owned by this engine (identity check).
    pub fn contains(&self, entity: &Entity) -> bool {
        self.entities.contains(&entity.0)
    }

    /// Number of live entities, enabled or not.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, entity: &Entity) -> Option<&EntityData> {
        self.entities.get_by_handle(&entity.0)
    }

    /// Edit the components or enabled flag of an entity.
    pub fn get_mut(&mut self, entity: &Entity) -> Option<EntityMut<'_>> {
        self.entities.get_by_handle_mut(&entity.0).map(EntityMut::new)
    }

    /// Attach a component to an existing entity.
    ///
    /// # Errors
    ///
    /// [`EcsError::NoSuchEntity`] if the entity isn't owned by this engine,
    /// [`EcsError::DuplicateComponent`] if it already has a `T`.
    pub fn add_component<T: 'static>(&mut self, entity: &Entity, component: T) -> Result<()> {
        self.entities
            .get_by_handle_mut(&entity.0)
            .ok_or(EcsError::NoSuchEntity)?
            .add(component)
            .map(|_| ())
    }

    /// Detach the `T` of an entity and hand it back.
    pub fn remove_component<T: 'static>(&mut self, entity: &Entity) -> Option<T> {
        self.entities.get_by_handle_mut(&entity.0)?.remove::<T>()
    }

    /// Every live entity in slot order, enabled or not.
    pub fn entities(&self) -> impl Iterator<Item = &EntityData> + '_ {
        self.entities.iter()
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Iterate every enabled entity that carries all the types in `Q`.
    ///
    /// Matches come in slot order, which changes when entities are deleted.
    ///
    /// # Panics
    ///
    /// Panics if `Q` names a component type twice or more than
    /// [`MAX_QUERY_TYPES`](super::query::MAX_QUERY_TYPES) types.
    ///
    /// # Example
    ///
    /// ```ignore
    /// for m in engine.find_entities_with::<(&Mesh, &Transform)>() {
    ///     let (mesh, transform) = m.components;
    ///     draw(mesh, transform.matrix());
    /// }
    /// ```
    pub fn find_entities_with<Q: Query>(&mut self) -> QueryIter<'_, Q> {
        QueryIter::new(self.entities.iter_mut())
    }

    /// The first match of `Q`, if any. Handy for singletons like the camera.
    pub fn query_single<Q: Query>(&mut self) -> Option<Match<'_, Q>> {
        self.find_entities_with::<Q>().next()
    }

    // ── Systems ──────────────────────────────────────────────────────

    /// Add a system to the end of the run order.
    pub fn add_system<S: System + 'static>(&mut self, system: S) {
        self.systems.push(NamedSystem::new(system));
    }

    /// Number of registered systems.
    ///
    /// Inside a running system this only counts systems added during the
    /// current tick.
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Number of completed ticks.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Run every system once, in the order they were added, then apply
    /// deferred deletions.
    ///
    /// Systems added while the tick is running are appended to the order and
    /// first run on the next tick. If a system panics, the registered systems
    /// are still in place once the panic is caught.
    pub fn run(&mut self, delta: f32) {
        #[cfg(feature = "diagnostics")]
        {
            self.created_this_tick = 0;
            self.deleted_this_tick = 0;
            self.timings.clear();
        }
        trace!(
            "tick {} (dt {delta:.4}s, {} systems, {} entities)",
            self.tick,
            self.systems.len(),
            self.entities.len()
        );

        // Take the systems out so each can borrow the engine mutably.
        let systems = std::mem::take(&mut self.systems);
        let mut guard = SystemsGuard {
            engine: self,
            systems,
        };
        for named in &mut guard.systems {
            #[cfg(feature = "diagnostics")]
            {
                let start = std::time::Instant::now();
                named.system.run(guard.engine, delta);
                guard.engine.timings.push(SystemTiming {
                    name: named.name.clone(),
                    duration_us: start.elapsed().as_secs_f64() * 1_000_000.0,
                });
            }
            #[cfg(not(feature = "diagnostics"))]
            {
                named.system.run(guard.engine, delta);
            }
        }
        drop(guard);

        self.apply_deferred();
        self.tick += 1;
    }

    // ── Diagnostics ──────────────────────────────────────────────────

    /// Snapshot of entity counts and the most recent tick's system timings.
    #[cfg(feature = "diagnostics")]
    pub fn diagnostics(&self) -> DiagSnapshot {
        DiagSnapshot {
            tick: self.tick,
            entity_count: self.entities.len(),
            entity_capacity: self.entities.capacity(),
            system_count: self.systems.len(),
            created_this_tick: self.created_this_tick,
            deleted_this_tick: self.deleted_this_tick,
            system_timings: self.timings.clone(),
        }
    }
}

/// Puts the systems taken out by [`Engine::run`] back when dropped, also
/// while unwinding from a panicking system.
struct SystemsGuard<'a> {
    engine: &'a mut Engine,
    systems: Vec<NamedSystem>,
}

impl Drop for SystemsGuard<'_> {
    fn drop(&mut self) {
        // Systems added mid-tick go after the ones that were running.
        self.systems.append(&mut self.engine.systems);
        self.engine.systems = std::mem::take(&mut self.systems);
    }
}

/// Add `n` to a per-tick counter, saturating at `u32::MAX`.
#[cfg(feature = "diagnostics")]
fn bump(counter: &mut u32, n: usize) {
    *counter = counter.saturating_add(u32::try_from(n).unwrap_or(u32::MAX));
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Engine {
    /// Detach every outstanding handle so it reads as deleted.
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Debug, PartialEq)]
    struct Mesh(u32);
    #[derive(Debug, PartialEq, Clone, Copy)]
    struct Transform {
        x: f32,
    }
    #[derive(Debug, PartialEq)]
    struct Camera;
    #[derive(Debug, PartialEq)]
    struct Light(f32);

    fn count<Q: Query>(engine: &mut Engine) -> usize {
        engine.find_entities_with::<Q>().count()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    #[test]
    fn create_entity_is_enabled_and_owned() {
        let mut engine = Engine::new();
        let e = engine.create_entity((Mesh(1), Transform { x: 0.0 })).unwrap();
        assert!(engine.contains(&e));
        assert!(engine.get(&e).unwrap().is_enabled());
        assert_eq!(engine.get(&e).unwrap().len(), 2);
        assert_eq!(engine.entity_count(), 1);
    }

    #[test]
    fn create_with_duplicate_types_inserts_nothing() {
        let mut engine = Engine::new();
        let err = engine.create_entity((Mesh(1), Mesh(2))).unwrap_err();
        assert!(matches!(err, EcsError::DuplicateComponent { .. }));
        assert_eq!(engine.entity_count(), 0);
    }

    #[test]
    fn create_empty_entity() {
        let mut engine = Engine::new();
        let e = engine.create_empty().unwrap();
        assert!(engine.get(&e).unwrap().is_empty());
    }

    #[test]
    fn delete_swaps_last_into_hole() {
        let mut engine = Engine::new();
        let e0 = engine.create_entity((Mesh(0),)).unwrap();
        let e1 = engine.create_entity((Mesh(1),)).unwrap();
        let e2 = engine.create_entity((Mesh(2),)).unwrap();

        assert!(engine.delete_entity(&e0));
        assert_eq!(e2.id(), Some(0));
        assert_eq!(engine.entity_count(), 2);
        assert!(engine.contains(&e1));
        assert!(engine.contains(&e2));
        assert!(!engine.contains(&e0));
        assert_eq!(engine.get(&e2).unwrap().get::<Mesh>(), Some(&Mesh(2)));
    }

    #[test]
    fn delete_is_idempotent() {
        let mut engine = Engine::new();
        let e = engine.create_entity((Mesh(0),)).unwrap();
        let _other = engine.create_entity((Mesh(1),)).unwrap();

        assert!(engine.delete_entity(&e));
        assert!(!engine.delete_entity(&e));
        assert_eq!(engine.entity_count(), 1);
        assert!(engine.get(&e).is_none());
        assert!(!e.is_attached());
    }

    #[test]
    fn deleted_handle_never_aliases_new_entity() {
        let mut engine = Engine::new();
        let old = engine.create_entity((Mesh(0),)).unwrap();
        engine.delete_entity(&old);
        let new = engine.create_entity((Mesh(1),)).unwrap();
        assert_eq!(new.id(), Some(0));
        assert!(!engine.contains(&old));
        assert!(engine.get(&old).is_none());
        assert_ne!(old, new);
    }

    #[test]
    fn foreign_handles_are_ignored() {
        let mut a = Engine::new();
        let mut b = Engine::new();
        let in_a = a.create_entity((Mesh(0),)).unwrap();
        let _in_b = b.create_entity((Mesh(0),)).unwrap();

        // Same slot index in both engines, but a different instance.
        assert!(!b.contains(&in_a));
        assert!(!b.delete_entity(&in_a));
        assert!(!b.disable_entity(&in_a));
        assert_eq!(b.entity_count(), 1);
        assert!(a.contains(&in_a));
    }

    #[test]
    fn identical_entities_are_distinct() {
        let mut engine = Engine::new();
        let a = engine.create_entity((Transform { x: 1.0 },)).unwrap();
        let b = engine.create_entity((Transform { x: 1.0 },)).unwrap();
        assert_ne!(a, b);
        assert!(engine.delete_entity(&a));
        assert!(engine.contains(&b));
        assert!(!engine.contains(&a));
    }

    #[test]
    fn enable_disable_require_ownership() {
        let mut engine = Engine::new();
        let e = engine.create_entity((Mesh(0),)).unwrap();
        assert!(engine.disable_entity(&e));
        assert!(!engine.get(&e).unwrap().is_enabled());
        assert!(engine.enable_entity(&e));
        assert!(engine.get(&e).unwrap().is_enabled());

        engine.delete_entity(&e);
        assert!(!engine.enable_entity(&e));
    }

    #[test]
    fn add_and_remove_component_through_engine() {
        let mut engine = Engine::new();
        let e = engine.create_entity((Mesh(0),)).unwrap();

        engine.add_component(&e, Camera).unwrap();
        assert_eq!(
            engine.add_component(&e, Camera).unwrap_err(),
            EcsError::DuplicateComponent {
                type_name: std::any::type_name::<Camera>()
            }
        );
        assert_eq!(engine.remove_component::<Camera>(&e), Some(Camera));
        assert_eq!(engine.remove_component::<Camera>(&e), None);

        engine.delete_entity(&e);
        assert_eq!(
            engine.add_component(&e, Camera).unwrap_err(),
            EcsError::NoSuchEntity
        );
    }

    #[test]
    fn get_mut_edits_without_moving_ownership() {
        let mut a = Engine::new();
        let mut b = Engine::new();
        let ea = a.create_entity((Transform { x: 0.0 },)).unwrap();
        let eb = b.create_entity((Transform { x: 1.0 },)).unwrap();

        a.get_mut(&ea).unwrap().get_mut::<Transform>().unwrap().x = 5.0;
        b.get_mut(&eb).unwrap().set_enabled(false);

        assert!(a.contains(&ea));
        assert!(!a.contains(&eb));
        assert_eq!(a.get_mut(&ea).unwrap().entity(), &ea);
        assert_eq!(a.get(&ea).unwrap().get::<Transform>().unwrap().x, 5.0);
        assert!(!b.get(&eb).unwrap().is_enabled());
        assert!(b.get_mut(&ea).is_none());
        assert!(a.delete_entity(&ea));
        assert!(b.delete_entity(&eb));
    }

    #[test]
    fn delete_entities_where_checks_each_once() {
        let mut engine = Engine::new();
        let keep = engine.create_entity((Mesh(1),)).unwrap();
        for i in 0..5 {
            engine.create_entity((Mesh(i * 2),)).unwrap();
        }
        let mut examined = 0;
        let deleted = engine.delete_entities_where(|data| {
            examined += 1;
            data.get::<Mesh>().is_some_and(|m| m.0 % 2 == 0)
        });
        assert_eq!(examined, 6);
        assert_eq!(deleted, 5);
        assert_eq!(engine.entity_count(), 1);
        assert!(engine.contains(&keep));
    }

    #[test]
    fn clear_and_drop_detach_handles() {
        let mut engine = Engine::new();
        let a = engine.create_entity((Mesh(0),)).unwrap();
        engine.clear();
        assert!(engine.is_empty());
        assert!(!a.is_attached());

        let b = engine.create_entity((Mesh(1),)).unwrap();
        drop(engine);
        assert!(!b.is_attached());
    }

    #[test]
    fn with_config_presizes_store() {
        let config = EngineConfig {
            initial_capacity: 64,
            ..EngineConfig::default()
        };
        let engine = Engine::with_config(config);
        assert!(engine.entities.capacity() >= 64);
    }

    // ── Queries ──────────────────────────────────────────────────────

    #[test]
    fn query_matches_only_full_sets() {
        let mut engine = Engine::new();
        let e1 = engine.create_entity((Mesh(1), Transform { x: 1.0 })).unwrap();
        let _e2 = engine.create_entity((Transform { x: 2.0 },)).unwrap();

        let matches: Vec<_> = engine
            .find_entities_with::<(&Mesh, &Transform)>()
            .map(|m| (m.entity.clone(), m.components.0.0))
            .collect();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].0, e1);
        assert_eq!(matches[0].1, 1);

        assert_eq!(count::<(&Mesh, &Camera)>(&mut engine), 0);
        assert_eq!(count::<&Transform>(&mut engine), 2);
    }

    #[test]
    fn query_components_follow_argument_order() {
        let mut engine = Engine::new();
        engine.create_entity((Mesh(7), Transform { x: 3.0 }, Light(0.5))).unwrap();

        let m = engine
            .query_single::<(&Light, &Transform, &Mesh)>()
            .unwrap();
        let (light, transform, mesh) = m.components;
        assert_eq!((light.0, transform.x, mesh.0), (0.5, 3.0, 7));
    }

    #[test]
    fn disabled_entities_vanish_from_every_arity() {
        let mut engine = Engine::new();
        let e1 = engine
            .create_entity((Mesh(1), Transform { x: 0.0 }, Light(1.0)))
            .unwrap();
        engine
            .create_entity((Mesh(2), Transform { x: 0.0 }, Light(1.0)))
            .unwrap();

        engine.disable_entity(&e1);
        assert_eq!(count::<&Mesh>(&mut engine), 1);
        assert_eq!(count::<(&Mesh, &Transform)>(&mut engine), 1);
        assert_eq!(count::<(&Mesh, &Transform, &Light)>(&mut engine), 1);

        engine.enable_entity(&e1);
        assert_eq!(count::<&Mesh>(&mut engine), 2);
        assert_eq!(count::<(&Mesh, &Transform)>(&mut engine), 2);
        assert_eq!(count::<(&Mesh, &Transform, &Light)>(&mut engine), 2);
    }

    #[test]
    fn query_mutations_persist() {
        let mut engine = Engine::new();
        let e = engine.create_entity((Transform { x: 0.0 }, Light(2.0))).unwrap();

        for m in engine.find_entities_with::<(&mut Transform, &Light)>() {
            let (transform, light) = m.components;
            transform.x += light.0;
        }
        assert_eq!(engine.get(&e).unwrap().get::<Transform>().unwrap().x, 2.0);
    }

    #[test]
    fn query_is_restartable() {
        let mut engine = Engine::new();
        engine.create_entity((Mesh(0),)).unwrap();
        engine.create_entity((Mesh(1),)).unwrap();
        assert_eq!(count::<&Mesh>(&mut engine), 2);
        assert_eq!(count::<&Mesh>(&mut engine), 2);
    }

    #[test]
    fn query_single_finds_camera() {
        let mut engine = Engine::new();
        engine.create_entity((Mesh(0),)).unwrap();
        assert!(engine.query_single::<&Camera>().is_none());
        let cam = engine.create_entity((Camera, Transform { x: 9.0 })).unwrap();
        let m = engine.query_single::<(&Camera, &Transform)>().unwrap();
        assert_eq!(*m.entity, cam);
        assert_eq!(m.components.1.x, 9.0);
    }

    #[test]
    #[should_panic(expected = "more than once")]
    fn query_naming_a_type_twice_panics() {
        let mut engine = Engine::new();
        engine.create_entity((Mesh(0),)).unwrap();
        let _ = engine.find_entities_with::<(&mut Mesh, &Mesh)>().count();
    }

    // ── Systems ──────────────────────────────────────────────────────

    #[test]
    fn systems_run_once_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut engine = Engine::new();
        for name in ["s1", "s2", "s3"] {
            let log = Rc::clone(&log);
            engine.add_system(move |_: &mut Engine, _: f32| log.borrow_mut().push(name));
        }

        engine.run(0.016);
        assert_eq!(*log.borrow(), vec!["s1", "s2", "s3"]);
        engine.run(0.016);
        assert_eq!(log.borrow().len(), 6);
        assert_eq!(engine.tick(), 2);
    }

    #[test]
    fn systems_receive_delta() {
        let seen = Rc::new(RefCell::new(0.0f32));
        let mut engine = Engine::new();
        let sink = Rc::clone(&seen);
        engine.add_system(move |_: &mut Engine, dt: f32| *sink.borrow_mut() = dt);
        engine.run(0.25);
        assert_eq!(*seen.borrow(), 0.25);
    }

    #[test]
    fn later_systems_see_earlier_mutations() {
        let seen = Rc::new(RefCell::new(0));
        let mut engine = Engine::new();
        engine.add_system(|engine: &mut Engine, _: f32| {
            engine.create_entity((Mesh(0),)).unwrap();
        });
        let sink = Rc::clone(&seen);
        engine.add_system(move |engine: &mut Engine, _: f32| {
            *sink.borrow_mut() = engine.find_entities_with::<&Mesh>().count();
        });
        engine.run(0.0);
        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn systems_added_mid_tick_start_next_tick() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut engine = Engine::new();
        let outer = Rc::clone(&log);
        let mut added = false;
        engine.add_system(move |engine: &mut Engine, _: f32| {
            outer.borrow_mut().push("spawner");
            if !added {
                added = true;
                let inner = Rc::clone(&outer);
                engine.add_system(move |_: &mut Engine, _: f32| inner.borrow_mut().push("late"));
            }
        });

        engine.run(0.0);
        assert_eq!(*log.borrow(), vec!["spawner"]);
        assert_eq!(engine.system_count(), 2);
        engine.run(0.0);
        assert_eq!(*log.borrow(), vec!["spawner", "spawner", "late"]);
    }

    #[test]
    fn panicking_system_keeps_schedule() {
        let runs = Rc::new(RefCell::new(0));
        let mut engine = Engine::new();
        let counter = Rc::clone(&runs);
        engine.add_system(move |_: &mut Engine, _: f32| *counter.borrow_mut() += 1);
        let mut first = true;
        engine.add_system(move |_: &mut Engine, _: f32| {
            if std::mem::take(&mut first) {
                panic!("first tick fails");
            }
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| engine.run(0.0)));
        assert!(result.is_err());
        assert_eq!(engine.system_count(), 2);

        engine.run(0.0);
        assert_eq!(*runs.borrow(), 2);
    }

    #[test]
    fn deferred_deletes_apply_after_last_system() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut engine = Engine::new();
        engine.create_entity((Mesh(0),)).unwrap();
        engine.create_entity((Mesh(1),)).unwrap();

        engine.add_system(|engine: &mut Engine, _: f32| {
            let doomed: Vec<Entity> = engine
                .find_entities_with::<&Mesh>()
                .map(|m| m.entity.clone())
                .collect();
            for e in &doomed {
                engine.defer_delete(e);
            }
        });
        let sink = Rc::clone(&seen);
        engine.add_system(move |engine: &mut Engine, _: f32| {
            sink.borrow_mut().push(engine.entity_count());
        });

        engine.run(0.0);
        assert_eq!(*seen.borrow(), vec![2]);
        assert_eq!(engine.entity_count(), 0);
    }

    #[test]
    fn apply_deferred_skips_gone_entities() {
        let mut engine = Engine::new();
        let e = engine.create_entity((Mesh(0),)).unwrap();
        engine.defer_delete(&e);
        engine.defer_delete(&e);
        assert_eq!(engine.apply_deferred(), 1);
        assert_eq!(engine.apply_deferred(), 0);
    }

    #[cfg(feature = "diagnostics")]
    #[test]
    fn tick_counters_saturate() {
        let mut near_max = u32::MAX - 1;
        bump(&mut near_max, 5);
        assert_eq!(near_max, u32::MAX);

        let mut zero = 0;
        bump(&mut zero, usize::MAX);
        assert_eq!(zero, u32::MAX);

        let mut small = 3;
        bump(&mut small, 2);
        assert_eq!(small, 5);
    }

    #[cfg(feature = "diagnostics")]
    #[test]
    fn diagnostics_track_tick_churn() {
        fn churn(engine: &mut Engine, _delta: f32) {
            let e = engine.create_entity((Mesh(0),)).unwrap();
            engine.defer_delete(&e);
        }

        let mut engine = Engine::new();
        engine.create_entity((Mesh(0),)).unwrap();
        engine.add_system(churn);
        engine.run(0.016);

        let snapshot = engine.diagnostics();
        assert_eq!(snapshot.tick, 1);
        assert_eq!(snapshot.entity_count, 1);
        assert_eq!(snapshot.created_this_tick, 1);
        assert_eq!(snapshot.deleted_this_tick, 1);
        assert_eq!(snapshot.system_timings.len(), 1);
        assert_eq!(snapshot.system_timings[0].name, "churn");
    }
}
