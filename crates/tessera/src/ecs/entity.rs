//! # Entity — Handles and Their Component Bags
//!
//! An [`Entity`] is what callers hold: a cheap, clonable handle. The data it
//! names, an [`EntityData`], lives inside the [`Engine`](super::engine::Engine)'s
//! slot store and is reached through the engine.
//!
//! ## Components
//!
//! Each entity carries at most one component per type, keyed by [`TypeId`]:
//!
//! ```text
//! EntityData {
//!     components: { TypeId(Mesh) → Box<Mesh>, TypeId(Transform) → Box<Transform> }
//!     enabled: true
//! }
//! ```
//!
//! Components are stored as `Box<dyn Any>` and recovered with `downcast_ref`.
//! Attaching a second component of a type that is already present is a
//! programmer error and fails with [`EcsError::DuplicateComponent`]; the
//! original stays attached.
//!
//! ## Handles After Deletion
//!
//! Deleting an entity detaches its handle. Every engine lookup through a
//! detached handle returns `None` / `false`, so holding on to one is harmless.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;

use super::slot_store::{Handle, Slotted};
use crate::error::{EcsError, Result};

/// Type-keyed component storage of one entity.
pub(crate) type ComponentMap = HashMap<TypeId, Box<dyn Any>>;

/// A lightweight handle to an entity owned by an [`Engine`](super::engine::Engine).
///
/// Handles compare by identity. Cloning one gives another name for the same
/// entity; two entities with identical components are never equal.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Entity(pub(crate) Handle);

impl Entity {
    pub(crate) fn new() -> Self {
        Self(Handle::new())
    }

    /// Current slot index inside the owning engine, or `None` once deleted.
    ///
    /// The index can change whenever another entity is deleted. It's useful
    /// for diagnostics, not as a key.
    pub fn id(&self) -> Option<usize> {
        self.0.id()
    }

    /// Returns `true` if both handles name the same entity. Same as `==`.
    pub fn ptr_eq(&self, other: &Entity) -> bool {
        self.0.ptr_eq(&other.0)
    }

    /// Returns `true` while the entity is stored in an engine.
    pub fn is_attached(&self) -> bool {
        self.0.id().is_some()
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id() {
            Some(id) => write!(f, "Entity({id})"),
            None => write!(f, "Entity(deleted)"),
        }
    }
}

/// The components and enabled flag of one entity.
///
/// Only the engine creates these. Read one through
/// [`Engine::get`](super::engine::Engine::get); edit one through the
/// [`EntityMut`] that [`Engine::get_mut`](super::engine::Engine::get_mut)
/// hands out.
pub struct EntityData {
    pub(crate) handle: Entity,
    pub(crate) components: ComponentMap,
    pub(crate) enabled: bool,
}

impl EntityData {
    pub(crate) fn new(handle: Entity) -> Self {
        Self {
            handle,
            components: HashMap::new(),
            enabled: false,
        }
    }

    /// The handle naming this entity.
    pub fn entity(&self) -> &Entity {
        &self.handle
    }

    /// Attach a component.
    ///
    /// # Errors
    ///
    /// [`EcsError::DuplicateComponent`] if a component of type `T` is already
    /// attached. The existing component is left untouched.
    pub fn add<T: 'static>(&mut self, component: T) -> Result<&mut Self> {
        let key = TypeId::of::<T>();
        if self.components.contains_key(&key) {
            return Err(EcsError::DuplicateComponent {
                type_name: type_name::<T>(),
            });
        }
        self.components.insert(key, Box::new(component));
        Ok(self)
    }

    /// Get the component of type `T`, if attached.
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.components
            .get(&TypeId::of::<T>())
            .and_then(|c| c.downcast_ref::<T>())
    }

    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.components
            .get_mut(&TypeId::of::<T>())
            .and_then(|c| c.downcast_mut::<T>())
    }

    /// Detach the component of type `T` and hand it back.
    pub fn remove<T: 'static>(&mut self) -> Option<T> {
        self.components
            .remove(&TypeId::of::<T>())
            .and_then(|c| c.downcast::<T>().ok())
            .map(|c| *c)
    }

    /// Detach (and drop) whatever component is stored under `type_id`.
    ///
    /// Returns `false` if there was none.
    pub fn remove_type(&mut self, type_id: TypeId) -> bool {
        self.components.remove(&type_id).is_some()
    }

    /// Returns `true` if `component` *is* the attached component of its type.
    ///
    /// This compares addresses, so only a reference obtained from this entity
    /// passes. Zero-sized components have no address of their own and always
    /// match when present.
    pub fn contains<T: 'static>(&self, component: &T) -> bool {
        self.get::<T>()
            .is_some_and(|attached| std::ptr::eq(attached, component))
    }

    /// Returns `true` if a component of type `T` is attached.
    pub fn contains_type<T: 'static>(&self) -> bool {
        self.components.contains_key(&TypeId::of::<T>())
    }

    pub fn contains_type_id(&self, type_id: TypeId) -> bool {
        self.components.contains_key(&type_id)
    }

    /// The types of every attached component, in no particular order.
    pub fn component_type_ids(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.components.keys().copied()
    }

    /// Number of attached components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Disabled entities keep their components but never match a query.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Drop every component. Called once by the engine when the entity is deleted.
    pub(crate) fn dispose(&mut self) {
        self.components = HashMap::new();
        self.enabled = false;
    }
}

impl Slotted for EntityData {
    fn handle(&self) -> &Handle {
        &self.handle.0
    }
}

impl fmt::Debug for EntityData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityData")
            .field("entity", &self.handle)
            .field("components", &self.components.len())
            .field("enabled", &self.enabled)
            .finish()
    }
}

// ── Mutable Access ──────────────────────────────────────────────────────

/// Write access to one stored entity.
///
/// Reads go through `Deref` to [`EntityData`]. Writes are limited to the
/// components and the enabled flag; the entity data itself can't be replaced
/// or swapped, so the handle it carries always matches its slot.
///
/// ```compile_fail
/// use tessera::Engine;
///
/// let mut a = Engine::new();
/// let mut b = Engine::new();
/// let ea = a.create_empty().unwrap();
/// let eb = b.create_empty().unwrap();
/// std::mem::swap(&mut *a.get_mut(&ea).unwrap(), &mut *b.get_mut(&eb).unwrap());
/// ```
pub struct EntityMut<'a> {
    data: &'a mut EntityData,
}

impl<'a> EntityMut<'a> {
    pub(crate) fn new(data: &'a mut EntityData) -> Self {
        Self { data }
    }

    /// Attach a component. See [`EntityData::add`].
    pub fn add<T: 'static>(&mut self, component: T) -> Result<&mut Self> {
        self.data.add(component)?;
        Ok(self)
    }

    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.data.get_mut::<T>()
    }

    /// Detach the component of type `T` and hand it back.
    pub fn remove<T: 'static>(&mut self) -> Option<T> {
        self.data.remove::<T>()
    }

    pub fn remove_type(&mut self, type_id: TypeId) -> bool {
        self.data.remove_type(type_id)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.data.set_enabled(enabled);
    }
}

impl Deref for EntityMut<'_> {
    type Target = EntityData;

    fn deref(&self) -> &EntityData {
        self.data
    }
}

impl fmt::Debug for EntityMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.data.fmt(f)
    }
}

// ── Bundles ─────────────────────────────────────────────────────────────

/// A set of components attached together when an entity is created.
///
/// Implemented for `()` and for tuples of up to 8 components.
pub trait Bundle {
    /// Attach every component, in tuple order, stopping at the first error.
    fn attach(self, data: &mut EntityData) -> Result<()>;
}

impl Bundle for () {
    fn attach(self, _data: &mut EntityData) -> Result<()> {
        Ok(())
    }
}

macro_rules! impl_bundle {
    ($($T:ident),+) => {
        impl<$($T: 'static),+> Bundle for ($($T,)+) {
            #[allow(non_snake_case)]
            fn attach(self, data: &mut EntityData) -> Result<()> {
                let ($($T,)+) = self;
                $(data.add($T)?;)+
                Ok(())
            }
        }
    };
}

impl_bundle!(A);
impl_bundle!(A, B);
impl_bundle!(A, B, C);
impl_bundle!(A, B, C, D);
impl_bundle!(A, B, C, D, E);
impl_bundle!(A, B, C, D, E, F);
impl_bundle!(A, B, C, D, E, F, G);
impl_bundle!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Transform {
        x: f32,
    }
    #[derive(Debug, PartialEq)]
    struct Mesh(u32);
    struct Camera;

    fn data() -> EntityData {
        EntityData::new(Entity::new())
    }

    #[test]
    fn add_and_get() {
        let mut e = data();
        e.add(Transform { x: 1.0 }).unwrap().add(Mesh(7)).unwrap();
        assert_eq!(e.get::<Transform>(), Some(&Transform { x: 1.0 }));
        assert_eq!(e.get::<Mesh>(), Some(&Mesh(7)));
        assert!(e.get::<Camera>().is_none());
        assert_eq!(e.len(), 2);
    }

    #[test]
    fn duplicate_type_is_rejected_and_original_kept() {
        let mut e = data();
        e.add(Mesh(1)).unwrap();
        let err = e.add(Mesh(2)).unwrap_err();
        assert!(matches!(err, EcsError::DuplicateComponent { type_name } if type_name.ends_with("Mesh")));
        assert_eq!(e.get::<Mesh>(), Some(&Mesh(1)));
        assert_eq!(e.len(), 1);
    }

    #[test]
    fn get_mut_edits_in_place() {
        let mut e = data();
        e.add(Transform { x: 0.0 }).unwrap();
        e.get_mut::<Transform>().unwrap().x = 5.0;
        assert_eq!(e.get::<Transform>().unwrap().x, 5.0);
    }

    #[test]
    fn remove_hands_component_back() {
        let mut e = data();
        e.add(Mesh(3)).unwrap();
        assert_eq!(e.remove::<Mesh>(), Some(Mesh(3)));
        assert_eq!(e.remove::<Mesh>(), None);
        assert!(!e.contains_type::<Mesh>());
    }

    #[test]
    fn remove_type_by_id() {
        let mut e = data();
        e.add(Camera).unwrap();
        assert!(e.remove_type(TypeId::of::<Camera>()));
        assert!(!e.remove_type(TypeId::of::<Camera>()));
    }

    #[test]
    fn contains_is_identity() {
        let mut e = data();
        e.add(Transform { x: 2.0 }).unwrap();
        let lookalike = Transform { x: 2.0 };
        assert!(!e.contains(&lookalike));
        let attached = e.get::<Transform>().unwrap();
        assert!(e.contains(attached));
    }

    #[test]
    fn contains_type_ignores_identity() {
        let mut e = data();
        e.add(Mesh(0)).unwrap();
        assert!(e.contains_type::<Mesh>());
        assert!(e.contains_type_id(TypeId::of::<Mesh>()));
        assert!(!e.contains_type::<Transform>());
    }

    #[test]
    fn enabled_flag_keeps_components() {
        let mut e = data();
        e.add(Mesh(0)).unwrap();
        e.set_enabled(true);
        assert!(e.is_enabled());
        e.set_enabled(false);
        assert!(!e.is_enabled());
        assert!(e.contains_type::<Mesh>());
    }

    #[test]
    fn dispose_drops_components() {
        use std::rc::Rc;

        let shared = Rc::new(());
        let mut e = data();
        e.add(Rc::clone(&shared)).unwrap();
        assert_eq!(Rc::strong_count(&shared), 2);
        e.dispose();
        assert_eq!(Rc::strong_count(&shared), 1);
        assert!(e.is_empty());
    }

    #[test]
    fn bundle_attaches_in_order_and_stops_at_duplicate() {
        let mut e = data();
        (Mesh(1), Transform { x: 0.0 }).attach(&mut e).unwrap();
        assert_eq!(e.len(), 2);

        let mut dup = data();
        let err = (Mesh(1), Camera, Mesh(2)).attach(&mut dup).unwrap_err();
        assert!(matches!(err, EcsError::DuplicateComponent { .. }));
        assert_eq!(dup.get::<Mesh>(), Some(&Mesh(1)));
    }

    #[test]
    fn entity_mut_edits_components_not_identity() {
        let entity = Entity::new();
        let mut stored = EntityData::new(entity.clone());
        let mut view = EntityMut::new(&mut stored);
        view.add(Mesh(1)).unwrap().add(Transform { x: 0.0 }).unwrap();
        view.get_mut::<Transform>().unwrap().x = 4.0;
        assert_eq!(view.remove::<Mesh>(), Some(Mesh(1)));
        view.set_enabled(true);

        assert!(view.is_enabled());
        assert_eq!(view.get::<Transform>(), Some(&Transform { x: 4.0 }));
        assert_eq!(view.entity(), &entity);
        assert!(!view.remove_type(TypeId::of::<Mesh>()));
    }

    #[test]
    fn clones_share_identity() {
        let a = Entity::new();
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&Entity::new()));
    }

    #[test]
    fn detached_entity_debug() {
        assert_eq!(format!("{:?}", Entity::new()), "Entity(deleted)");
    }
}
