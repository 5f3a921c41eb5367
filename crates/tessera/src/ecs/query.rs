//! # Query — Finding Entities by Component Type
//!
//! Systems ask the engine for every entity that carries a particular set of
//! component types:
//!
//! ```ignore
//! for m in engine.find_entities_with::<(&mut Transform, &Spin)>() {
//!     let (transform, spin) = m.components;
//!     transform.rotation *= Quat::from_rotation_y(spin.speed * delta);
//! }
//! ```
//!
//! ## How a Query Runs
//!
//! ```text
//! 1. Collect the TypeIds of the query: [Transform, Spin] (fixed-size ArrayVec)
//! 2. Walk the slot store in physical order. For each entity:
//!    - skip it if disabled
//!    - skip it unless it has every queried type
//!    - otherwise borrow each component straight out of its map and yield
//!      Match { entity, components: (&mut Transform, &Spin) }
//! ```
//!
//! Nothing is heap-allocated, either per call or per match. The match record
//! is a small tuple of references built on the stack.
//!
//! ## Borrowing Instead of a Shared Buffer
//!
//! A query iterator, and every match it yields, mutably borrows the engine.
//! While any of them is alive no entity can be created or deleted (use
//! [`Engine::defer_delete`](super::engine::Engine::defer_delete) instead) and
//! no second query can start.
//!
//! `QueryIter` is an ordinary iterator, so matches may be collected and held
//! together. That is sound: each match borrows components of a different
//! entity. Copy out what you need (a camera matrix, say) and drop the matches
//! before starting the next query.
//!
//! ## The `Query` Trait
//!
//! Implemented for `&T` (shared), `&mut T` (exclusive), and tuples of up to 8
//! of those. Naming the same type twice in one query panics: two `&mut` to
//! one component would alias.

use std::any::{Any, TypeId, type_name};
use std::marker::PhantomData;

use arrayvec::ArrayVec;

use super::entity::{ComponentMap, Entity, EntityData};

/// Most component types a single query can name.
pub const MAX_QUERY_TYPES: usize = 8;

/// The component types a query needs, in fetch order.
pub type QueryTypes = ArrayVec<TypeId, MAX_QUERY_TYPES>;

/// Components borrowed out of one entity, waiting to be fetched in order.
pub struct Fetched<'w> {
    cells: [Option<&'w mut (dyn Any + 'static)>; MAX_QUERY_TYPES],
    next: usize,
}

impl<'w> Fetched<'w> {
    /// Borrow the queried components out of one entity's map. `None` unless
    /// every type in `types` is present.
    fn gather(types: &QueryTypes, components: &'w mut ComponentMap) -> Option<Self> {
        if !types.iter().all(|t| components.contains_key(t)) {
            return None;
        }
        let mut cells: [Option<&'w mut (dyn Any + 'static)>; MAX_QUERY_TYPES] =
            Default::default();
        for (type_id, component) in components.iter_mut() {
            if let Some(pos) = types.iter().position(|t| t == type_id) {
                cells[pos] = Some(&mut **component);
            }
        }
        Some(Self { cells, next: 0 })
    }

    /// Take the next component in query order.
    fn take(&mut self) -> &'w mut (dyn Any + 'static) {
        let index = self.next;
        self.next += 1;
        self.cells[index]
            .take()
            .unwrap_or_else(|| panic!("query component #{index} was not gathered"))
    }
}

/// Something a query can fetch from an entity.
pub trait Query {
    /// What one match yields.
    type Item<'w>;

    /// Push the component types this query needs, in fetch order.
    fn type_ids(types: &mut QueryTypes);

    /// Fetch the item from gathered components.
    fn fetch<'w>(fetched: &mut Fetched<'w>) -> Self::Item<'w>;
}

fn push_type<T: 'static>(types: &mut QueryTypes) {
    assert!(
        !types.is_full(),
        "queries are limited to {MAX_QUERY_TYPES} component types"
    );
    let type_id = TypeId::of::<T>();
    assert!(
        !types.contains(&type_id),
        "query names component `{}` more than once",
        type_name::<T>()
    );
    types.push(type_id);
}

/// Shared read access to a component.
impl<T: 'static> Query for &T {
    type Item<'w> = &'w T;

    fn type_ids(types: &mut QueryTypes) {
        push_type::<T>(types);
    }

    fn fetch<'w>(fetched: &mut Fetched<'w>) -> Self::Item<'w> {
        let any: &'w (dyn Any + 'static) = fetched.take();
        any.downcast_ref::<T>().unwrap_or_else(|| {
            panic!("query type mismatch: expected `{}`", type_name::<T>())
        })
    }
}

/// Exclusive write access to a component.
impl<T: 'static> Query for &mut T {
    type Item<'w> = &'w mut T;

    fn type_ids(types: &mut QueryTypes) {
        push_type::<T>(types);
    }

    fn fetch<'w>(fetched: &mut Fetched<'w>) -> Self::Item<'w> {
        fetched.take().downcast_mut::<T>().unwrap_or_else(|| {
            panic!("query type mismatch: expected `{}`", type_name::<T>())
        })
    }
}

macro_rules! impl_query_tuple {
    ($($Q:ident),+) => {
        impl<$($Q: Query),+> Query for ($($Q,)+) {
            type Item<'w> = ($($Q::Item<'w>,)+);

            fn type_ids(types: &mut QueryTypes) {
                $($Q::type_ids(types);)+
            }

            fn fetch<'w>(fetched: &mut Fetched<'w>) -> Self::Item<'w> {
                ($($Q::fetch(fetched),)+)
            }
        }
    };
}

impl_query_tuple!(A);
impl_query_tuple!(A, B);
impl_query_tuple!(A, B, C);
impl_query_tuple!(A, B, C, D);
impl_query_tuple!(A, B, C, D, E);
impl_query_tuple!(A, B, C, D, E, F);
impl_query_tuple!(A, B, C, D, E, F, G);
impl_query_tuple!(A, B, C, D, E, F, G, H);

/// One query result: the matching entity and its components in query order.
pub struct Match<'w, Q: Query> {
    pub entity: &'w Entity,
    pub components: Q::Item<'w>,
}

/// Lazy iterator over the matches of one query call.
///
/// Finite, in slot order. Call the query again to restart it.
pub struct QueryIter<'w, Q: Query> {
    entities: std::slice::IterMut<'w, EntityData>,
    types: QueryTypes,
    _query: PhantomData<fn() -> Q>,
}

impl<'w, Q: Query> QueryIter<'w, Q> {
    pub(crate) fn new(entities: std::slice::IterMut<'w, EntityData>) -> Self {
        let mut types = QueryTypes::new();
        Q::type_ids(&mut types);
        Self {
            entities,
            types,
            _query: PhantomData,
        }
    }
}

impl<'w, Q: Query> Iterator for QueryIter<'w, Q> {
    type Item = Match<'w, Q>;

    fn next(&mut self) -> Option<Self::Item> {
        for data in self.entities.by_ref() {
            // Split the borrow: the handle is yielded shared, the map mutably.
            let EntityData {
                handle,
                components,
                enabled,
            } = data;
            if !*enabled {
                continue;
            }
            if let Some(mut fetched) = Fetched::gather(&self.types, components) {
                return Some(Match {
                    entity: handle,
                    components: Q::fetch(&mut fetched),
                });
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.entities.len()))
    }
}

impl<Q: Query> std::iter::FusedIterator for QueryIter<'_, Q> {}
