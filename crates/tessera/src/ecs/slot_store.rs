//! # Slot Store — Dense Storage With O(1) Removal
//!
//! A [`SlotStore`] keeps its elements packed at the front of a `Vec`. Every
//! element owns a [`Handle`]: a shared cell holding the element's *current*
//! slot index. The caller keeps a clone of the handle, so the store can find
//! the element in O(1) without searching.
//!
//! ## Swap-Remove
//!
//! Removing from the middle of a dense array normally shifts everything after
//! it. Instead, the last element jumps into the hole and its handle is patched:
//!
//! ```text
//! before remove(0):   [ e0 | e1 | e2 ]     e2.id == 2
//! after  remove(0):   [ e2 | e1 ]          e2.id == 0, e0 detached
//! ```
//!
//! Nobody else's handle changes, and since the moved element's handle is the
//! same shared cell the caller holds, the caller sees the new index too.
//!
//! The price is order: iteration follows the physical layout, and any removal
//! may move the last element. Don't rely on order across removals.
//!
//! ## Identity, Not Equality
//!
//! [`SlotStore::contains`] asks "is *this* handle stored at its slot?", which
//! is a pointer comparison. Two elements that compare equal by value are
//! still distinct.
//!
//! A handle lives in at most one slot of one store. [`SlotStore::add`]
//! rejects an element whose handle is already attached.
//!
//! ## Comparison
//!
//! - **slotmap / generational arenas**: hand out `(index, generation)` keys
//!   and leave holes. Lookups check the generation instead of an identity.
//! - **here**: no holes and no generations. The handle itself is the
//!   identity, which is what lets removal stay O(1) while the array stays dense.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::error::{EcsError, Result};

/// Capacity used when a store is created without one, or grows from zero.
pub const DEFAULT_CAPACITY: usize = 10;

/// Slot index of a handle that isn't stored anywhere.
const DETACHED: usize = usize::MAX;

/// Shared back-pointer to an element's slot in a [`SlotStore`].
///
/// Cloning a handle is cheap (a reference count bump) and every clone sees
/// the same index. Handles compare by identity: two handles are equal only if
/// they are clones of the same original.
///
/// A handle belongs to at most one store at a time.
#[derive(Clone)]
pub struct Handle {
    slot: Rc<Cell<usize>>,
}

impl Handle {
    /// Create a detached handle.
    pub fn new() -> Self {
        Self {
            slot: Rc::new(Cell::new(DETACHED)),
        }
    }

    /// Current slot index, or `None` if the handle isn't stored.
    pub fn id(&self) -> Option<usize> {
        let id = self.slot.get();
        (id != DETACHED).then_some(id)
    }

    /// Returns `true` if both handles are clones of the same original.
    pub fn ptr_eq(&self, other: &Handle) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }

    fn raw(&self) -> usize {
        self.slot.get()
    }

    fn set(&self, id: usize) {
        self.slot.set(id);
    }

    fn detach(&self) {
        self.slot.set(DETACHED);
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Handle {}

impl std::hash::Hash for Handle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.slot).hash(state);
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id() {
            Some(id) => write!(f, "Handle({id})"),
            None => write!(f, "Handle(detached)"),
        }
    }
}

/// Anything that can live in a [`SlotStore`]: it exposes its own handle.
pub trait Slotted {
    fn handle(&self) -> &Handle;
}

/// Dense, unordered container with O(1) insert, identity lookup, and removal.
///
/// ## Memory Layout
///
/// ```text
/// items:    [ a | b | c | _ | _ ]   ← len 3, capacity 5
/// a.id = 0, b.id = 1, c.id = 2      ← invariant: items[h.id] is h
/// ```
///
/// Capacity doubles when full and is never given back on removal.
pub struct SlotStore<T: Slotted> {
    items: Vec<T>,
}

impl<T: Slotted> SlotStore<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of slots allocated, occupied or not.
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    /// Append an element and return the slot it was assigned.
    ///
    /// # Errors
    ///
    /// [`EcsError::AlreadyStored`] if the element's handle is attached to a
    /// slot already (here or in another store); the element is dropped and
    /// the stored one keeps its back-pointer. [`EcsError::Allocation`] if the
    /// backing storage can't grow.
    pub fn add(&mut self, item: T) -> Result<usize> {
        if let Some(id) = item.handle().id() {
            return Err(EcsError::AlreadyStored { id });
        }
        if self.items.len() == self.items.capacity() {
            self.grow()?;
        }
        let id = self.items.len();
        item.handle().set(id);
        self.items.push(item);
        Ok(id)
    }

    /// Remove the element at `id`, moving the last element into its slot.
    pub fn remove(&mut self, id: usize) -> Result<T> {
        self.check_bounds(id)?;
        Ok(self.swap_remove(id))
    }

    /// Remove the element owning `handle`, if it is stored here.
    pub fn remove_item(&mut self, handle: &Handle) -> Option<T> {
        if self.contains(handle) {
            Some(self.swap_remove(handle.raw()))
        } else {
            None
        }
    }

    /// Returns `true` if the element owning `handle` is stored here.
    pub fn contains(&self, handle: &Handle) -> bool {
        self.items
            .get(handle.raw())
            .is_some_and(|item| item.handle().ptr_eq(handle))
    }

    pub fn get(&self, id: usize) -> Result<&T> {
        self.check_bounds(id)?;
        Ok(&self.items[id])
    }

    pub fn get_mut(&mut self, id: usize) -> Result<&mut T> {
        self.check_bounds(id)?;
        Ok(&mut self.items[id])
    }

    /// Look up an element by identity. `None` if the handle isn't stored here.
    pub fn get_by_handle(&self, handle: &Handle) -> Option<&T> {
        self.items
            .get(handle.raw())
            .filter(|item| item.handle().ptr_eq(handle))
    }

    /// Mutable variant of [`get_by_handle`](Self::get_by_handle).
    pub fn get_by_handle_mut(&mut self, handle: &Handle) -> Option<&mut T> {
        self.items
            .get_mut(handle.raw())
            .filter(|item| item.handle().ptr_eq(handle))
    }

    /// Keep only the elements for which `keep` returns `true`.
    ///
    /// Every element is visited exactly once: after a removal the element that
    /// was swapped into the current slot is examined next.
    pub fn retain(&mut self, mut keep: impl FnMut(&mut T) -> bool) {
        let mut i = 0;
        while i < self.items.len() {
            if keep(&mut self.items[i]) {
                i += 1;
            } else {
                self.swap_remove(i);
            }
        }
    }

    /// Remove every element, detaching their handles. Capacity is kept.
    pub fn clear(&mut self) {
        for item in self.items.drain(..) {
            item.handle().detach();
        }
    }

    /// Iterate the occupied slots in physical order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    fn check_bounds(&self, id: usize) -> Result<()> {
        if id < self.items.len() {
            Ok(())
        } else {
            Err(EcsError::OutOfRange {
                index: id,
                len: self.items.len(),
            })
        }
    }

    /// Caller guarantees `id < len`.
    fn swap_remove(&mut self, id: usize) -> T {
        let removed = self.items.swap_remove(id);
        if let Some(moved) = self.items.get(id) {
            moved.handle().set(id);
        }
        removed.handle().detach();
        removed
    }

    /// Double the capacity (or start at [`DEFAULT_CAPACITY`] from zero).
    fn grow(&mut self) -> Result<()> {
        let additional = match self.items.capacity() {
            0 => DEFAULT_CAPACITY,
            capacity => capacity,
        };
        self.items.try_reserve_exact(additional)?;
        Ok(())
    }
}

impl<T: Slotted> Default for SlotStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T: Slotted> IntoIterator for &'a SlotStore<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T: Slotted> IntoIterator for &'a mut SlotStore<T> {
    type Item = &'a mut T;
    type IntoIter = std::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
