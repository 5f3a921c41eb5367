//! Error type shared by the ECS.
//!
//! Only programmer errors and resource exhaustion are errors. Expected
//! absence (deleting an entity twice, looking up a component the entity
//! doesn't carry) is reported through `bool` / `Option` instead.

use std::collections::TryReserveError;

use thiserror::Error;

/// Errors raised by the slot store, entities, and the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// A component of this type is already attached to the entity.
    #[error("entity already has a component of type `{type_name}`")]
    DuplicateComponent {
        /// Fully-qualified name of the rejected component type.
        type_name: &'static str,
    },

    /// A slot index outside `[0, len)` was used. Usually a stale id.
    #[error("slot index {index} out of range (len {len})")]
    OutOfRange {
        /// The offending index.
        index: usize,
        /// Number of occupied slots at the time of the access.
        len: usize,
    },

    /// The slot store could not grow its backing storage.
    #[error("slot store allocation failed: {0}")]
    Allocation(#[from] TryReserveError),

    /// The element's handle already names a slot, in this store or another.
    #[error("handle is already stored at slot {id}")]
    AlreadyStored {
        /// The slot the handle currently points at.
        id: usize,
    },

    /// The handle is not owned by this engine (deleted, or from another engine).
    #[error("entity is not owned by this engine")]
    NoSuchEntity,
}

/// Shorthand for results carrying an [`EcsError`].
pub type Result<T> = std::result::Result<T, EcsError>;
