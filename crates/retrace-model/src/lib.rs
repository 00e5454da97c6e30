//! Retrace Model -- Read-only snapshots of the things an operation log observes.
//!
//! The operation log never talks to a modeling kernel directly. Hosts hand it
//! snapshots built from the types in this crate:
//!
//! - [`entity`]: opaque, UUID-backed entity references.
//! - [`session`]: session handles, types and labels.
//! - [`item`]: attribute items and operation parameter trees.
//! - [`path`]: item-name paths addressing nested items.

#![deny(unsafe_code)]

pub mod entity;
pub mod item;
pub mod path;
pub mod session;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while building or editing parameter snapshots.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// An item path had no segments, or an empty segment.
    #[error("item path must contain at least one non-empty segment")]
    EmptyItemPath,

    /// The enabled flag was set on an item that is not optional.
    #[error("item '{item}' is not optional")]
    NotOptional { item: String },

    /// A discrete selection was outside the enumeration.
    #[error("discrete item '{item}' has {choices} choices, index {index} is out of range")]
    DiscreteIndexOutOfRange {
        item: String,
        index: usize,
        choices: usize,
    },

    /// An edit was applied to an item of the wrong kind.
    #[error("item '{item}' is not a {expected} item")]
    WrongKind {
        item: String,
        expected: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::entity::EntityRef;
    pub use crate::item::{AttributeItem, Enablement, ItemKind, Parameters, Value};
    pub use crate::path::ItemPath;
    pub use crate::session::{Session, SessionHandle};
    pub use crate::ModelError;
}
