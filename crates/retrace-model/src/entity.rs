//! Opaque entity references.
//!
//! An [`EntityRef`] names a model entity by the UUID the modeling kernel
//! assigned to it. The identifier is stable within one run but is not
//! guaranteed to match across runs, which is why the log can substitute
//! hints for literal references.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// EntityRef
// ---------------------------------------------------------------------------

/// An opaque, UUID-backed entity identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityRef(Uuid);

impl EntityRef {
    /// Wrap an existing UUID.
    #[inline]
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a fresh random reference.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Build a reference from a 128-bit value. Handy for deterministic fixtures.
    #[inline]
    pub fn from_u128(raw: u128) -> Self {
        Self(Uuid::from_u128(raw))
    }

    /// The underlying UUID.
    #[inline]
    pub fn uuid(self) -> Uuid {
        self.0
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityRef({})", self.0)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl From<Uuid> for EntityRef {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
