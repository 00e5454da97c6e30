//! Modeling sessions as seen by the operation log.
//!
//! A [`Session`] is a read-only snapshot of a kernel session: an opaque
//! handle, the session type the kernel would be asked to create on replay
//! (e.g. `"cgm"`, `"polygon"`), and the user-visible label that the log
//! turns into a script variable name.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// Opaque handle identifying a session within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionHandle(pub u64);

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A session snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Identity of the session in the current run.
    pub handle: SessionHandle,
    /// The session type name used to recreate it.
    pub kind: String,
    /// Display label. Two sessions may share a label; the log decides what
    /// that means for variable names.
    pub label: String,
}

impl Session {
    /// Convenience constructor.
    pub fn new(handle: u64, kind: &str, label: &str) -> Self {
        Self {
            handle: SessionHandle(handle),
            kind: kind.to_owned(),
            label: label.to_owned(),
        }
    }
}
