//! Retrace Log -- Operation logging and replay-script generation.
//!
//! This crate turns the invoke/result events of a modeling kernel into an
//! ordered, renderer-agnostic statement sequence that rebuilds an equivalent
//! model when replayed against a fresh kernel. Runtime entity identifiers are
//! not stable across runs, so callers can attach hints that replace literal
//! identifiers with lookups into earlier results.
//!
//! # Modules
//!
//! - [`statement`]: the statement AST (`Assign`, `Call`, `SetValue`, `Comment`).
//! - [`session`]: session variable names and the preamble.
//! - [`hint`]: hints and the hint registry.
//! - [`diff`]: minimal parameter diffs.
//! - [`record`]: pending invocations, records, outcomes.
//! - [`log`]: the [`OperationLog`](log::OperationLog) tying it together.
//! - [`sink`]: incremental delivery to attached sinks.
//! - [`snapshot`]: serializable snapshots and BLAKE3 fingerprints.
//! - [`config`]: naming options.

#![deny(unsafe_code)]

pub mod config;
pub mod diff;
pub mod hint;
pub mod log;
pub mod record;
pub mod session;
pub mod sink;
pub mod snapshot;
pub mod statement;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors returned to callers of the operation log.
///
/// Invoke/result pairing problems are not here: they are recorded in history
/// as a [`RecordFault`](record::RecordFault) and logging continues.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// Two sessions derive the same variable name, or a label derives a name
    /// the log reserves for itself.
    #[error("session label '{label}' derives variable '{name}', which is already in use")]
    NameCollision { label: String, name: String },

    /// A hint points at a result that is not (usefully) in history.
    #[error("hint on '{item}'[{value_index}] cannot be resolved: {reason}")]
    UnresolvedHint {
        item: String,
        value_index: usize,
        reason: String,
    },

    /// A hint offset was zero or positive.
    #[error("hint on '{item}' has offset {offset}; offsets must be negative")]
    InvalidHintOffset { item: String, offset: i64 },

    /// An operation was invoked while another is still pending.
    #[error("cannot invoke '{requested}' while '{pending}' is still pending")]
    ReentrantInvocation { pending: String, requested: String },

    /// The log has been stopped.
    #[error("operation log is stopped; {operation} rejected")]
    StoppedLogMutation { operation: &'static str },

    /// A configuration value is unusable.
    #[error("invalid log configuration field '{field}': {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// Configuration or snapshot JSON could not be parsed or produced.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::config::LogConfig;
    pub use crate::diff::AttributeDiffer;
    pub use crate::hint::{Hint, HintRegistry};
    pub use crate::log::OperationLog;
    pub use crate::record::{
        OperationResult, Outcome, PendingInvocation, Record, RecordFault, ResultGroup,
    };
    pub use crate::session::{derive_name, SessionRegistry};
    pub use crate::sink::LogSink;
    pub use crate::snapshot::LogSnapshot;
    pub use crate::statement::{method, Expr, Statement};
    pub use crate::LogError;
}
