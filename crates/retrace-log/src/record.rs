//! Pending invocations and finalized records.
//!
//! An invoke event produces a [`PendingInvocation`]; the matching result
//! event turns it into a [`Record`] that is appended to the log's history.
//! A result that does not match produces an error-marked record carrying a
//! [`RecordFault`] instead.

use retrace_model::entity::EntityRef;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::statement::Statement;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// How an operation finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    UnableToOperate,
    Canceled,
    Failed,
    Succeeded,
    Unknown,
}

impl Outcome {
    /// Map a kernel outcome code. Codes outside `0..=3` are [`Outcome::Unknown`].
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Outcome::UnableToOperate,
            1 => Outcome::Canceled,
            2 => Outcome::Failed,
            3 => Outcome::Succeeded,
            _ => Outcome::Unknown,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Outcome::UnableToOperate => 0,
            Outcome::Canceled => 1,
            Outcome::Failed => 2,
            Outcome::Succeeded => 3,
            Outcome::Unknown => 4,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Outcome::UnableToOperate => "unable to operate",
            Outcome::Canceled => "canceled",
            Outcome::Failed => "failed",
            Outcome::Succeeded => "succeeded",
            Outcome::Unknown => "unknown",
        };
        f.write_str(text)
    }
}

// ---------------------------------------------------------------------------
// ResultGroup
// ---------------------------------------------------------------------------

/// One of the three entity lists an operation result carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResultGroup {
    Created,
    Expunged,
    Modified,
}

impl ResultGroup {
    /// Name of the group as it appears in generated lookups.
    pub fn as_str(self) -> &'static str {
        match self {
            ResultGroup::Created => "created",
            ResultGroup::Expunged => "expunged",
            ResultGroup::Modified => "modified",
        }
    }
}

impl fmt::Display for ResultGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// OperationResult
// ---------------------------------------------------------------------------

/// What a result event reports about a finished operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub outcome: Outcome,
    pub created: Vec<EntityRef>,
    pub expunged: Vec<EntityRef>,
    pub modified: Vec<EntityRef>,
}

impl OperationResult {
    /// A result with the given outcome and no entity changes.
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            created: Vec::new(),
            expunged: Vec::new(),
            modified: Vec::new(),
        }
    }

    pub fn with_created(mut self, created: Vec<EntityRef>) -> Self {
        self.created = created;
        self
    }

    pub fn with_expunged(mut self, expunged: Vec<EntityRef>) -> Self {
        self.expunged = expunged;
        self
    }

    pub fn with_modified(mut self, modified: Vec<EntityRef>) -> Self {
        self.modified = modified;
        self
    }
}

// ---------------------------------------------------------------------------
// PendingInvocation
// ---------------------------------------------------------------------------

/// An operation that has been invoked but has not reported a result yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingInvocation {
    pub operation_name: String,
    /// Preamble variable of the session the operation runs in.
    pub session_var: String,
    /// Variable the operator is bound to (`op<n>`).
    pub operator_var: String,
    /// Variable the result will be captured in (`res<n>`).
    pub result_var: String,
    /// Instantiate, configure and invoke statements.
    pub statements: Vec<Statement>,
}

// ---------------------------------------------------------------------------
// RecordFault
// ---------------------------------------------------------------------------

/// Why a record was error-marked instead of carrying replay statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum RecordFault {
    /// A result arrived while nothing was pending.
    #[error("result for '{reported}' arrived with no pending invocation")]
    NoPendingInvocation { reported: String },

    /// The result named a different operation than the pending invocation.
    #[error("invocation of '{expected}' finished with a result for '{reported}'")]
    InvocationResultMismatch { expected: String, reported: String },
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// A finalized operation in the log's history. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Position in history (0-based, completion order).
    pub index: usize,
    pub name: String,
    /// `None` only for faults where no invocation was pending.
    pub session_var: Option<String>,
    /// Variable holding this operation's result on replay. `None` for faults,
    /// which never capture a result.
    pub result_var: Option<String>,
    pub statements: Vec<Statement>,
    pub outcome: Outcome,
    pub created: Vec<EntityRef>,
    pub expunged: Vec<EntityRef>,
    pub modified: Vec<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fault: Option<RecordFault>,
}

impl Record {
    /// The entity list of one result group.
    pub fn entities(&self, group: ResultGroup) -> &[EntityRef] {
        match group {
            ResultGroup::Created => &self.created,
            ResultGroup::Expunged => &self.expunged,
            ResultGroup::Modified => &self.modified,
        }
    }

    /// Whether this is an error-marked record.
    pub fn is_fault(&self) -> bool {
        self.fault.is_some()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
