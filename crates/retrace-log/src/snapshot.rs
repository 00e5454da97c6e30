//! Serializable log snapshots with BLAKE3 fingerprints.
//!
//! A [`LogSnapshot`] is the preamble plus the history of an
//! [`OperationLog`](crate::log::OperationLog) at one point in time. It can be
//! stored as JSON and reloaded for rendering later, and its
//! [`fingerprint`](LogSnapshot::fingerprint) gives a cheap equality check
//! between two logs (e.g. the log of a run and the log of its replay).

use serde::{Deserialize, Serialize};

use crate::record::Record;
use crate::statement::Statement;
use crate::LogError;

/// Preamble and history of a log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSnapshot {
    pub preamble: Vec<Statement>,
    pub records: Vec<Record>,
}

impl LogSnapshot {
    /// BLAKE3 hex digest (64 lowercase hex chars) of the snapshot's JSON.
    pub fn fingerprint(&self) -> String {
        let json_bytes = serde_json::to_vec(self)
            .expect("LogSnapshot should always be JSON-serializable");
        blake3::hash(&json_bytes).to_hex().to_string()
    }

    pub fn to_json(&self) -> Result<String, LogError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, LogError> {
        Ok(serde_json::from_str(text)?)
    }

    /// The preamble followed by every record's statements.
    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.preamble
            .iter()
            .chain(self.records.iter().flat_map(|r| r.statements.iter()))
    }
}
