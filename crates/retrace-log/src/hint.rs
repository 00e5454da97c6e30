//! Hints: symbolic stand-ins for values that only exist at replay time.
//!
//! Entity identifiers differ between runs, so a literal UUID in a replay
//! script usually points at nothing. A [`Hint`] tells the differ to emit a
//! lookup instead: "take entry `entry_index` of the `result_group` list of the
//! result `result_offset` records back". Hints are attached to an exact
//! (item path, value index) position before the operation is invoked.
//!
//! # Example
//!
//! ```
//! use retrace_log::hint::HintRegistry;
//! use retrace_log::record::ResultGroup;
//! use retrace_model::path::ItemPath;
//!
//! let mut hints = HintRegistry::new();
//! let assoc = ItemPath::root("assoc");
//! hints.add_hint(&assoc, 1, -1, ResultGroup::Created, 0).unwrap();
//!
//! assert!(hints.lookup(&assoc, 1).is_some());
//! assert!(hints.lookup(&assoc, 0).is_none());
//! assert!(hints.add_hint(&assoc, 0, 0, ResultGroup::Created, 0).is_err());
//! ```

use std::collections::BTreeMap;

use retrace_model::path::ItemPath;
use serde::{Deserialize, Serialize};

use crate::record::{Record, ResultGroup};
use crate::statement::Expr;
use crate::LogError;

// ---------------------------------------------------------------------------
// Hint
// ---------------------------------------------------------------------------

/// A reference to a value inside an earlier result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hint {
    /// How many records back the result lives. Always negative: `-1` is the
    /// most recent record at diff time.
    pub result_offset: i64,
    pub result_group: ResultGroup,
    pub entry_index: usize,
    /// Name of the hinted item (last segment of its path).
    pub target_item_name: String,
    /// Value position inside the hinted item.
    pub target_value_index: usize,
}

impl Hint {
    /// Resolve against `history` into a lookup expression.
    ///
    /// # Errors
    ///
    /// [`LogError::UnresolvedHint`] if the offset reaches before the first
    /// record, the referenced record is error-marked, or its result group has
    /// no entry at `entry_index`.
    pub fn resolve(&self, history: &[Record]) -> Result<Expr, LogError> {
        let unresolved = |reason: String| LogError::UnresolvedHint {
            item: self.target_item_name.clone(),
            value_index: self.target_value_index,
            reason,
        };

        let absolute = history.len() as i64 + self.result_offset;
        if self.result_offset >= 0 || absolute < 0 {
            return Err(unresolved(format!(
                "offset {} is outside a history of {} record(s)",
                self.result_offset,
                history.len()
            )));
        }
        let record = &history[absolute as usize];
        let result_var = record.result_var.as_ref().ok_or_else(|| {
            unresolved(format!(
                "record {} ('{}') is error-marked and has no result",
                record.index, record.name
            ))
        })?;
        let available = record.entities(self.result_group).len();
        if self.entry_index >= available {
            return Err(unresolved(format!(
                "record {} has {available} {} entr{}, wanted entry {}",
                record.index,
                self.result_group,
                if available == 1 { "y" } else { "ies" },
                self.entry_index
            )));
        }

        Ok(Expr::Lookup {
            result_var: result_var.clone(),
            group: self.result_group,
            entry: self.entry_index,
        })
    }
}

// ---------------------------------------------------------------------------
// HintRegistry
// ---------------------------------------------------------------------------

/// Hints keyed by (item path, value index).
#[derive(Debug, Clone, Default)]
pub struct HintRegistry {
    hints: BTreeMap<(ItemPath, usize), Hint>,
}

impl HintRegistry {
    pub fn new() -> Self {
        Self {
            hints: BTreeMap::new(),
        }
    }

    /// Attach a hint to value `value_index` of the item at `path`, replacing
    /// any hint already there.
    ///
    /// # Errors
    ///
    /// [`LogError::InvalidHintOffset`] unless `result_offset` is strictly
    /// negative.
    pub fn add_hint(
        &mut self,
        path: &ItemPath,
        value_index: usize,
        result_offset: i64,
        result_group: ResultGroup,
        entry_index: usize,
    ) -> Result<(), LogError> {
        if result_offset >= 0 {
            return Err(LogError::InvalidHintOffset {
                item: path.to_string(),
                offset: result_offset,
            });
        }
        self.hints.insert(
            (path.clone(), value_index),
            Hint {
                result_offset,
                result_group,
                entry_index,
                target_item_name: path.leaf().to_owned(),
                target_value_index: value_index,
            },
        );
        Ok(())
    }

    /// The hint at an exact position.
    pub fn lookup(&self, path: &ItemPath, value_index: usize) -> Option<&Hint> {
        self.hints.get(&(path.clone(), value_index))
    }

    /// All hints on the item at `path` (not its descendants), by value index.
    pub fn hints_for<'a>(&'a self, path: &'a ItemPath) -> impl Iterator<Item = (usize, &'a Hint)> {
        self.hints
            .iter()
            .filter(move |((p, _), _)| p == path)
            .map(|((_, index), hint)| (*index, hint))
    }

    /// Every hint in `(path, value index)` order.
    pub fn iter(&self) -> impl Iterator<Item = (&ItemPath, usize, &Hint)> {
        self.hints.iter().map(|((path, index), hint)| (path, *index, hint))
    }

    /// Highest hinted value index on the item at `path`.
    pub fn max_hinted_index(&self, path: &ItemPath) -> Option<usize> {
        self.hints_for(path).map(|(index, _)| index).max()
    }

    /// Whether the item at `path` or any of its descendants carries a hint.
    pub fn has_hints_under(&self, path: &ItemPath) -> bool {
        self.hints.keys().any(|(p, _)| p.starts_with(path))
    }

    /// Remove every hint on the item at `path`.
    pub fn reset_hint(&mut self, path: &ItemPath) {
        self.hints.retain(|(p, _), _| p != path);
    }

    /// Remove all hints.
    pub fn reset_hints(&mut self) {
        self.hints.clear();
    }

    pub fn len(&self) -> usize {
        self.hints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hints.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
