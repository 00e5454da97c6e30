//! Log configuration.
//!
//! [`LogConfig`] controls the variable names the log generates and how
//! faults are marked. All fields have defaults, so a JSON document only needs
//! to name the fields it overrides:
//!
//! ```
//! use retrace_log::config::LogConfig;
//!
//! let config = LogConfig::from_json(r#"{ "operator_prefix": "oper" }"#).unwrap();
//! assert_eq!(config.operator_prefix, "oper");
//! assert_eq!(config.result_prefix, "res");
//! ```

use serde::{Deserialize, Serialize};

use crate::LogError;

/// Naming and marking options for an [`OperationLog`](crate::log::OperationLog).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Variable holding the model manager in the preamble.
    pub manager_var: String,
    /// Operators are bound to `<operator_prefix><n>`.
    pub operator_prefix: String,
    /// Operation results are bound to `<result_prefix><n>`.
    pub result_prefix: String,
    /// Temporary item variables are `<item_prefix><depth>`.
    pub item_prefix: String,
    /// Comment text of an error-marked record.
    pub error_marker: String,
    /// Whether renderers should precede each record with comments describing
    /// its outcome and entity lists.
    pub annotate_records: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            manager_var: "mgr".to_owned(),
            operator_prefix: "op".to_owned(),
            result_prefix: "res".to_owned(),
            item_prefix: "item".to_owned(),
            error_marker: "***ERROR***".to_owned(),
            annotate_records: true,
        }
    }
}

impl LogConfig {
    /// Parse a (partial) JSON configuration and validate it.
    pub fn from_json(text: &str) -> Result<Self, LogError> {
        let config: LogConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every generated name is a usable identifier and that the
    /// numbered prefixes cannot produce the same variable.
    pub fn validate(&self) -> Result<(), LogError> {
        let names = [
            ("manager_var", &self.manager_var),
            ("operator_prefix", &self.operator_prefix),
            ("result_prefix", &self.result_prefix),
            ("item_prefix", &self.item_prefix),
        ];
        for (field, value) in names {
            if !is_identifier(value) {
                return Err(LogError::InvalidConfig {
                    field,
                    reason: format!("'{value}' is not an identifier"),
                });
            }
        }
        let prefixes = [
            ("operator_prefix", &self.operator_prefix),
            ("result_prefix", &self.result_prefix),
            ("item_prefix", &self.item_prefix),
        ];
        for (i, (field, a)) in prefixes.iter().enumerate() {
            for (_, b) in &prefixes[i + 1..] {
                // `op` and `op1` would both claim `op12`.
                if a.starts_with(b.as_str()) || b.starts_with(a.as_str()) {
                    return Err(LogError::InvalidConfig {
                        field: *field,
                        reason: format!("prefixes '{a}' and '{b}' overlap"),
                    });
                }
            }
        }
        if let Some((_, prefix)) = prefixes
            .iter()
            .find(|(_, p)| numbered_after(&self.manager_var, p))
        {
            return Err(LogError::InvalidConfig {
                field: "manager_var",
                reason: format!("'{}' has the form of a '{prefix}' variable", self.manager_var),
            });
        }
        if self.error_marker.contains('\n') {
            return Err(LogError::InvalidConfig {
                field: "error_marker",
                reason: "must be a single line".to_owned(),
            });
        }
        Ok(())
    }

    /// Whether `name` could clash with a variable the log generates itself.
    pub(crate) fn is_reserved(&self, name: &str) -> bool {
        if name == self.manager_var {
            return true;
        }
        [&self.operator_prefix, &self.result_prefix, &self.item_prefix]
            .iter()
            .any(|prefix| numbered_after(name, prefix))
    }
}

/// Whether `name` is `prefix` followed by one or more digits.
fn numbered_after(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
