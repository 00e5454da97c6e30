//! Stable addresses for items inside a parameter tree.
//!
//! An [`ItemPath`] is the chain of item names from the parameter root down to
//! a (possibly nested) item. Paths are how hints find the exact leaf they
//! target while the differ walks the tree recursively.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ModelError;

/// Default separator used by [`ItemPath::parse`] and [`fmt::Display`].
pub const DEFAULT_SEPARATOR: char = '/';

/// A non-empty chain of item names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemPath(Vec<String>);

impl ItemPath {
    /// Path of a top-level item.
    pub fn root(name: &str) -> Self {
        Self(vec![name.to_owned()])
    }

    /// Build a path from its segments.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyItemPath`] if there are no segments or any
    /// segment is empty.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() || segments.iter().any(|s| s.is_empty()) {
            return Err(ModelError::EmptyItemPath);
        }
        Ok(Self(segments))
    }

    /// Split `text` on any character in `separators`.
    ///
    /// Empty segments (leading, trailing or doubled separators) are dropped,
    /// so `"/radius"` and `"radius"` name the same item.
    pub fn parse_with(text: &str, separators: &str) -> Result<Self, ModelError> {
        Self::from_segments(
            text.split(|c: char| separators.contains(c))
                .filter(|s| !s.is_empty()),
        )
    }

    /// Split `text` on [`DEFAULT_SEPARATOR`].
    pub fn parse(text: &str) -> Result<Self, ModelError> {
        Self::parse_with(text, "/")
    }

    /// Path of a named child of this item.
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.to_owned());
        Self(segments)
    }

    /// The item names from the root down.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Name of the addressed item (the last segment).
    pub fn leaf(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    /// Whether `self` equals `other` or is one of its descendants.
    pub fn starts_with(&self, other: &ItemPath) -> bool {
        self.0.starts_with(&other.0)
    }
}

impl fmt::Display for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{DEFAULT_SEPARATOR}")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
