//! Attribute items: the parameter trees that operations are configured with.
//!
//! An operation's [`Parameters`] hold a list of [`AttributeItem`]s. Each item
//! is one of a closed set of kinds ([`ItemKind`]) so that consumers match
//! exhaustively instead of probing for capabilities at runtime:
//!
//! - [`ItemKind::Scalar`]: zero or more values with declared defaults.
//! - [`ItemKind::Discrete`]: a choice among enumerated labels, by index.
//! - [`ItemKind::Composite`]: a group owning named children.
//! - [`ItemKind::Association`]: the entities the operation applies to.
//!
//! Any kind may additionally be *optional*, i.e. carry an enabled flag
//! ([`Enablement`]).
//!
//! # Example
//!
//! ```
//! use retrace_model::item::{AttributeItem, Parameters, Value};
//!
//! let params = Parameters::new(vec![
//!     AttributeItem::scalar("radius", vec![Value::Double(0.5)])
//!         .with_values(vec![Value::Double(1.0)]),
//!     AttributeItem::scalar("inner radius", vec![Value::Double(0.0)]),
//! ]);
//!
//! assert!(!params.find("radius").unwrap().uses_defaults());
//! assert!(params.find("inner radius").unwrap().uses_defaults());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entity::EntityRef;
use crate::path::ItemPath;
use crate::ModelError;

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A single value held at one position of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Double(#[serde(with = "float_repr")] f64),
    String(String),
    Entity(EntityRef),
}

/// JSON has no NaN or infinities: finite doubles serialize as numbers, the
/// rest as `"NaN"`, `"inf"` or `"-inf"`.
mod float_repr {
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Named(String),
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if *value == f64::INFINITY {
            serializer.serialize_str("inf")
        } else if *value == f64::NEG_INFINITY {
            serializer.serialize_str("-inf")
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(v),
            Repr::Named(name) => match name.as_str() {
                "NaN" => Ok(f64::NAN),
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(de::Error::custom(format!("'{other}' is not a double"))),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v:?}"),
            Value::String(v) => write!(f, "{v:?}"),
            Value::Entity(e) => write!(f, "{e}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<EntityRef> for Value {
    fn from(v: EntityRef) -> Self {
        Value::Entity(v)
    }
}

// ---------------------------------------------------------------------------
// Enablement
// ---------------------------------------------------------------------------

/// Enabled state of an optional item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enablement {
    pub enabled: bool,
    pub default_enabled: bool,
}

// ---------------------------------------------------------------------------
// ItemKind
// ---------------------------------------------------------------------------

/// What an item holds. Capabilities are explicit per variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ItemKind {
    /// Plain values (numbers, strings, entity references).
    Scalar {
        values: Vec<Value>,
        defaults: Vec<Value>,
    },
    /// One label selected from an enumeration.
    Discrete {
        index: usize,
        /// `None` means the item has no declared default, so any selection
        /// is significant.
        default_index: Option<usize>,
        labels: Vec<String>,
    },
    /// A group of named children.
    Composite { children: Vec<AttributeItem> },
    /// The entities an operation applies to. The default is empty.
    Association { entities: Vec<EntityRef> },
}

// ---------------------------------------------------------------------------
// AttributeItem
// ---------------------------------------------------------------------------

/// A node in an operation's parameter tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeItem {
    pub name: String,
    /// `Some` when the item can be switched on and off.
    pub optional: Option<Enablement>,
    pub kind: ItemKind,
}

impl AttributeItem {
    /// A scalar item whose current values start out equal to `defaults`.
    pub fn scalar(name: &str, defaults: Vec<Value>) -> Self {
        Self {
            name: name.to_owned(),
            optional: None,
            kind: ItemKind::Scalar {
                values: defaults.clone(),
                defaults,
            },
        }
    }

    /// A discrete item. The active index starts at the default, or 0.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DiscreteIndexOutOfRange`] if `default_index` is
    /// not a valid label index.
    pub fn discrete(
        name: &str,
        labels: &[&str],
        default_index: Option<usize>,
    ) -> Result<Self, ModelError> {
        if let Some(index) = default_index {
            check_discrete_index(name, index, labels.len())?;
        }
        Ok(Self {
            name: name.to_owned(),
            optional: None,
            kind: ItemKind::Discrete {
                index: default_index.unwrap_or(0),
                default_index,
                labels: labels.iter().map(|l| (*l).to_owned()).collect(),
            },
        })
    }

    /// A composite item owning `children`.
    pub fn composite(name: &str, children: Vec<AttributeItem>) -> Self {
        Self {
            name: name.to_owned(),
            optional: None,
            kind: ItemKind::Composite { children },
        }
    }

    /// An association item currently referencing `entities`.
    pub fn association(name: &str, entities: Vec<EntityRef>) -> Self {
        Self {
            name: name.to_owned(),
            optional: None,
            kind: ItemKind::Association { entities },
        }
    }

    /// Make the item optional with the given default enabled state. The
    /// current state starts at the default.
    pub fn optional(mut self, default_enabled: bool) -> Self {
        self.optional = Some(Enablement {
            enabled: default_enabled,
            default_enabled,
        });
        self
    }

    /// Replace the current values of a scalar item. No effect on other kinds.
    pub fn with_values(mut self, new_values: Vec<Value>) -> Self {
        if let ItemKind::Scalar { values, .. } = &mut self.kind {
            *values = new_values;
        }
        self
    }

    /// Set the enabled flag of an optional item.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NotOptional`] if the item has no enabled flag.
    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), ModelError> {
        match &mut self.optional {
            Some(state) => {
                state.enabled = enabled;
                Ok(())
            }
            None => Err(ModelError::NotOptional {
                item: self.name.clone(),
            }),
        }
    }

    /// Select an enumeration entry of a discrete item.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::WrongKind`] for non-discrete items and
    /// [`ModelError::DiscreteIndexOutOfRange`] for a bad index.
    pub fn select(&mut self, new_index: usize) -> Result<(), ModelError> {
        match &mut self.kind {
            ItemKind::Discrete { index, labels, .. } => {
                check_discrete_index(&self.name, new_index, labels.len())?;
                *index = new_index;
                Ok(())
            }
            _ => Err(ModelError::WrongKind {
                item: self.name.clone(),
                expected: "discrete",
            }),
        }
    }

    /// Whether the item is enabled. Non-optional items are always enabled.
    pub fn is_enabled(&self) -> bool {
        self.optional.map_or(true, |state| state.enabled)
    }

    /// Number of value positions the item currently holds.
    ///
    /// Discrete items have a single position (the selection); composite
    /// items have none.
    pub fn value_count(&self) -> usize {
        match &self.kind {
            ItemKind::Scalar { values, .. } => values.len(),
            ItemKind::Discrete { .. } => 1,
            ItemKind::Composite { .. } => 0,
            ItemKind::Association { entities } => entities.len(),
        }
    }

    /// The current value at `index`, if any. Discrete items report their
    /// active index as an [`Value::Int`].
    pub fn value(&self, index: usize) -> Option<Value> {
        match &self.kind {
            ItemKind::Scalar { values, .. } => values.get(index).cloned(),
            ItemKind::Discrete { index: active, .. } => {
                (index == 0).then(|| Value::Int(*active as i64))
            }
            ItemKind::Composite { .. } => None,
            ItemKind::Association { entities } => entities.get(index).copied().map(Value::Entity),
        }
    }

    /// Whether the item (and, for composites, every descendant) holds its
    /// declared defaults.
    pub fn uses_defaults(&self) -> bool {
        if let Some(state) = self.optional {
            if state.enabled != state.default_enabled {
                return false;
            }
        }
        match &self.kind {
            ItemKind::Scalar { values, defaults } => values == defaults,
            ItemKind::Discrete {
                index,
                default_index,
                ..
            } => *default_index == Some(*index),
            ItemKind::Composite { children } => children.iter().all(AttributeItem::uses_defaults),
            ItemKind::Association { entities } => entities.is_empty(),
        }
    }

    /// Whether this is the association item.
    pub fn is_association(&self) -> bool {
        matches!(self.kind, ItemKind::Association { .. })
    }

    /// Direct child by name (composite items only).
    pub fn child(&self, name: &str) -> Option<&AttributeItem> {
        match &self.kind {
            ItemKind::Composite { children } => children.iter().find(|c| c.name == name),
            _ => None,
        }
    }

    /// Mutable direct child by name (composite items only).
    pub fn child_mut(&mut self, name: &str) -> Option<&mut AttributeItem> {
        match &mut self.kind {
            ItemKind::Composite { children } => children.iter_mut().find(|c| c.name == name),
            _ => None,
        }
    }
}

fn check_discrete_index(item: &str, index: usize, choices: usize) -> Result<(), ModelError> {
    if index >= choices {
        return Err(ModelError::DiscreteIndexOutOfRange {
            item: item.to_owned(),
            index,
            choices,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// The full parameter tree of one operation invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub items: Vec<AttributeItem>,
}

impl Parameters {
    pub fn new(items: Vec<AttributeItem>) -> Self {
        Self { items }
    }

    /// Top-level item by name.
    pub fn find(&self, name: &str) -> Option<&AttributeItem> {
        self.items.iter().find(|i| i.name == name)
    }

    /// Mutable top-level item by name.
    pub fn find_mut(&mut self, name: &str) -> Option<&mut AttributeItem> {
        self.items.iter_mut().find(|i| i.name == name)
    }

    /// The association item, if the operation has one.
    pub fn association(&self) -> Option<&AttributeItem> {
        self.items.iter().find(|i| i.is_association())
    }

    /// Resolve a (possibly nested) item by path.
    pub fn find_path(&self, path: &ItemPath) -> Option<&AttributeItem> {
        let (first, rest) = path.segments().split_first()?;
        let mut item = self.find(first)?;
        for segment in rest {
            item = item.child(segment)?;
        }
        Some(item)
    }

    /// Resolve a (possibly nested) item by path, mutably.
    pub fn find_path_mut(&mut self, path: &ItemPath) -> Option<&mut AttributeItem> {
        let (first, rest) = path.segments().split_first()?;
        let mut item = self.find_mut(first)?;
        for segment in rest {
            item = item.child_mut(segment)?;
        }
        Some(item)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
