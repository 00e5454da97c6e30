//! Attribute differ: the minimal statements that reproduce a parameter tree.
//!
//! Given an item and the variable it is bound to, the [`AttributeDiffer`]
//! emits only what a fresh operator needs to end up in the same state:
//!
//! 1. Items that hold their defaults and carry no hint emit nothing.
//! 2. Optional items emit `set_enabled(..)` before any value statement.
//! 3. Discrete items emit `set_discrete_index(n)`.
//! 4. Scalar and association items emit one `SetValue` per value position,
//!    using a hint lookup where one is attached and the literal otherwise.
//! 5. Composite items bind each non-default child to `item<depth+1>` and
//!    append the child's statements after their own.
//! 6. At the operation level the association item always comes first.
//!
//! Every hint must land on a value position. A hint whose path names no item
//! in the parameters, or whose index the item cannot hold, fails the diff
//! with [`LogError::UnresolvedHint`].
//!
//! The differ is a pure function of the tree, the hint registry and the
//! history it resolves hints against.

use std::collections::BTreeSet;

use retrace_model::item::{AttributeItem, ItemKind, Parameters, Value};
use retrace_model::path::ItemPath;

use crate::config::LogConfig;
use crate::hint::HintRegistry;
use crate::record::Record;
use crate::statement::{method, Expr, Statement};
use crate::LogError;

/// Computes parameter diffs against a hint registry and a history snapshot.
pub struct AttributeDiffer<'a> {
    hints: &'a HintRegistry,
    history: &'a [Record],
    item_prefix: &'a str,
}

impl<'a> AttributeDiffer<'a> {
    pub fn new(hints: &'a HintRegistry, history: &'a [Record], config: &'a LogConfig) -> Self {
        Self {
            hints,
            history,
            item_prefix: &config.item_prefix,
        }
    }

    /// Statements reproducing a top-level `item` that is bound to `var`.
    ///
    /// # Errors
    ///
    /// [`LogError::UnresolvedHint`] if a hint on the item (or one of its
    /// descendants) cannot be resolved against the current history or does
    /// not land on a value position.
    pub fn diff(&self, item: &AttributeItem, var: &str) -> Result<Vec<Statement>, LogError> {
        let root = ItemPath::root(&item.name);
        let mut used = BTreeSet::new();
        let statements = self.diff_at(item, var, &root, 0, &mut used)?;
        self.ensure_all_used(&used, |path| path.starts_with(&root))?;
        Ok(statements)
    }

    /// Statements configuring every non-default item of an operation bound
    /// to `operator_var`.
    ///
    /// Each item with a non-empty diff is first bound to `item0`, through
    /// `associations()` for the association item and `find('<name>')` for
    /// the rest.
    ///
    /// # Errors
    ///
    /// [`LogError::UnresolvedHint`] if any attached hint cannot be resolved
    /// or does not land on a value position of these parameters.
    pub fn diff_parameters(
        &self,
        parameters: &Parameters,
        operator_var: &str,
    ) -> Result<Vec<Statement>, LogError> {
        let var = self.item_var(0);
        let ordered = parameters
            .items
            .iter()
            .filter(|item| item.is_association())
            .chain(parameters.items.iter().filter(|item| !item.is_association()));

        let mut used = BTreeSet::new();
        let mut statements = Vec::new();
        for item in ordered {
            let body = self.diff_at(item, &var, &ItemPath::root(&item.name), 0, &mut used)?;
            if body.is_empty() {
                continue;
            }
            let binding = if item.is_association() {
                Expr::method(operator_var, method::ASSOCIATIONS, Vec::new())
            } else {
                Expr::method(operator_var, method::FIND, vec![Expr::str(&item.name)])
            };
            statements.push(Statement::assign(&var, binding));
            statements.extend(body);
        }
        self.ensure_all_used(&used, |_| true)?;
        Ok(statements)
    }

    /// Fail on the first hint within `scope` that no value position consumed.
    fn ensure_all_used(
        &self,
        used: &BTreeSet<(ItemPath, usize)>,
        scope: impl Fn(&ItemPath) -> bool,
    ) -> Result<(), LogError> {
        let stray = self
            .hints
            .iter()
            .find(|(path, index, _)| scope(path) && !used.contains(&((*path).clone(), *index)));
        match stray {
            Some((path, index, _)) => Err(LogError::UnresolvedHint {
                item: path.to_string(),
                value_index: index,
                reason: "no value position of the parameters matches this hint".to_owned(),
            }),
            None => Ok(()),
        }
    }

    fn diff_at(
        &self,
        item: &AttributeItem,
        var: &str,
        path: &ItemPath,
        depth: usize,
        used: &mut BTreeSet<(ItemPath, usize)>,
    ) -> Result<Vec<Statement>, LogError> {
        let mut statements = Vec::new();
        if item.uses_defaults() && !self.hints.has_hints_under(path) {
            return Ok(statements);
        }

        if let Some(state) = item.optional {
            statements.push(Statement::call(
                var,
                method::SET_ENABLED,
                vec![Expr::Bool(state.enabled)],
            ));
        }

        match &item.kind {
            ItemKind::Scalar { values, defaults } => {
                let positions = self.position_count(path, values.len());
                if positions != defaults.len() {
                    statements.push(Statement::call(
                        var,
                        method::SET_NUMBER_OF_VALUES,
                        vec![Expr::Literal(Value::Int(positions as i64))],
                    ));
                }
                self.push_values(&mut statements, var, path, positions, used, |i| {
                    values.get(i).cloned()
                })?;
            }
            ItemKind::Association { entities } => {
                let positions = self.position_count(path, entities.len());
                self.push_values(&mut statements, var, path, positions, used, |i| {
                    entities.get(i).copied().map(Value::Entity)
                })?;
            }
            ItemKind::Discrete { index, .. } => match self.hints.lookup(path, 0) {
                Some(hint) => {
                    statements.push(Statement::set_value(var, 0, hint.resolve(self.history)?));
                    used.insert((path.clone(), 0));
                }
                None => statements.push(Statement::call(
                    var,
                    method::SET_DISCRETE_INDEX,
                    vec![Expr::Literal(Value::Int(*index as i64))],
                )),
            },
            ItemKind::Composite { children } => {
                let child_var = self.item_var(depth + 1);
                for child in children {
                    let child_path = path.child(&child.name);
                    let body = self.diff_at(child, &child_var, &child_path, depth + 1, used)?;
                    if body.is_empty() {
                        continue;
                    }
                    statements.push(Statement::assign(
                        &child_var,
                        Expr::method(var, method::FIND_CHILD, vec![Expr::str(&child.name)]),
                    ));
                    statements.extend(body);
                }
            }
        }

        Ok(statements)
    }

    /// Value positions to emit: every current value, extended to cover the
    /// highest hinted index.
    fn position_count(&self, path: &ItemPath, current: usize) -> usize {
        match self.hints.max_hinted_index(path) {
            Some(max) => current.max(max + 1),
            None => current,
        }
    }

    fn push_values(
        &self,
        statements: &mut Vec<Statement>,
        var: &str,
        path: &ItemPath,
        positions: usize,
        used: &mut BTreeSet<(ItemPath, usize)>,
        literal: impl Fn(usize) -> Option<Value>,
    ) -> Result<(), LogError> {
        for i in 0..positions {
            let value = match self.hints.lookup(path, i) {
                Some(hint) => {
                    used.insert((path.clone(), i));
                    hint.resolve(self.history)?
                }
                None => match literal(i) {
                    Some(value) => Expr::Literal(value),
                    // A gap below a hinted index past the current values.
                    None => continue,
                },
            };
            statements.push(Statement::set_value(var, i, value));
        }
        Ok(())
    }

    fn item_var(&self, depth: usize) -> String {
        format!("{}{depth}", self.item_prefix)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
