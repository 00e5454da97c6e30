//! Renderer-agnostic statement AST.
//!
//! The log never produces host-syntax text. Everything it emits is a
//! [`Statement`] over [`Expr`]essions, and a renderer (see the
//! `retrace-script` crate) maps that to a concrete scripting language.
//!
//! Method names used by the generated statements live in [`method`] so that
//! renderers and tests refer to one spelling.

use retrace_model::item::Value;
use serde::{Deserialize, Serialize};

use crate::record::ResultGroup;

/// Method and function names that appear in generated statements.
pub mod method {
    /// `create_manager()`: the model manager every session hangs off.
    pub const CREATE_MANAGER: &str = "create_manager";
    /// `<manager>.create_session('<type>')`.
    pub const CREATE_SESSION: &str = "create_session";
    /// `<session>.set_name('<label>')`.
    pub const SET_NAME: &str = "set_name";
    /// `<session>.op('<operation>')`: instantiate an operator.
    pub const CREATE_OPERATOR: &str = "op";
    /// `<operator>.find('<item>')`: top-level parameter lookup.
    pub const FIND: &str = "find";
    /// `<operator>.associations()`: the association item.
    pub const ASSOCIATIONS: &str = "associations";
    /// `<item>.find_child('<name>')`: composite child lookup.
    pub const FIND_CHILD: &str = "find_child";
    /// `<item>.set_enabled(bool)`.
    pub const SET_ENABLED: &str = "set_enabled";
    /// `<item>.set_discrete_index(n)`.
    pub const SET_DISCRETE_INDEX: &str = "set_discrete_index";
    /// `<item>.set_value(i, v)`: assign value position `i`.
    pub const SET_VALUE: &str = "set_value";
    /// `<item>.set_number_of_values(n)`.
    pub const SET_NUMBER_OF_VALUES: &str = "set_number_of_values";
    /// `<operator>.operate()`: run it and return its result.
    pub const OPERATE: &str = "operate";
}

// ---------------------------------------------------------------------------
// Expr
// ---------------------------------------------------------------------------

/// An expression appearing on the right-hand side of a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// A literal item value.
    Literal(Value),
    /// A string literal that is not an item value (type and item names).
    Str(String),
    /// A boolean literal.
    Bool(bool),
    /// A script variable.
    Var(String),
    /// A list of expressions.
    List(Vec<Expr>),
    /// A function call, or a method call when `receiver` is set.
    Call {
        receiver: Option<Box<Expr>>,
        function: String,
        args: Vec<Expr>,
    },
    /// Entry `entry` of result group `group` in the result held by
    /// `result_var`. Emitted in place of a literal when a hint applies.
    Lookup {
        result_var: String,
        group: ResultGroup,
        entry: usize,
    },
}

impl Expr {
    pub fn var(name: &str) -> Self {
        Expr::Var(name.to_owned())
    }

    pub fn str(text: &str) -> Self {
        Expr::Str(text.to_owned())
    }

    /// `receiver.function(args)` where `receiver` is a variable.
    pub fn method(receiver: &str, function: &str, args: Vec<Expr>) -> Self {
        Expr::Call {
            receiver: Some(Box::new(Expr::var(receiver))),
            function: function.to_owned(),
            args,
        }
    }

    /// `function(args)`.
    pub fn function(function: &str, args: Vec<Expr>) -> Self {
        Expr::Call {
            receiver: None,
            function: function.to_owned(),
            args,
        }
    }
}

// ---------------------------------------------------------------------------
// Statement
// ---------------------------------------------------------------------------

/// One line of the generated script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// `var = value`
    Assign { var: String, value: Expr },
    /// `receiver.function(args)`, or `function(args)` without a receiver.
    Call {
        receiver: Option<String>,
        function: String,
        args: Vec<Expr>,
    },
    /// Set value position `index` of the item bound to `target`.
    SetValue {
        target: String,
        index: usize,
        value: Expr,
    },
    /// A comment line.
    Comment(String),
}

impl Statement {
    pub fn assign(var: &str, value: Expr) -> Self {
        Statement::Assign {
            var: var.to_owned(),
            value,
        }
    }

    /// `receiver.function(args)`.
    pub fn call(receiver: &str, function: &str, args: Vec<Expr>) -> Self {
        Statement::Call {
            receiver: Some(receiver.to_owned()),
            function: function.to_owned(),
            args,
        }
    }

    pub fn set_value(target: &str, index: usize, value: Expr) -> Self {
        Statement::SetValue {
            target: target.to_owned(),
            index,
            value,
        }
    }

    pub fn comment(text: &str) -> Self {
        Statement::Comment(text.to_owned())
    }

    /// The variable this statement binds, if it is an assignment.
    pub fn assigned_var(&self) -> Option<&str> {
        match self {
            Statement::Assign { var, .. } => Some(var),
            _ => None,
        }
    }
}
