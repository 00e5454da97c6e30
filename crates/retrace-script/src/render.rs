//! Renderers: turning statements into script text.
//!
//! The log itself only produces abstract [`Statement`]s. A [`Renderer`] maps
//! them onto one concrete host syntax. [`PythonRenderer`] is the bundled
//! one:
//!
//! ```text
//! from uuid import UUID
//!
//! mgr = create_manager()
//! cgmSession = mgr.create_session('cgm')
//! cgmSession.set_name('CGM Session')
//! # record 0: create sphere (succeeded)
//! # created: 6f1c0d0a-...
//! op1 = cgmSession.op('create sphere')
//! item0 = op1.find('radius')
//! item0.set_value(0, 1.0)
//! res1 = op1.operate()
//! ```

use std::fmt::Write as _;

use retrace_log::config::LogConfig;
use retrace_log::record::{Record, ResultGroup};
use retrace_log::snapshot::LogSnapshot;
use retrace_log::statement::{method, Expr, Statement};
use retrace_model::item::Value;

// ---------------------------------------------------------------------------
// Renderer trait
// ---------------------------------------------------------------------------

/// Maps abstract statements onto a host script syntax.
///
/// Every method returns complete lines, each terminated by `\n`.
pub trait Renderer {
    /// Text that opens a script (imports and the like).
    fn prologue(&self) -> String;

    /// One statement.
    fn render_statement(&self, statement: &Statement) -> String;

    /// A run of statements, one after another.
    fn render_statements(&self, statements: &[Statement]) -> String {
        statements
            .iter()
            .map(|statement| self.render_statement(statement))
            .collect()
    }

    /// One record: its statements, followed by a blank separator line.
    fn render_record(&self, record: &Record) -> String {
        let mut text = self.render_statements(&record.statements);
        text.push('\n');
        text
    }

    /// Text that closes a script.
    fn postscript(&self) -> String {
        String::new()
    }
}

/// Render a whole snapshot: prologue, preamble, records, postscript.
///
/// The text is what a [`ScriptSink`](crate::sink::ScriptSink) attached to
/// the finished log would have written.
pub fn render_script<R: Renderer + ?Sized>(renderer: &R, snapshot: &LogSnapshot) -> String {
    let mut script = renderer.prologue();
    script.push_str(&renderer.render_statements(&snapshot.preamble));
    for record in &snapshot.records {
        script.push_str(&renderer.render_record(record));
    }
    script.push_str(&renderer.postscript());
    script
}

// ---------------------------------------------------------------------------
// PythonRenderer
// ---------------------------------------------------------------------------

/// Renders Python-flavoured replay scripts.
#[derive(Debug, Clone)]
pub struct PythonRenderer {
    /// Precede each record with comments on its outcome and entities.
    pub annotate: bool,
    /// Import lines written by the prologue.
    pub imports: Vec<String>,
    /// Lines written by the postscript.
    pub closing: Vec<String>,
}

impl Default for PythonRenderer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl PythonRenderer {
    pub fn new(annotate: bool) -> Self {
        Self {
            annotate,
            imports: vec!["from uuid import UUID".to_owned()],
            closing: Vec::new(),
        }
    }

    /// A renderer that annotates records when the log configuration asks for
    /// it.
    pub fn from_config(config: &LogConfig) -> Self {
        Self::new(config.annotate_records)
    }

    /// Add an import line to the prologue.
    pub fn with_import(mut self, line: &str) -> Self {
        self.imports.push(line.to_owned());
        self
    }

    /// Add a line to the postscript.
    pub fn with_closing(mut self, line: &str) -> Self {
        self.closing.push(line.to_owned());
        self
    }

    /// Render one expression.
    pub fn render_expr(&self, expr: &Expr) -> String {
        match expr {
            Expr::Literal(value) => render_value(value),
            Expr::Str(text) => quote(text),
            Expr::Bool(true) => "True".to_owned(),
            Expr::Bool(false) => "False".to_owned(),
            Expr::Var(name) => name.clone(),
            Expr::List(items) => format!("[{}]", self.render_args(items)),
            Expr::Call {
                receiver,
                function,
                args,
            } => match receiver {
                Some(receiver) => format!(
                    "{}.{function}({})",
                    self.render_expr(receiver),
                    self.render_args(args)
                ),
                None => format!("{function}({})", self.render_args(args)),
            },
            Expr::Lookup {
                result_var,
                group,
                entry,
            } => format!("{result_var}.find({}).value({entry})", quote(group.as_str())),
        }
    }

    fn render_args(&self, args: &[Expr]) -> String {
        args.iter()
            .map(|arg| self.render_expr(arg))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn annotation(&self, record: &Record) -> String {
        let mut text = comment_block(&format!(
            "record {}: {} ({})",
            record.index, record.name, record.outcome
        ));
        if let Some(fault) = &record.fault {
            text.push_str(&comment_block(&format!("fault: {fault}")));
        }
        for group in [ResultGroup::Created, ResultGroup::Expunged, ResultGroup::Modified] {
            let entities = record.entities(group);
            if entities.is_empty() {
                continue;
            }
            let listed = entities
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            text.push_str(&comment_block(&format!("{group}: {listed}")));
        }
        text
    }
}

impl Renderer for PythonRenderer {
    fn prologue(&self) -> String {
        let mut text: String = self.imports.iter().map(|line| format!("{line}\n")).collect();
        if !text.is_empty() {
            text.push('\n');
        }
        text
    }

    fn render_statement(&self, statement: &Statement) -> String {
        match statement {
            Statement::Assign { var, value } => format!("{var} = {}\n", self.render_expr(value)),
            Statement::Call {
                receiver: Some(receiver),
                function,
                args,
            } => format!("{receiver}.{function}({})\n", self.render_args(args)),
            Statement::Call {
                receiver: None,
                function,
                args,
            } => format!("{function}({})\n", self.render_args(args)),
            Statement::SetValue {
                target,
                index,
                value,
            } => format!(
                "{target}.{}({index}, {})\n",
                method::SET_VALUE,
                self.render_expr(value)
            ),
            Statement::Comment(text) => comment_block(text),
        }
    }

    fn render_record(&self, record: &Record) -> String {
        let mut text = if self.annotate {
            self.annotation(record)
        } else {
            String::new()
        };
        text.push_str(&self.render_statements(&record.statements));
        text.push('\n');
        text
    }

    fn postscript(&self) -> String {
        self.closing.iter().map(|line| format!("{line}\n")).collect()
    }
}

// ---------------------------------------------------------------------------
// Literals
// ---------------------------------------------------------------------------

fn render_value(value: &Value) -> String {
    match value {
        Value::Int(v) => v.to_string(),
        Value::Double(v) if v.is_nan() => "float('nan')".to_owned(),
        Value::Double(v) if v.is_infinite() => {
            if *v > 0.0 {
                "float('inf')".to_owned()
            } else {
                "-float('inf')".to_owned()
            }
        }
        // `{:?}` keeps the fractional part ("1.0", not "1").
        Value::Double(v) => format!("{v:?}"),
        Value::String(text) => quote(text),
        Value::Entity(entity) => format!("UUID('{entity}')"),
    }
}

/// Single-quoted Python string literal.
/// `text` as `#` comment lines. Python also ends a line at a bare `\r`, so
/// that splits too.
fn comment_block(text: &str) -> String {
    text.lines()
        .flat_map(|line| line.split('\r'))
        .map(|line| format!("# {line}\n"))
        .collect()
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
