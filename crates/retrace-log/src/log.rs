//! The operation log: invoke/result tracking and the assembled history.
//!
//! [`OperationLog`] owns all log state: the session registry, the hint
//! registry, the single pending-invocation slot and the history of finished
//! records. Hosts drive it with two events:
//!
//! - [`on_invoke`](OperationLog::on_invoke) when an operation starts. The log
//!   builds the statements that instantiate and configure an equivalent
//!   operator and holds them as the pending invocation.
//! - [`on_result`](OperationLog::on_result) when it finishes. The pending
//!   invocation becomes a [`Record`] in history.
//!
//! # Discipline
//!
//! At most one invocation may be pending. A second `on_invoke` before the
//! result arrives is a [`LogError::ReentrantInvocation`]. A result that does
//! not match the pending invocation (or arrives with nothing pending) is not
//! an error for the caller: it is recorded as an error-marked record and
//! logging continues.
//!
//! # Example
//!
//! ```
//! use retrace_log::prelude::*;
//! use retrace_model::prelude::*;
//!
//! let mut log = OperationLog::new();
//! let session = Session::new(1, "cgm", "CGM Session");
//!
//! let params = Parameters::new(vec![
//!     AttributeItem::scalar("radius", vec![Value::Double(0.5)])
//!         .with_values(vec![Value::Double(1.0)]),
//! ]);
//! log.on_invoke(&session, "create sphere", &params).unwrap();
//!
//! let sphere = EntityRef::random();
//! log.on_result(
//!     "create sphere",
//!     OperationResult::new(Outcome::Succeeded).with_created(vec![sphere]),
//! )
//! .unwrap();
//!
//! assert_eq!(log.number_of_records(), 1);
//! assert_eq!(log.records()[0].created, vec![sphere]);
//! ```

use retrace_model::path::ItemPath;
use retrace_model::item::Parameters;
use retrace_model::session::Session;
use tracing::{debug, warn};

use crate::config::LogConfig;
use crate::diff::AttributeDiffer;
use crate::hint::HintRegistry;
use crate::record::{OperationResult, Outcome, PendingInvocation, Record, RecordFault, ResultGroup};
use crate::session::SessionRegistry;
use crate::sink::{LogSink, SinkFanout};
use crate::snapshot::LogSnapshot;
use crate::statement::{method, Expr, Statement};
use crate::LogError;

/// Log of operations that can be replayed as a script.
pub struct OperationLog {
    config: LogConfig,
    sessions: SessionRegistry,
    hints: HintRegistry,
    pending: Option<PendingInvocation>,
    history: Vec<Record>,
    sinks: SinkFanout,
    /// Number of operators instantiated so far; the next is `op<n+1>`.
    operator_count: usize,
    has_failures: bool,
    stopped: bool,
}

impl Default for OperationLog {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationLog {
    /// Start a log with the default configuration.
    pub fn new() -> Self {
        Self::build(LogConfig::default())
    }

    /// Start a log with a custom configuration.
    ///
    /// # Errors
    ///
    /// [`LogError::InvalidConfig`] if the configuration fails validation.
    pub fn with_config(config: LogConfig) -> Result<Self, LogError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: LogConfig) -> Self {
        debug!("operation log started");
        Self {
            sessions: SessionRegistry::new(&config),
            config,
            hints: HintRegistry::new(),
            pending: None,
            history: Vec::new(),
            sinks: SinkFanout::default(),
            operator_count: 0,
            has_failures: false,
            stopped: false,
        }
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    fn ensure_running(&self, operation: &'static str) -> Result<(), LogError> {
        if self.stopped {
            return Err(LogError::StoppedLogMutation { operation });
        }
        Ok(())
    }

    // -- sessions -----------------------------------------------------------

    /// Register a session up front so its preamble entry precedes any
    /// operation. Sessions are also registered implicitly by `on_invoke`.
    pub fn register_session(&mut self, session: &Session) -> Result<String, LogError> {
        self.ensure_running("register_session")?;
        self.sessions.register(session, &self.config)
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    // -- hints --------------------------------------------------------------

    /// Attach a hint for the next invocation: value `value_index` of the item
    /// at `path` becomes entry `entry_index` of `group` in the result
    /// `result_offset` records back.
    ///
    /// Hints apply to the next successful `on_invoke` only.
    pub fn add_hint(
        &mut self,
        path: &ItemPath,
        value_index: usize,
        result_offset: i64,
        group: ResultGroup,
        entry_index: usize,
    ) -> Result<(), LogError> {
        self.ensure_running("add_hint")?;
        self.hints
            .add_hint(path, value_index, result_offset, group, entry_index)
    }

    /// Drop the hints on one item.
    pub fn reset_hint(&mut self, path: &ItemPath) {
        self.hints.reset_hint(path);
    }

    /// Drop all hints.
    pub fn reset_hints(&mut self) {
        self.hints.reset_hints();
    }

    pub fn hints(&self) -> &HintRegistry {
        &self.hints
    }

    // -- invocation tracking ------------------------------------------------

    /// Record the start of an operation.
    ///
    /// Builds `op<n> = <session>.op('<name>')`, the parameter diff, and
    /// `res<n> = op<n>.operate()`, and holds them as the pending invocation.
    /// Consumes the attached hints.
    ///
    /// # Errors
    ///
    /// - [`LogError::StoppedLogMutation`] after [`stop`](Self::stop).
    /// - [`LogError::ReentrantInvocation`] if an invocation is pending.
    /// - [`LogError::NameCollision`] if the session cannot be registered.
    /// - [`LogError::UnresolvedHint`] if an attached hint cannot be resolved
    ///   or names no value position of `parameters`.
    ///
    /// On error the pending slot, operator numbering, hints, sessions and
    /// preamble are untouched.
    pub fn on_invoke(
        &mut self,
        session: &Session,
        operation_name: &str,
        parameters: &Parameters,
    ) -> Result<(), LogError> {
        self.ensure_running("on_invoke")?;
        if let Some(pending) = &self.pending {
            return Err(LogError::ReentrantInvocation {
                pending: pending.operation_name.clone(),
                requested: operation_name.to_owned(),
            });
        }

        let number = self.operator_count + 1;
        let operator_var = format!("{}{number}", self.config.operator_prefix);
        let result_var = format!("{}{number}", self.config.result_prefix);

        // The diff is pure; registering the session is the first mutation.
        let differ = AttributeDiffer::new(&self.hints, &self.history, &self.config);
        let configure = differ.diff_parameters(parameters, &operator_var)?;
        let session_var = self.sessions.register(session, &self.config)?;

        let mut statements = Vec::with_capacity(configure.len() + 2);
        statements.push(Statement::assign(
            &operator_var,
            Expr::method(
                &session_var,
                method::CREATE_OPERATOR,
                vec![Expr::str(operation_name)],
            ),
        ));
        statements.extend(configure);
        statements.push(Statement::assign(
            &result_var,
            Expr::method(&operator_var, method::OPERATE, Vec::new()),
        ));

        debug!(
            operation = operation_name,
            operator = %operator_var,
            statements = statements.len(),
            hints = self.hints.len(),
            "recorded invocation"
        );

        self.operator_count = number;
        self.hints.reset_hints();
        self.pending = Some(PendingInvocation {
            operation_name: operation_name.to_owned(),
            session_var,
            operator_var,
            result_var,
            statements,
        });
        Ok(())
    }

    // -- result finalization ------------------------------------------------

    /// Record the completion of an operation.
    ///
    /// A result matching the pending invocation becomes an ordinary record.
    /// Anything else becomes an error-marked record and clears the pending
    /// slot; that is reported through the record, not through the return
    /// value.
    ///
    /// # Errors
    ///
    /// [`LogError::StoppedLogMutation`] after [`stop`](Self::stop).
    pub fn on_result(
        &mut self,
        operation_name: &str,
        result: OperationResult,
    ) -> Result<(), LogError> {
        self.ensure_running("on_result")?;
        let index = self.history.len();
        let OperationResult {
            outcome,
            created,
            expunged,
            modified,
        } = result;

        let record = match self.pending.take() {
            Some(pending) if pending.operation_name == operation_name => Record {
                index,
                name: pending.operation_name,
                session_var: Some(pending.session_var),
                result_var: Some(pending.result_var),
                statements: pending.statements,
                outcome,
                created,
                expunged,
                modified,
                fault: None,
            },
            other => {
                let (name, session_var, fault) = match other {
                    Some(pending) => {
                        let fault = RecordFault::InvocationResultMismatch {
                            expected: pending.operation_name.clone(),
                            reported: operation_name.to_owned(),
                        };
                        (pending.operation_name, Some(pending.session_var), fault)
                    }
                    None => (
                        operation_name.to_owned(),
                        None,
                        RecordFault::NoPendingInvocation {
                            reported: operation_name.to_owned(),
                        },
                    ),
                };
                warn!(record = index, fault = %fault, "recorded error-marked record");
                Record {
                    index,
                    name,
                    session_var,
                    result_var: None,
                    statements: vec![Statement::comment(&self.config.error_marker)],
                    outcome,
                    created,
                    expunged,
                    modified,
                    fault: Some(fault),
                }
            }
        };

        if outcome == Outcome::Failed {
            self.has_failures = true;
        }
        debug!(
            record = index,
            operation = %record.name,
            outcome = %outcome,
            created = record.created.len(),
            expunged = record.expunged.len(),
            modified = record.modified.len(),
            "recorded result"
        );
        self.history.push(record);
        self.sinks
            .sync(self.sessions.preamble(), &self.history);
        Ok(())
    }

    /// The invocation awaiting its result, if any.
    pub fn pending(&self) -> Option<&PendingInvocation> {
        self.pending.as_ref()
    }

    /// Whether any operation has reported [`Outcome::Failed`] since the last
    /// [`reset_failures`](Self::reset_failures).
    pub fn has_failures(&self) -> bool {
        self.has_failures
    }

    /// Mark earlier failures as handled.
    pub fn reset_failures(&mut self) {
        self.has_failures = false;
    }

    // -- assembly -----------------------------------------------------------

    /// Statements that prepare a fresh model: manager and sessions.
    pub fn preamble(&self) -> &[Statement] {
        self.sessions.preamble()
    }

    /// Finished records in completion order.
    pub fn records(&self) -> &[Record] {
        &self.history
    }

    pub fn number_of_records(&self) -> usize {
        self.history.len()
    }

    /// The preamble followed by every record's statements.
    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.preamble()
            .iter()
            .chain(self.history.iter().flat_map(|r| r.statements.iter()))
    }

    /// Copy of the preamble and history.
    pub fn snapshot(&self) -> LogSnapshot {
        LogSnapshot {
            preamble: self.preamble().to_vec(),
            records: self.history.clone(),
        }
    }

    /// BLAKE3 fingerprint of the current preamble and history.
    pub fn fingerprint(&self) -> String {
        self.snapshot().fingerprint()
    }

    // -- sinks --------------------------------------------------------------

    /// Attach a sink. It is initialized and handed everything logged so far,
    /// then receives new material after every record.
    pub fn add_sink(&mut self, sink: Box<dyn LogSink>) -> Result<(), LogError> {
        self.ensure_running("add_sink")?;
        self.sinks
            .attach(sink, self.sessions.preamble(), &self.history);
        Ok(())
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Number of sink calls that have failed so far.
    pub fn sink_failures(&self) -> usize {
        self.sinks.failures()
    }

    // -- lifecycle ----------------------------------------------------------

    /// Stop logging.
    ///
    /// Sinks receive anything outstanding and are finalized. An invocation
    /// still pending is discarded and returned. Every mutating call after
    /// this fails with [`LogError::StoppedLogMutation`]; stopping twice does
    /// nothing.
    pub fn stop(&mut self) -> Option<PendingInvocation> {
        if self.stopped {
            return None;
        }
        self.stopped = true;
        let discarded = self.pending.take();
        if let Some(pending) = &discarded {
            warn!(
                operation = %pending.operation_name,
                "discarding pending invocation at stop"
            );
        }
        self.sinks
            .finalize(self.sessions.preamble(), &self.history);
        debug!(records = self.history.len(), "operation log stopped");
        discarded
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
