//! Replay round-trip tests.
//!
//! A small in-memory modeling kernel runs a sequence of operations while an
//! [`OperationLog`] records them. The log's statements are then executed by a
//! tiny interpreter against a fresh kernel, and the two resulting models are
//! compared. Entity identifiers differ between the runs, so models are
//! compared by entity descriptions and results by group sizes.

use std::collections::{BTreeMap, HashMap};

use retrace_log::prelude::*;
use retrace_model::prelude::*;

// ---------------------------------------------------------------------------
// Toy kernel
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Kernel {
    live: BTreeMap<EntityRef, String>,
}

impl Kernel {
    /// Default parameters of a fresh operator.
    fn operator(name: &str) -> Option<Parameters> {
        let params = match name {
            "create sphere" => Parameters::new(vec![
                AttributeItem::scalar("radius", vec![Value::Double(0.5)]),
                AttributeItem::scalar("inner radius", vec![Value::Double(0.0)]),
                AttributeItem::scalar("center", vec![Value::Double(0.0); 3]),
            ]),
            "create brick" => Parameters::new(vec![
                AttributeItem::composite(
                    "dimensions",
                    vec![
                        AttributeItem::scalar("width", vec![Value::Double(1.0)]),
                        AttributeItem::scalar("height", vec![Value::Double(1.0)]),
                        AttributeItem::scalar("depth", vec![Value::Double(1.0)]),
                    ],
                ),
                AttributeItem::scalar("label", vec![Value::from("brick")]).optional(false),
                AttributeItem::discrete("construction method", &["axis aligned", "oriented"], Some(0))
                    .ok()?,
            ]),
            "union" => Parameters::new(vec![
                AttributeItem::association("assoc", Vec::new()),
                AttributeItem::discrete("separate bodies", &["no", "yes"], Some(0)).ok()?,
            ]),
            "translate" => Parameters::new(vec![
                AttributeItem::association("assoc", Vec::new()),
                AttributeItem::scalar("offset", vec![Value::Double(0.0); 3]),
            ]),
            _ => return None,
        };
        Some(params)
    }

    fn run(&mut self, name: &str, params: &Parameters) -> OperationResult {
        let operands: Vec<EntityRef> = match params.association().map(|a| &a.kind) {
            Some(ItemKind::Association { entities }) => entities.clone(),
            _ => Vec::new(),
        };
        if operands.iter().any(|e| !self.live.contains_key(e)) {
            return OperationResult::new(Outcome::Failed);
        }

        match name {
            "create sphere" | "create brick" => {
                let entity = EntityRef::random();
                self.live.insert(entity, format!("{name} {}", describe(params)));
                OperationResult::new(Outcome::Succeeded).with_created(vec![entity])
            }
            "union" => {
                if operands.len() < 2 {
                    return OperationResult::new(Outcome::UnableToOperate);
                }
                let mut parts: Vec<String> = operands
                    .iter()
                    .filter_map(|e| self.live.remove(e))
                    .collect();
                parts.sort();
                let entity = EntityRef::random();
                self.live
                    .insert(entity, format!("union[{}] {}", parts.join(" + "), describe(params)));
                OperationResult::new(Outcome::Succeeded)
                    .with_created(vec![entity])
                    .with_expunged(operands)
            }
            "translate" => {
                for entity in &operands {
                    if let Some(desc) = self.live.get_mut(entity) {
                        desc.push_str(&format!(" moved {}", describe(params)));
                    }
                }
                OperationResult::new(Outcome::Succeeded).with_modified(operands)
            }
            _ => OperationResult::new(Outcome::UnableToOperate),
        }
    }

    fn model(&self) -> Vec<String> {
        let mut descriptions: Vec<String> = self.live.values().cloned().collect();
        descriptions.sort();
        descriptions
    }
}

/// Every non-association item, with its full state.
fn describe(params: &Parameters) -> String {
    params
        .items
        .iter()
        .filter(|item| !item.is_association())
        .map(|item| format!("{item:?}"))
        .collect::<Vec<_>>()
        .join(";")
}

// ---------------------------------------------------------------------------
// Interpreter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Slot {
    Manager,
    Session,
    Operator(usize),
    Item { operator: usize, path: ItemPath },
    Result(OperationResult),
}

struct Replayer<'k> {
    kernel: &'k mut Kernel,
    env: HashMap<String, Slot>,
    operators: Vec<(String, Parameters)>,
}

impl<'k> Replayer<'k> {
    fn new(kernel: &'k mut Kernel) -> Self {
        Self {
            kernel,
            env: HashMap::new(),
            operators: Vec::new(),
        }
    }

    fn run<'s>(&mut self, statements: impl IntoIterator<Item = &'s Statement>) -> Result<(), String> {
        for statement in statements {
            self.exec(statement)?;
        }
        Ok(())
    }

    fn exec(&mut self, statement: &Statement) -> Result<(), String> {
        match statement {
            Statement::Comment(_) => Ok(()),
            Statement::Assign { var, value } => {
                let Expr::Call {
                    receiver,
                    function,
                    args,
                } = value
                else {
                    return Err(format!("unsupported assignment to {var}: {value:?}"));
                };
                let receiver = match receiver.as_deref() {
                    Some(Expr::Var(name)) => Some(name.as_str()),
                    None => None,
                    Some(other) => return Err(format!("unsupported receiver {other:?}")),
                };
                let slot = self
                    .call(receiver, function, args)?
                    .ok_or_else(|| format!("{function} returns nothing"))?;
                self.env.insert(var.clone(), slot);
                Ok(())
            }
            Statement::Call {
                receiver,
                function,
                args,
            } => self.call(receiver.as_deref(), function, args).map(|_| ()),
            Statement::SetValue {
                target,
                index,
                value,
            } => {
                let value = self.eval(value)?;
                let item = self.item_mut(target)?;
                set_value(item, *index, value)
            }
        }
    }

    fn slot(&self, var: &str) -> Result<&Slot, String> {
        self.env.get(var).ok_or_else(|| format!("unbound variable {var}"))
    }

    fn item_mut(&mut self, var: &str) -> Result<&mut AttributeItem, String> {
        let (operator, path) = match self.slot(var)? {
            Slot::Item { operator, path } => (*operator, path.clone()),
            other => return Err(format!("{var} is not an item: {other:?}")),
        };
        self.operators[operator]
            .1
            .find_path_mut(&path)
            .ok_or_else(|| format!("no item at {path}"))
    }

    fn eval(&self, expr: &Expr) -> Result<Value, String> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Lookup {
                result_var,
                group,
                entry,
            } => {
                let Slot::Result(result) = self.slot(result_var)? else {
                    return Err(format!("{result_var} is not a result"));
                };
                let entities = match group {
                    ResultGroup::Created => &result.created,
                    ResultGroup::Expunged => &result.expunged,
                    ResultGroup::Modified => &result.modified,
                };
                entities
                    .get(*entry)
                    .copied()
                    .map(Value::Entity)
                    .ok_or_else(|| format!("{result_var} has no {group} entry {entry}"))
            }
            other => Err(format!("unsupported value {other:?}")),
        }
    }

    fn call(
        &mut self,
        receiver: Option<&str>,
        function: &str,
        args: &[Expr],
    ) -> Result<Option<Slot>, String> {
        let Some(receiver) = receiver else {
            return match function {
                method::CREATE_MANAGER => Ok(Some(Slot::Manager)),
                _ => Err(format!("unknown function {function}")),
            };
        };
        let slot = self.slot(receiver)?.clone();
        match (slot, function, args) {
            (Slot::Manager, method::CREATE_SESSION, [Expr::Str(_)]) => Ok(Some(Slot::Session)),
            (Slot::Session, method::SET_NAME, [Expr::Str(_)]) => Ok(None),
            (Slot::Session, method::CREATE_OPERATOR, [Expr::Str(name)]) => {
                let params =
                    Kernel::operator(name).ok_or_else(|| format!("unknown operator {name}"))?;
                self.operators.push((name.clone(), params));
                Ok(Some(Slot::Operator(self.operators.len() - 1)))
            }
            (Slot::Operator(operator), method::FIND, [Expr::Str(name)]) => Ok(Some(Slot::Item {
                operator,
                path: ItemPath::root(name),
            })),
            (Slot::Operator(operator), method::ASSOCIATIONS, []) => {
                let name = self.operators[operator]
                    .1
                    .association()
                    .map(|item| item.name.clone())
                    .ok_or("operator has no association item")?;
                Ok(Some(Slot::Item {
                    operator,
                    path: ItemPath::root(&name),
                }))
            }
            (Slot::Operator(operator), method::OPERATE, []) => {
                let (name, params) = &self.operators[operator];
                Ok(Some(Slot::Result(self.kernel.run(name, params))))
            }
            (Slot::Item { operator, path }, method::FIND_CHILD, [Expr::Str(name)]) => {
                Ok(Some(Slot::Item {
                    operator,
                    path: path.child(name),
                }))
            }
            (Slot::Item { .. }, method::SET_ENABLED, [Expr::Bool(enabled)]) => {
                let item = self.item_mut(receiver)?;
                item.set_enabled(*enabled).map_err(|e| e.to_string())?;
                Ok(None)
            }
            (Slot::Item { .. }, method::SET_DISCRETE_INDEX, [Expr::Literal(Value::Int(index))]) => {
                let item = self.item_mut(receiver)?;
                item.select(*index as usize).map_err(|e| e.to_string())?;
                Ok(None)
            }
            (Slot::Item { .. }, method::SET_NUMBER_OF_VALUES, [Expr::Literal(Value::Int(n))]) => {
                let item = self.item_mut(receiver)?;
                match &mut item.kind {
                    ItemKind::Scalar { values, defaults } => {
                        let fill = defaults.last().cloned().unwrap_or(Value::Int(0));
                        values.resize(*n as usize, fill);
                        Ok(None)
                    }
                    _ => Err(format!("{receiver} is not a scalar item")),
                }
            }
            (slot, function, args) => Err(format!("cannot call {function}{args:?} on {slot:?}")),
        }
    }
}

fn set_value(item: &mut AttributeItem, index: usize, value: Value) -> Result<(), String> {
    if matches!(item.kind, ItemKind::Discrete { .. }) {
        return match value {
            Value::Int(selected) if index == 0 => {
                item.select(selected as usize).map_err(|e| e.to_string())
            }
            other => Err(format!("cannot set {}[{index}] to {other}", item.name)),
        };
    }
    match (&mut item.kind, value) {
        (ItemKind::Scalar { values, .. }, value) => {
            if index >= values.len() {
                values.resize(index + 1, Value::Int(0));
            }
            values[index] = value;
            Ok(())
        }
        (ItemKind::Association { entities }, Value::Entity(entity)) => {
            if index >= entities.len() {
                entities.resize(index + 1, entity);
            }
            entities[index] = entity;
            Ok(())
        }
        (_, value) => Err(format!("cannot set {}[{index}] to {value}", item.name)),
    }
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

struct Host {
    kernel: Kernel,
    log: OperationLog,
    session: Session,
}

impl Host {
    fn new() -> Self {
        Self {
            kernel: Kernel::default(),
            log: OperationLog::new(),
            session: Session::new(1, "cgm", "CGM Session"),
        }
    }

    /// Configure a fresh operator, run it and log both events.
    fn perform(&mut self, name: &str, configure: impl FnOnce(&mut Parameters)) -> OperationResult {
        let mut params = Kernel::operator(name).unwrap();
        configure(&mut params);
        self.log.on_invoke(&self.session, name, &params).unwrap();
        let result = self.kernel.run(name, &params);
        self.log.on_result(name, result.clone()).unwrap();
        result
    }

    fn hint(&mut self, index: usize, offset: i64, group: ResultGroup, entry: usize) {
        self.log
            .add_hint(&ItemPath::root("assoc"), index, offset, group, entry)
            .unwrap();
    }

    /// Replay the log against a fresh kernel.
    fn replay(&self) -> (Kernel, HashMap<String, Slot>) {
        let mut kernel = Kernel::default();
        let mut replayer = Replayer::new(&mut kernel);
        replayer.run(self.log.statements()).unwrap();
        let env = replayer.env;
        (kernel, env)
    }
}

fn set(params: &mut Parameters, path: &str, values: Vec<Value>) {
    let item = params.find_path_mut(&ItemPath::parse(path).unwrap()).unwrap();
    *item = item.clone().with_values(values);
}

fn set_entities(params: &mut Parameters, entities: Vec<EntityRef>) {
    let item = params.find_mut("assoc").unwrap();
    item.kind = ItemKind::Association { entities };
}

fn group_sizes(result: &OperationResult) -> (Outcome, usize, usize, usize) {
    (
        result.outcome,
        result.created.len(),
        result.expunged.len(),
        result.modified.len(),
    )
}

/// Compare each record with the result its replay stored under `res<n>`.
fn assert_results_match(host: &Host, env: &HashMap<String, Slot>) {
    for record in host.log.records() {
        let var = record.result_var.as_deref().unwrap();
        let Some(Slot::Result(replayed)) = env.get(var) else {
            panic!("{var} not bound by replay");
        };
        assert_eq!(
            group_sizes(replayed),
            (
                record.outcome,
                record.created.len(),
                record.expunged.len(),
                record.modified.len()
            ),
            "record {} ({})",
            record.index,
            record.name
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn replay_without_hints_rebuilds_equivalent_model() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut host = Host::new();

    host.perform("create sphere", |p| {
        set(p, "radius", vec![Value::Double(1.0)]);
        set(p, "center", vec![Value::Double(0.2); 3]);
    });
    host.perform("create brick", |p| {
        set(p, "dimensions/width", vec![Value::Double(2.5)]);
        let label = p.find_mut("label").unwrap();
        label.set_enabled(true).unwrap();
        *label = label.clone().with_values(vec![Value::from("wall")]);
        p.find_mut("construction method").unwrap().select(1).unwrap();
    });
    host.perform("create sphere", |_| {});

    let (replayed, env) = host.replay();
    assert_eq!(replayed.model(), host.kernel.model());
    assert_eq!(replayed.live.len(), 3);
    assert_results_match(&host, &env);
}

#[test]
fn replay_with_hints_follows_entity_lineage() {
    let mut host = Host::new();

    let a = host.perform("create sphere", |p| set(p, "radius", vec![Value::Double(1.0)]));
    let b = host.perform("create sphere", |p| {
        set(p, "center", vec![Value::Double(0.9), Value::Double(0.0), Value::Double(0.0)]);
    });

    host.hint(0, -2, ResultGroup::Created, 0);
    host.hint(1, -1, ResultGroup::Created, 0);
    let union = host.perform("union", |p| {
        set_entities(p, vec![a.created[0], b.created[0]]);
    });
    assert_eq!(union.outcome, Outcome::Succeeded);

    host.hint(0, -1, ResultGroup::Created, 0);
    host.perform("translate", |p| {
        set_entities(p, union.created.clone());
        set(p, "offset", vec![Value::Double(0.0), Value::Double(0.0), Value::Double(3.0)]);
    });

    let (replayed, env) = host.replay();
    assert_eq!(replayed.model(), host.kernel.model());
    assert_eq!(replayed.live.len(), 1);
    assert_results_match(&host, &env);
}

#[test]
fn literal_identifiers_do_not_survive_replay() {
    let mut host = Host::new();
    let a = host.perform("create sphere", |_| {});
    let b = host.perform("create sphere", |p| set(p, "radius", vec![Value::Double(2.0)]));
    host.perform("union", |p| set_entities(p, vec![a.created[0], b.created[0]]));

    let (replayed, env) = host.replay();
    let Some(Slot::Result(union)) = env.get("res3") else {
        panic!("res3 not bound by replay");
    };
    assert_eq!(union.outcome, Outcome::Failed);
    assert_eq!(replayed.live.len(), 2);
    assert_eq!(host.kernel.live.len(), 1);
}

#[test]
fn error_marked_records_replay_as_no_ops() {
    let mut host = Host::new();
    host.perform("create sphere", |_| {});
    host.log.on_result("stray", OperationResult::new(Outcome::Succeeded)).unwrap();
    host.perform("create sphere", |p| set(p, "radius", vec![Value::Double(3.0)]));

    let (replayed, env) = host.replay();
    assert_eq!(replayed.model(), host.kernel.model());
    assert!(env.contains_key("res1"));
    assert!(env.contains_key("res2"));
    assert!(!env.contains_key("res3"));
}
