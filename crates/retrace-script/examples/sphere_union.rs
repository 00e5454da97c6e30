//! Logs a short modeling session and prints the replay script.
//!
//! Two spheres are created and united; the union's second operand is hinted
//! so the script refers to it through the previous result instead of its
//! runtime identifier.
//!
//! Run with: `cargo run -p retrace-script --example sphere_union [-- out.py]`
//!
//! Set `RUST_LOG=debug` to see the log's own tracing output.

use retrace_log::prelude::*;
use retrace_model::prelude::*;
use retrace_script::prelude::*;

fn sphere(radius: f64, x: f64) -> Parameters {
    Parameters::new(vec![
        AttributeItem::scalar("radius", vec![Value::Double(0.5)])
            .with_values(vec![Value::Double(radius)]),
        AttributeItem::scalar("inner radius", vec![Value::Double(0.0)]),
        AttributeItem::scalar("center", vec![Value::Double(0.0); 3])
            .with_values(vec![Value::Double(x), Value::Double(0.0), Value::Double(0.0)]),
    ])
}

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let mut log = OperationLog::new();
    let renderer = PythonRenderer::from_config(log.config()).with_import("import modeler");
    let buffer = SharedBuffer::new();
    log.add_sink(Box::new(ScriptSink::new(renderer.clone(), buffer.clone())))?;
    if let Some(path) = std::env::args().nth(1) {
        log.add_sink(Box::new(FileSink::create(&path, renderer)?))?;
    }

    let session = Session::new(1, "cgm", "CGM Session");
    let mut spheres = Vec::new();
    for (radius, x) in [(1.0, 0.0), (0.75, 1.2)] {
        log.on_invoke(&session, "create sphere", &sphere(radius, x))?;
        let created = EntityRef::random();
        log.on_result(
            "create sphere",
            OperationResult::new(Outcome::Succeeded).with_created(vec![created]),
        )?;
        spheres.push(created);
    }

    let assoc = ItemPath::root("assoc");
    log.add_hint(&assoc, 0, -2, ResultGroup::Created, 0)?;
    log.add_hint(&assoc, 1, -1, ResultGroup::Created, 0)?;
    log.on_invoke(
        &session,
        "union",
        &Parameters::new(vec![AttributeItem::association("assoc", spheres.clone())]),
    )?;
    log.on_result(
        "union",
        OperationResult::new(Outcome::Succeeded)
            .with_created(vec![EntityRef::random()])
            .with_expunged(spheres),
    )?;

    log.stop();
    print!("{}", buffer.contents());
    eprintln!("log fingerprint: {}", log.fingerprint());
    Ok(())
}
