//! Retrace Script -- Rendering operation logs as replay scripts.
//!
//! [`render`] turns the abstract statements of a
//! [`retrace_log`] operation log into text, and [`sink`] provides log sinks
//! that write that text to files or in-memory buffers as the log grows.
//!
//! ```
//! use retrace_log::prelude::*;
//! use retrace_model::prelude::*;
//! use retrace_script::prelude::*;
//!
//! let buffer = SharedBuffer::new();
//! let mut log = OperationLog::new();
//! log.add_sink(Box::new(ScriptSink::new(PythonRenderer::new(false), buffer.clone())))
//!     .unwrap();
//!
//! let session = Session::new(1, "cgm", "CGM Session");
//! log.on_invoke(&session, "create brick", &Parameters::default()).unwrap();
//! log.on_result("create brick", OperationResult::new(Outcome::Succeeded)).unwrap();
//! log.stop();
//!
//! assert!(buffer.contents().contains("op1 = cgmSession.op('create brick')"));
//! ```

#![deny(unsafe_code)]

pub mod render;
pub mod sink;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::render::{render_script, PythonRenderer, Renderer};
    pub use crate::sink::{FileSink, ScriptSink, SharedBuffer};
}
