//! Sinks that write rendered scripts.
//!
//! A [`ScriptSink`] renders whatever the log hands it and writes it to any
//! [`io::Write`]. The writer is flushed after every delivery so a script on
//! disk is as complete as possible if the host dies mid-session.

use std::cell::RefCell;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use retrace_log::record::Record;
use retrace_log::sink::LogSink;
use retrace_log::statement::Statement;
use tracing::debug;

use crate::render::{PythonRenderer, Renderer};

// ---------------------------------------------------------------------------
// ScriptSink
// ---------------------------------------------------------------------------

/// Renders log deliveries with `R` and writes them to `W`.
pub struct ScriptSink<R, W> {
    renderer: R,
    writer: W,
    records_written: usize,
}

impl<R: Renderer, W: Write> ScriptSink<R, W> {
    pub fn new(renderer: R, writer: W) -> Self {
        Self {
            renderer,
            writer,
            records_written: 0,
        }
    }

    /// Number of records written so far.
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Give back the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_flushed(&mut self, text: &str) -> anyhow::Result<()> {
        self.writer.write_all(text.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<R: Renderer, W: Write> LogSink for ScriptSink<R, W> {
    fn initialize(&mut self) -> anyhow::Result<()> {
        let prologue = self.renderer.prologue();
        self.write_flushed(&prologue)
    }

    fn add_preamble(&mut self, statements: &[Statement]) -> anyhow::Result<()> {
        let text = self.renderer.render_statements(statements);
        self.write_flushed(&text)
    }

    fn add_records(&mut self, records: &[Record]) -> anyhow::Result<()> {
        let text: String = records
            .iter()
            .map(|record| self.renderer.render_record(record))
            .collect();
        self.write_flushed(&text)?;
        self.records_written += records.len();
        Ok(())
    }

    fn finalize(&mut self) -> anyhow::Result<()> {
        let postscript = self.renderer.postscript();
        self.write_flushed(&postscript)?;
        debug!(records = self.records_written, "script sink finalized");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileSink
// ---------------------------------------------------------------------------

/// A [`ScriptSink`] writing to a file.
pub struct FileSink<R = PythonRenderer> {
    path: PathBuf,
    inner: ScriptSink<R, BufWriter<File>>,
}

impl<R: Renderer> FileSink<R> {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: impl AsRef<Path>, renderer: R) -> Result<Self, anyhow::Error> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .map_err(|e| anyhow::anyhow!("failed to create log script {}: {e}", path.display()))?;
        debug!(path = %path.display(), "opened log script");
        Ok(Self {
            path,
            inner: ScriptSink::new(renderer, BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records_written(&self) -> usize {
        self.inner.records_written()
    }
}

impl<R: Renderer> LogSink for FileSink<R> {
    fn initialize(&mut self) -> anyhow::Result<()> {
        self.inner.initialize()
    }

    fn add_preamble(&mut self, statements: &[Statement]) -> anyhow::Result<()> {
        self.inner.add_preamble(statements)
    }

    fn add_records(&mut self, records: &[Record]) -> anyhow::Result<()> {
        self.inner.add_records(records)
    }

    fn finalize(&mut self) -> anyhow::Result<()> {
        self.inner.finalize()?;
        self.inner.writer.get_ref().sync_all()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SharedBuffer
// ---------------------------------------------------------------------------

/// An in-memory writer whose clones share one buffer.
///
/// Hand one clone to a [`ScriptSink`] and keep another to read what has been
/// written so far.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, as text.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
