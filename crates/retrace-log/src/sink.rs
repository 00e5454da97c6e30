//! Log sinks and incremental fan-out.
//!
//! A [`LogSink`] receives the log as it grows: preamble statements and
//! finished records, each delivered exactly once and in order. The log keeps
//! one cursor per sink, so a sink attached late is caught up on everything
//! it missed before receiving new material.
//!
//! Sinks never stop an operation. A sink error is logged, counted, and the
//! sink's cursor still advances; the log carries on.

use tracing::warn;

use crate::record::Record;
use crate::statement::Statement;

/// Consumer of a growing operation log.
pub trait LogSink {
    /// Called once when the sink is attached, before any statements.
    fn initialize(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Preamble statements not yet delivered. Sessions registered after the
    /// sink was attached arrive here just before the record that uses them.
    fn add_preamble(&mut self, statements: &[Statement]) -> anyhow::Result<()>;

    /// Records not yet delivered, in history order.
    fn add_records(&mut self, records: &[Record]) -> anyhow::Result<()>;

    /// Called once when logging stops.
    fn finalize(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

struct SinkSlot {
    sink: Box<dyn LogSink>,
    next_preamble: usize,
    next_record: usize,
    failures: usize,
}

impl SinkSlot {
    fn note(&mut self, index: usize, stage: &str, result: anyhow::Result<()>) {
        if let Err(e) = result {
            self.failures += 1;
            warn!(sink = index, stage, error = %e, "log sink failed");
        }
    }
}

/// The set of attached sinks and their delivery cursors.
#[derive(Default)]
pub(crate) struct SinkFanout {
    slots: Vec<SinkSlot>,
}

impl SinkFanout {
    /// Attach and initialize a sink, then catch it up.
    pub(crate) fn attach(
        &mut self,
        mut sink: Box<dyn LogSink>,
        preamble: &[Statement],
        records: &[Record],
    ) {
        let init = sink.initialize();
        let index = self.slots.len();
        let mut slot = SinkSlot {
            sink,
            next_preamble: 0,
            next_record: 0,
            failures: 0,
        };
        slot.note(index, "initialize", init);
        self.slots.push(slot);
        self.sync_slot(index, preamble, records);
    }

    /// Deliver everything each sink has not seen yet.
    pub(crate) fn sync(&mut self, preamble: &[Statement], records: &[Record]) {
        for index in 0..self.slots.len() {
            self.sync_slot(index, preamble, records);
        }
    }

    /// Deliver what is left, then finalize every sink.
    pub(crate) fn finalize(&mut self, preamble: &[Statement], records: &[Record]) {
        self.sync(preamble, records);
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let result = slot.sink.finalize();
            slot.note(index, "finalize", result);
        }
    }

    fn sync_slot(&mut self, index: usize, preamble: &[Statement], records: &[Record]) {
        let slot = &mut self.slots[index];
        if slot.next_preamble < preamble.len() {
            let result = slot.sink.add_preamble(&preamble[slot.next_preamble..]);
            slot.note(index, "preamble", result);
            slot.next_preamble = preamble.len();
        }
        if slot.next_record < records.len() {
            let result = slot.sink.add_records(&records[slot.next_record..]);
            slot.note(index, "records", result);
            slot.next_record = records.len();
        }
    }

    /// Total number of failed sink calls.
    pub(crate) fn failures(&self) -> usize {
        self.slots.iter().map(|slot| slot.failures).sum()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}
