//! External signal values of one cycle.

use strobe_foundation::{Layout, Record};

use crate::error::{Error, Result};
use crate::types::{Condition, SignalId};

/// One record per declared signal, driven by whoever steps the schedule.
///
/// Values are fitted to the signal's layout when written, so a frame always
/// holds well-formed records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    layouts: Vec<Layout>,
    values: Vec<Record>,
}

impl Frame {
    /// A frame with every signal at zero.
    pub(crate) fn new(layouts: Vec<Layout>) -> Self {
        let values = layouts.iter().map(Layout::zero).collect();
        Self { layouts, values }
    }

    pub fn set(&mut self, signal: SignalId, value: Record) -> Result<()> {
        let layout = self.layouts.get(signal.0).ok_or(Error::UnknownEntity {
            kind: "signal",
            index: signal.0,
        })?;
        self.values[signal.0] = layout.truncate(&value);
        Ok(())
    }

    /// Drive a 1-bit signal.
    pub fn set_flag(&mut self, signal: SignalId, value: bool) -> Result<()> {
        self.set(signal, Record::from_bool(value))
    }

    pub fn value(&self, signal: SignalId) -> Option<&Record> {
        self.values.get(signal.0)
    }

    pub fn flag(&self, signal: SignalId) -> bool {
        self.value(signal).is_some_and(Record::is_truthy)
    }

    /// Reset every signal to zero.
    pub fn clear(&mut self) {
        for (value, layout) in self.values.iter_mut().zip(&self.layouts) {
            *value = layout.zero();
        }
    }

    pub(crate) fn holds(&self, condition: Condition) -> bool {
        match condition {
            Condition::Always => true,
            Condition::Signal(signal) => self.flag(signal),
        }
    }
}
