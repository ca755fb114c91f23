use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use crate::scd4x::Command;
use crate::tone::Tone;

/// Something a simulated part observed, in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalEntry {
    /// The sensor accepted a command write.
    Sensor(Command),
    /// The sensor refused a command write.
    SensorRejected(Command),
    Display { enabled: bool },
    Tone(Tone),
    Sleep,
    Wake,
}

/// Shared, append-only event log across simulated parts.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Rc<RefCell<Vec<JournalEntry>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: JournalEntry) {
        self.entries.borrow_mut().push(entry);
    }

    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries.borrow().clone()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Position of the first matching entry.
    pub fn position(&self, entry: JournalEntry) -> Option<usize> {
        self.entries.borrow().iter().position(|e| *e == entry)
    }

    /// Sensor commands accepted so far.
    pub fn commands(&self) -> Vec<Command> {
        self.entries
            .borrow()
            .iter()
            .filter_map(|e| match e {
                JournalEntry::Sensor(c) => Some(*c),
                _ => None,
            })
            .collect()
    }
}
