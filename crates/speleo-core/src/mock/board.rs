use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;

use embedded_hal::delay::DelayNs;

use super::clock::SimClock;
use super::journal::{Journal, JournalEntry};
use crate::board::{BatterySampler, Board};
use crate::clock::Clock;
use crate::display::{GlyphDisplay, TextFrame, TextStyle};
use crate::tone::{Tone, ToneGenerator};

/// [`TextFrame`] that also reports power switching to the journal.
#[derive(Debug, Default)]
pub struct MockDisplay {
    frame: TextFrame,
    journal: Option<Journal>,
    history: Vec<String>,
}

impl MockDisplay {
    pub fn frame(&self) -> &TextFrame {
        &self.frame
    }

    /// Screen contents right before each clear, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }
}

impl GlyphDisplay for MockDisplay {
    fn clear(&mut self) {
        self.history.push(self.frame.render());
        self.frame.clear();
    }

    fn set_enabled(&mut self, enabled: bool) {
        if let Some(journal) = &self.journal {
            journal.record(JournalEntry::Display { enabled });
        }
        self.frame.set_enabled(enabled);
    }

    fn write_glyph(&mut self, col: u8, row: u8, ch: char, style: TextStyle) {
        self.frame.write_glyph(col, row, ch, style);
    }

    fn write_bitmap(&mut self, col: u8, row: u8, width: u8, height: u8, data: &[u8]) {
        self.frame.write_bitmap(col, row, width, height, data);
    }
}

/// Board for host runs: text display, recorded tones, fixed battery voltage
/// and scripted wake-ups, all on a shared [`SimClock`].
#[derive(Debug)]
pub struct MockBoard {
    clock: SimClock,
    epoch_ms: u64,
    display: MockDisplay,
    journal: Option<Journal>,
    tones: Vec<Tone>,
    delays: Vec<u32>,
    battery_mv: u16,
    battery_reads: usize,
    sleeps: usize,
    wakes: VecDeque<u64>,
}

impl MockBoard {
    pub fn new(clock: SimClock) -> Self {
        Self {
            clock,
            epoch_ms: 0,
            display: MockDisplay::default(),
            journal: None,
            tones: Vec::new(),
            delays: Vec::new(),
            battery_mv: 3700,
            battery_reads: 0,
            sleeps: 0,
            wakes: VecDeque::new(),
        }
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.display.journal = Some(journal.clone());
        self.journal = Some(journal);
        self
    }

    pub fn frame(&self) -> &TextFrame {
        &self.display.frame
    }

    pub fn screen_history(&self) -> &[String] {
        self.display.history()
    }

    pub fn tones(&self) -> &[Tone] {
        &self.tones
    }

    pub fn clear_tones(&mut self) {
        self.tones.clear();
    }

    /// Millisecond delays requested through the board.
    pub fn delays(&self) -> &[u32] {
        &self.delays
    }

    pub fn set_battery_millivolts(&mut self, mv: u16) {
        self.battery_mv = mv;
    }

    pub fn battery_reads(&self) -> usize {
        self.battery_reads
    }

    pub fn sleeps(&self) -> usize {
        self.sleeps
    }

    /// The next sleep ends at absolute virtual time `at_ms`.
    pub fn script_wake_at(&mut self, at_ms: u64) {
        self.wakes.push_back(at_ms);
    }

    fn record(&self, entry: JournalEntry) {
        if let Some(journal) = &self.journal {
            journal.record(entry);
        }
    }
}

impl Clock for MockBoard {
    fn elapsed_millis(&self) -> u64 {
        self.clock.now_ms() - self.epoch_ms
    }

    fn reset(&mut self) {
        self.epoch_ms = self.clock.now_ms();
    }
}

impl ToneGenerator for MockBoard {
    fn play(&mut self, tone: Tone) {
        self.record(JournalEntry::Tone(tone));
        self.tones.push(tone);
    }
}

impl BatterySampler for MockBoard {
    fn read_millivolts(&mut self) -> u16 {
        self.battery_reads += 1;
        self.battery_mv
    }
}

impl DelayNs for MockBoard {
    fn delay_ns(&mut self, ns: u32) {
        self.clock.advance_us(u64::from(ns).div_ceil(1000));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delays.push(ms);
        self.clock.advance_ms(u64::from(ms));
    }
}

impl Board for MockBoard {
    type Display = MockDisplay;

    fn display(&mut self) -> &mut Self::Display {
        &mut self.display
    }

    /// Panics when no wake-up was scripted: the device would sleep forever.
    fn sleep_until_wake(&mut self) {
        self.sleeps += 1;
        self.record(JournalEntry::Sleep);
        let Some(at_ms) = self.wakes.pop_front() else {
            panic!("MockBoard: sleeping with no scripted wake-up");
        };
        self.clock.advance_to_ms(at_ms);
        self.record(JournalEntry::Wake);
    }
}
