//! Audible signals
//!
//! Each tone is a short melody of `(divider, duration)` steps. `divider` is the
//! PWM top value of the buzzer driver (higher is lower pitch, 0 is a rest) and
//! `duration` is given in 10 ms units.

/// Counter clock the dividers are relative to.
pub const TONE_CLOCK_HZ: u32 = 1_000_000;

/// One step of a melody.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    pub divider: u8,
    pub duration_10ms: u8,
}

impl Note {
    /// Output frequency, or `None` for a rest.
    pub const fn frequency_hz(&self) -> Option<u32> {
        if self.divider == 0 {
            None
        } else {
            Some(TONE_CLOCK_HZ / (self.divider as u32 + 1))
        }
    }

    pub const fn duration_ms(&self) -> u32 {
        self.duration_10ms as u32 * 10
    }
}

const fn note(divider: u8, duration_10ms: u8) -> Note {
    Note {
        divider,
        duration_10ms,
    }
}

const RELAX: [Note; 2] = [note(220, 30), note(250, 15)];
const WARN: [Note; 2] = [note(250, 15), note(220, 30)];
const STARTUP: [Note; 7] = [
    note(250, 20),
    note(220, 14),
    note(190, 14),
    note(0, 6),
    note(250, 6),
    note(0, 6),
    note(250, 6),
];
const SHUTDOWN: [Note; 7] = [
    note(190, 20),
    note(220, 14),
    note(250, 14),
    note(0, 6),
    note(250, 6),
    note(0, 6),
    note(250, 6),
];

/// Signals the monitor can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// CO₂ dropped back one threshold step.
    Relax,
    /// CO₂ crossed the next threshold; repeated once per severity step.
    Warn,
    Startup,
    Shutdown,
}

impl Tone {
    pub const fn melody(self) -> &'static [Note] {
        match self {
            Self::Relax => &RELAX,
            Self::Warn => &WARN,
            Self::Startup => &STARTUP,
            Self::Shutdown => &SHUTDOWN,
        }
    }

    /// Total playing time in milliseconds.
    pub fn duration_ms(self) -> u32 {
        self.melody()
            .iter()
            .map(Note::duration_ms)
            .sum()
    }
}

/// Fire-and-forget tone output.
pub trait ToneGenerator {
    fn play(&mut self, tone: Tone);
}
