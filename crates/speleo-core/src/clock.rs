//! Millisecond time base
//!
//! The foreground loop only ever reads the counter; a hardware timer
//! interrupt increments it. The 64-bit value is updated in several
//! instructions on the target, so both sides go through a critical section.

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

/// Monotonic millisecond clock consumed by the state machine.
pub trait Clock {
    /// Milliseconds since start or since the last [`Clock::reset`].
    fn elapsed_millis(&self) -> u64;

    /// Restart counting from zero (used after waking from sleep, where the
    /// timer was halted).
    fn reset(&mut self);
}

/// ISR-driven millisecond counter.
///
/// # Example
///
/// ```
/// use speleo_core::clock::{Clock, MillisCounter};
///
/// static MILLIS: MillisCounter = MillisCounter::new();
///
/// // inside the timer interrupt
/// MILLIS.increment();
///
/// let mut clock = &MILLIS;
/// assert_eq!(clock.elapsed_millis(), 1);
/// clock.reset();
/// assert_eq!(clock.elapsed_millis(), 0);
/// ```
pub struct MillisCounter {
    millis: Mutex<CriticalSectionRawMutex, Cell<u64>>,
}

impl Default for MillisCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl MillisCounter {
    pub const fn new() -> Self {
        Self {
            millis: Mutex::new(Cell::new(0)),
        }
    }

    /// Advance by one millisecond. Called from the timer interrupt.
    pub fn increment(&self) {
        self.advance(1);
    }

    /// Advance by `ms` milliseconds in one step.
    pub fn advance(&self, ms: u64) {
        self.millis.lock(|m| m.set(m.get().wrapping_add(ms)));
    }

    pub fn now(&self) -> u64 {
        self.millis.lock(|m| m.get())
    }

    pub fn clear(&self) {
        self.millis.lock(|m| m.set(0));
    }
}

impl Clock for &MillisCounter {
    fn elapsed_millis(&self) -> u64 {
        self.now()
    }

    fn reset(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_accumulates_increments() {
        let counter = MillisCounter::new();
        for _ in 0..1500 {
            counter.increment();
        }
        assert_eq!(counter.now(), 1500);
        counter.advance(500);
        assert_eq!((&counter).elapsed_millis(), 2000);
    }

    #[test]
    fn reset_restarts_from_zero() {
        let counter = MillisCounter::new();
        counter.advance(90_000);
        let mut clock = &counter;
        clock.reset();
        assert_eq!(clock.elapsed_millis(), 0);
        counter.increment();
        assert_eq!(clock.elapsed_millis(), 1);
    }
}
