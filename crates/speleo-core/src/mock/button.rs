use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::convert::Infallible;
use core::ops::Range;

use embedded_hal::digital::{ErrorType, InputPin};

use super::clock::SimClock;

/// Active-low button whose presses are scheduled in virtual time.
#[derive(Debug, Clone)]
pub struct ScriptedButton {
    clock: SimClock,
    presses: Rc<RefCell<Vec<Range<u64>>>>,
}

impl ScriptedButton {
    pub fn new(clock: SimClock) -> Self {
        Self {
            clock,
            presses: Rc::default(),
        }
    }

    /// Hold the button from `at_ms` for `duration_ms` (absolute virtual time).
    pub fn press(&self, at_ms: u64, duration_ms: u64) {
        self.presses
            .borrow_mut()
            .push(at_ms..at_ms + duration_ms);
    }

    /// Hold the button starting `delay_ms` from now.
    pub fn press_in(&self, delay_ms: u64, duration_ms: u64) {
        self.press(self.clock.now_ms() + delay_ms, duration_ms);
    }

    pub fn is_held(&self) -> bool {
        let now = self.clock.now_ms();
        self.presses.borrow().iter().any(|p| p.contains(&now))
    }
}

impl ErrorType for ScriptedButton {
    type Error = Infallible;
}

impl InputPin for ScriptedButton {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.is_held())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.is_held())
    }
}
