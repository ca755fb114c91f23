use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use embedded_hal::delay::DelayNs;

/// Shared virtual time in microseconds.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    micros: Rc<Cell<u64>>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_us(&self) -> u64 {
        self.micros.get()
    }

    pub fn now_ms(&self) -> u64 {
        self.micros.get() / 1000
    }

    pub fn advance_us(&self, us: u64) {
        self.micros.set(self.micros.get() + us);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance_us(ms * 1000);
    }

    /// Jump forward to `ms`; never moves backwards.
    pub fn advance_to_ms(&self, ms: u64) {
        let target = ms * 1000;
        if target > self.micros.get() {
            self.micros.set(target);
        }
    }
}

/// Delay that advances a [`SimClock`] and logs every `delay_ms` request.
#[derive(Debug, Clone)]
pub struct SimDelay {
    clock: SimClock,
    calls: Rc<RefCell<Vec<u32>>>,
}

impl SimDelay {
    pub fn new(clock: SimClock) -> Self {
        Self {
            clock,
            calls: Rc::default(),
        }
    }

    /// Every millisecond delay requested so far, in order.
    pub fn calls(&self) -> Vec<u32> {
        self.calls.borrow().clone()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.clock.advance_us(u64::from(ns).div_ceil(1000));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.calls.borrow_mut().push(ms);
        self.clock.advance_ms(u64::from(ms));
    }
}
