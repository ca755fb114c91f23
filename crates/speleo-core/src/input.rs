//! Push-button classification
//!
//! The single button is polled from the main loop. Raw levels are debounced
//! and classified into short and long presses:
//!
//! * a new level is only trusted after it was stable for [`DEBOUNCE_MS`]
//! * holding for [`LONG_PRESS_MS`] emits one `Long` while still held
//! * releasing before that emits `Short`; releasing after a `Long` emits
//!   nothing
//!
//! There is a single pending-event slot. An event that is not drained before
//! the next one arrives is overwritten.

use embedded_hal::digital::InputPin;
use log::trace;

pub const DEBOUNCE_MS: u64 = 50;
pub const LONG_PRESS_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Short,
    Long,
}

/// Debounce and press-length state machine.
#[derive(Debug, Default)]
pub struct ButtonClassifier {
    raw_pressed: bool,
    pressed: bool,
    last_change_ms: u64,
    press_start_ms: Option<u64>,
    pending: Option<ButtonEvent>,
}

impl ButtonClassifier {
    pub const fn new() -> Self {
        Self {
            raw_pressed: false,
            pressed: false,
            last_change_ms: 0,
            press_start_ms: None,
            pending: None,
        }
    }

    /// Feed one raw sample taken at `now_ms`.
    pub fn update(&mut self, raw_pressed: bool, now_ms: u64) {
        if raw_pressed != self.raw_pressed {
            self.raw_pressed = raw_pressed;
            self.last_change_ms = now_ms;
        }
        if now_ms.saturating_sub(self.last_change_ms) < DEBOUNCE_MS {
            return;
        }

        if raw_pressed != self.pressed {
            self.pressed = raw_pressed;
            if raw_pressed {
                self.press_start_ms = Some(now_ms);
            } else if self.press_start_ms.take().is_some() {
                trace!("button: short press");
                self.pending = Some(ButtonEvent::Short);
            }
        } else if let Some(start) = self.press_start_ms
            && self.pressed
            && now_ms.saturating_sub(start) >= LONG_PRESS_MS
        {
            trace!("button: long press");
            self.pending = Some(ButtonEvent::Long);
            self.press_start_ms = None;
        }
    }

    /// Take the pending event, leaving the slot empty.
    pub fn drain(&mut self) -> Option<ButtonEvent> {
        self.pending.take()
    }

    /// Back to released with nothing pending. Used after the clock restarts.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Debounced level.
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }
}

/// An active-low button pin together with its classifier.
pub struct Button<P> {
    pin: P,
    classifier: ButtonClassifier,
}

impl<P: InputPin> Button<P> {
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            classifier: ButtonClassifier::new(),
        }
    }

    /// Sample the pin. A read error counts as released.
    pub fn poll(&mut self, now_ms: u64) {
        let pressed = self.pin.is_low().unwrap_or(false);
        self.classifier.update(pressed, now_ms);
    }

    pub fn drain(&mut self) -> Option<ButtonEvent> {
        self.classifier.drain()
    }

    pub fn reset(&mut self) {
        self.classifier.reset();
    }

    pub fn is_pressed(&self) -> bool {
        self.classifier.is_pressed()
    }
}
