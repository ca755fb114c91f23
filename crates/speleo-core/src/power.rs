//! Power-off and wake confirmation
//!
//! Powering off puts the sensor into its power-down mode while the bus is
//! still usable, blanks the display and halts the MCU. Any button edge wakes
//! the MCU, but the device only comes back if that wake is followed by a
//! long press within the confirmation window; a brush against the button in
//! a pocket sends it straight back to sleep.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use embedded_hal::i2c::I2c;
use log::{info, warn};

use crate::board::Board;
use crate::config::MonitorConfig;
use crate::display::{GlyphDisplay, TextStyle};
use crate::input::{Button, ButtonEvent};
use crate::scd4x::Scd4x;
use crate::tone::Tone;

/// Button sampling period while waiting for the confirming long press.
pub const CONFIRM_POLL_MS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Sleeping,
    /// Woke at `since_ms`; waiting for a long press.
    AwaitingConfirmWake { since_ms: u64 },
}

/// What the caller has to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerStep {
    /// Halt until the wake source fires, then call [`PowerSequencer::woke`].
    Sleep,
    /// Keep sampling the button.
    Poll,
    /// Wake confirmed; bring the device back up.
    Resume,
}

/// Sleep/wake confirmation state machine.
#[derive(Debug, Clone)]
pub struct PowerSequencer {
    state: PowerState,
    confirm_window_ms: u64,
}

impl PowerSequencer {
    pub fn new(confirm_window_ms: u64) -> Self {
        Self {
            state: PowerState::Sleeping,
            confirm_window_ms,
        }
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    /// The MCU came out of sleep at `now_ms` (on the restarted clock).
    pub fn woke(&mut self, now_ms: u64) {
        self.state = PowerState::AwaitingConfirmWake { since_ms: now_ms };
    }

    pub fn next_step(&mut self, event: Option<ButtonEvent>, now_ms: u64) -> PowerStep {
        match self.state {
            PowerState::Sleeping => PowerStep::Sleep,
            PowerState::AwaitingConfirmWake { .. } if event == Some(ButtonEvent::Long) => {
                self.state = PowerState::Sleeping;
                PowerStep::Resume
            }
            PowerState::AwaitingConfirmWake { since_ms } => {
                if now_ms.saturating_sub(since_ms) > self.confirm_window_ms {
                    self.state = PowerState::Sleeping;
                    PowerStep::Sleep
                } else {
                    PowerStep::Poll
                }
            }
        }
    }
}

/// Runs the complete power-off cycle and returns once the user confirmed a
/// wake-up. The clock is restarted on every wake, so callers must not carry
/// timestamps across this call.
pub fn power_off<I2C, D, P, B>(
    sensor: &mut Scd4x<I2C, D>,
    board: &mut B,
    button: &mut Button<P>,
    config: &MonitorConfig,
) where
    I2C: I2c,
    D: DelayNs,
    P: InputPin,
    B: Board,
{
    info!("power: shutting down");
    let display = board.display();
    display.clear();
    display.write_str(0, 0, "== POWER OFF ==", TextStyle::NORMAL);
    board.play(Tone::Shutdown);
    board.delay_ms(config.result_display_ms);

    if let Err(e) = sensor.power_down() {
        warn!("power: sensor power-down failed: {}", e);
    }
    board.display().set_enabled(false);

    let mut sequencer = PowerSequencer::new(config.wake_confirm_window_ms);
    loop {
        let now = board.elapsed_millis();
        let event = if matches!(sequencer.state(), PowerState::Sleeping) {
            None
        } else {
            button.poll(now);
            button.drain()
        };
        match sequencer.next_step(event, now) {
            PowerStep::Sleep => {
                board.sleep_until_wake();
                board.reset();
                button.reset();
                sequencer.woke(board.elapsed_millis());
                info!("power: woke, waiting for confirmation");
            }
            PowerStep::Poll => board.delay_ms(CONFIRM_POLL_MS),
            PowerStep::Resume => break,
        }
    }

    info!("power: wake confirmed");
    board.display().set_enabled(true);
    sensor.wake_up();
}
