//! Board abstraction
//!
//! Everything the state machine needs besides the sensor bus and the button:
//! the display, time, the buzzer, the battery gauge and MCU sleep. A board
//! crate implements these once for its hardware; the simulator and the tests
//! implement them on top of the `mock` module.

use embedded_hal::delay::DelayNs;

use crate::clock::Clock;
use crate::display::GlyphDisplay;
use crate::tone::ToneGenerator;

/// Supply voltage measurement.
pub trait BatterySampler {
    /// Current supply voltage in millivolts. Called at most once per
    /// battery tick; clamping and scaling happen in the caller.
    fn read_millivolts(&mut self) -> u16;
}

/// Hardware collaborators of the [`Monitor`](crate::app::Monitor).
///
/// `DelayNs` is used for user-facing pauses (splash, result screens, gaps
/// between warning beeps); sensor command delays go through the driver's own
/// delay.
pub trait Board: Clock + ToneGenerator + BatterySampler + DelayNs {
    type Display: GlyphDisplay;

    fn display(&mut self) -> &mut Self::Display;

    /// Put the MCU into its low-power mode and return once the wake source
    /// (the button interrupt) fires. The millisecond timer does not run while
    /// asleep.
    fn sleep_until_wake(&mut self);
}
