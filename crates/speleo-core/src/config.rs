//! Device configuration
//!
//! Timing windows, battery range and calibration constants. Everything is
//! fixed at build time; the only persisted settings live inside the sensor.

/// Firmware version shown on the boot splash.
pub const FIRMWARE_VERSION: &str = "V34 - 2025-10-26";

/// Nominal interval between two periodic measurements of the SCD4x.
pub const MEASUREMENT_INTERVAL_SECS: u8 = 5;

/// Runtime configuration of the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Battery voltage mapped to 0 %.
    pub battery_min_mv: u16,
    /// Battery voltage mapped to 100 %.
    pub battery_max_mv: u16,
    /// Period of the measuring screen tick.
    pub tick_interval_ms: u64,
    /// Battery is sampled on every n-th tick.
    pub battery_sample_every: u8,
    /// Time after entering Measuring before max/alert tracking starts.
    pub startup_grace_ms: u64,
    /// Menu falls back to Measuring after this long without input.
    pub menu_timeout_ms: u64,
    /// The forced-recalibration prompt cancels itself after this long.
    pub recalibration_timeout_ms: u64,
    /// Fresh-air reference used for forced recalibration.
    pub recalibration_reference_ppm: u16,
    /// Altitude editor increment.
    pub altitude_step_m: u16,
    /// Altitude editor wraps to zero above this value.
    pub altitude_max_m: u16,
    /// After a wake interrupt, a long press must arrive within this window.
    pub wake_confirm_window_ms: u64,
    /// How long the boot splash stays on screen.
    pub splash_ms: u32,
    /// How long action results (self-test, recalibration) stay on screen.
    pub result_display_ms: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            battery_min_mv: 2800,
            battery_max_mv: 3700,
            tick_interval_ms: 1000,
            battery_sample_every: 10,
            startup_grace_ms: 90_000,
            menu_timeout_ms: 10_000,
            recalibration_timeout_ms: 5_000,
            recalibration_reference_ppm: 420,
            altitude_step_m: 100,
            altitude_max_m: 3000,
            wake_confirm_window_ms: 2_000,
            splash_ms: 3_000,
            result_display_ms: 2_000,
        }
    }
}

impl MonitorConfig {
    /// Converts a battery voltage into a percentage, clamping to the
    /// configured range.
    pub fn battery_percent(&self, millivolts: u16) -> u8 {
        let span = self.battery_max_mv.saturating_sub(self.battery_min_mv);
        if span == 0 {
            return 100;
        }
        let clamped = millivolts.clamp(self.battery_min_mv, self.battery_max_mv);
        ((u32::from(clamped - self.battery_min_mv) * 100) / u32::from(span)) as u8
    }
}
