//! CO₂ alert hysteresis
//!
//! The tracker remembers the last threshold the reading crossed, always a
//! multiple of [`THRESHOLD_STEP_PPM`]. Rising more than one step above it
//! raises a warning and moves the threshold up to the reading's step. The
//! threshold only comes back down one step at a time, after the reading has
//! stayed more than one step below it for [`RELAX_HOLD_SECS`].

use log::info;

use crate::config::MEASUREMENT_INTERVAL_SECS;

pub const THRESHOLD_STEP_PPM: u16 = 2000;
/// Threshold after a session reset.
pub const BASE_THRESHOLD_PPM: u16 = 2000;
/// The threshold is never lowered below this value by relaxing.
const RELAX_FLOOR_PPM: u16 = 6000;
pub const RELAX_HOLD_SECS: u8 = 60;

/// Severity boundaries; each one reached adds one beep.
const SEVERITY_STEPS_PPM: [u16; 3] = [10_000, 20_000, 24_000];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alert {
    /// Reading jumped above the next threshold. `beeps` is 1 to 4.
    Warning { beeps: u8 },
    /// Threshold lowered by one step.
    Relax,
}

/// Number of warning beeps for a reading.
pub fn warning_beeps(co2_ppm: u16) -> u8 {
    1 + SEVERITY_STEPS_PPM
        .iter()
        .filter(|step| co2_ppm >= **step)
        .count() as u8
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertTracker {
    last_threshold: u16,
    below_threshold_secs: u8,
}

impl Default for AlertTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertTracker {
    pub const fn new() -> Self {
        Self {
            last_threshold: BASE_THRESHOLD_PPM,
            below_threshold_secs: 0,
        }
    }

    pub fn last_threshold(&self) -> u16 {
        self.last_threshold
    }

    pub fn below_threshold_secs(&self) -> u8 {
        self.below_threshold_secs
    }

    /// Start of a measuring session.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Feed one reading; returns the alert to sound, if any.
    pub fn observe(&mut self, co2_ppm: u16) -> Option<Alert> {
        let upper = u32::from(self.last_threshold) + u32::from(THRESHOLD_STEP_PPM);
        let lower = self.last_threshold.saturating_sub(THRESHOLD_STEP_PPM);

        if u32::from(co2_ppm) > upper {
            let beeps = warning_beeps(co2_ppm);
            self.last_threshold = co2_ppm - co2_ppm % THRESHOLD_STEP_PPM;
            info!(
                "alert: {} ppm, threshold now {} ({} beeps)",
                co2_ppm, self.last_threshold, beeps
            );
            return Some(Alert::Warning { beeps });
        }

        if co2_ppm < lower {
            if self.below_threshold_secs == 0 {
                return None;
            }
            self.below_threshold_secs = self
                .below_threshold_secs
                .saturating_sub(MEASUREMENT_INTERVAL_SECS);
            if self.below_threshold_secs == 0 && self.last_threshold >= RELAX_FLOOR_PPM {
                self.last_threshold -= THRESHOLD_STEP_PPM;
                self.below_threshold_secs = RELAX_HOLD_SECS;
                info!("alert: relaxed, threshold now {}", self.last_threshold);
                return Some(Alert::Relax);
            }
            return None;
        }

        self.below_threshold_secs = RELAX_HOLD_SECS;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn escalation_boundary_is_strict() {
        let mut t = AlertTracker::new();
        assert_eq!(t.observe(4000), None);
        assert_eq!(t.last_threshold(), 2000);
        assert_eq!(t.observe(4001), Some(Alert::Warning { beeps: 1 }));
        assert_eq!(t.last_threshold(), 4000);
    }

    #[test]
    fn severity_levels() {
        assert_eq!(warning_beeps(6001), 1);
        assert_eq!(warning_beeps(9999), 1);
        assert_eq!(warning_beeps(10_000), 2);
        assert_eq!(warning_beeps(19_999), 2);
        assert_eq!(warning_beeps(20_000), 3);
        assert_eq!(warning_beeps(24_000), 4);
        assert_eq!(warning_beeps(u16::MAX), 4);
    }

    #[test]
    fn threshold_rounds_down_to_step() {
        let mut t = AlertTracker::new();
        assert_eq!(t.observe(13_500), Some(Alert::Warning { beeps: 2 }));
        assert_eq!(t.last_threshold(), 12_000);
        assert_eq!(t.observe(14_000), None);
        assert_eq!(t.observe(14_001), Some(Alert::Warning { beeps: 2 }));
        assert_eq!(t.last_threshold(), 14_000);
    }

    #[test]
    fn threshold_stays_a_multiple_of_the_step() {
        let mut t = AlertTracker::new();
        for reading in (0..30_000u16).step_by(777).chain((0..30_000u16).rev().step_by(333)) {
            t.observe(reading);
            assert_eq!(t.last_threshold() % THRESHOLD_STEP_PPM, 0);
            assert!(t.last_threshold() >= BASE_THRESHOLD_PPM);
        }
    }

    #[test]
    fn relaxes_one_step_after_a_minute_below() {
        let mut t = AlertTracker::new();
        assert_eq!(t.observe(7000), Some(Alert::Warning { beeps: 1 }));
        assert_eq!(t.last_threshold(), 6000);
        // a reading inside the band arms the counter
        assert_eq!(t.observe(6500), None);
        assert_eq!(t.below_threshold_secs(), 60);

        let alerts: Vec<_> = (0..12).filter_map(|_| t.observe(3000)).collect();
        assert_eq!(alerts, [Alert::Relax]);
        assert_eq!(t.last_threshold(), 4000);
        assert_eq!(t.below_threshold_secs(), 60);

        // 3000 is no longer more than a step below 4000: counter refills
        assert_eq!(t.observe(3000), None);
        assert_eq!(t.last_threshold(), 4000);
    }

    #[test]
    fn no_relax_without_a_reading_in_band() {
        let mut t = AlertTracker::new();
        t.observe(9000);
        for _ in 0..50 {
            assert_eq!(t.observe(1000), None);
        }
        assert_eq!(t.last_threshold(), 8000);
    }

    #[test]
    fn never_relaxes_below_floor() {
        let mut t = AlertTracker::new();
        t.observe(5000);
        assert_eq!(t.last_threshold(), 4000);
        t.observe(4500);
        for _ in 0..30 {
            assert_eq!(t.observe(0), None);
        }
        assert_eq!(t.last_threshold(), 4000);
    }

    #[test]
    fn reset_restores_session_defaults() {
        let mut t = AlertTracker::new();
        t.observe(25_000);
        t.observe(25_000);
        t.reset();
        assert_eq!(t, AlertTracker::new());
        assert_eq!(t.last_threshold(), 2000);
        assert_eq!(t.below_threshold_secs(), 0);
    }
}
