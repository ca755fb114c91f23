//! Measuring screen
//!
//! Layout (columns × rows of the 16 × 8 grid):
//!
//! ```text
//! row 0  [batt] NN%              spinner
//! row 2  TT.T [C   HH %          (double-size digits)
//! row 3                RH
//! row 4  ERR: c
//! row 5  CO2 MAX: nnnn  /  INIT: ss
//! row 6  CCCCC (double)  CO2
//! row 7                  PPM
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use embedded_hal::i2c::I2c;
use log::{debug, warn};

use super::{AppState, AppStateKind, Monitor};
use crate::alert::{Alert, AlertTracker};
use crate::board::Board;
use crate::display::{DEGREE_GLYPH, GlyphDisplay, NumberFormat, TextStyle};
use crate::input::ButtonEvent;
use crate::scd4x::Measurement;
use crate::tone::Tone;

/// Glyphs cycled in the top-right cell, one per tick.
pub const SPINNER: [char; 4] = ['<', '=', '>', '='];

/// Pause after each warning beep.
const WARN_BEEP_GAP_MS: u32 = 200;

const ERROR_ROW: u8 = 4;
const STATUS_ROW: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// No reading shown yet; the screen is blank apart from the battery.
    Empty,
    /// Readings shown but still inside the startup grace period.
    Starting,
    /// Max tracking and alerts active.
    Running,
}

/// Per-session measuring state, rebuilt every time Measuring is entered.
#[derive(Debug, Clone)]
pub struct Session {
    entered_ms: u64,
    last_tick_ms: Option<u64>,
    ticks: u32,
    co2_max: u16,
    alerts: AlertTracker,
    phase: Phase,
    error_shown: bool,
    latest: Option<Measurement>,
}

impl Session {
    pub fn new(now_ms: u64) -> Self {
        Self {
            entered_ms: now_ms,
            last_tick_ms: None,
            ticks: 0,
            co2_max: 0,
            alerts: AlertTracker::new(),
            phase: Phase::Empty,
            error_shown: false,
            latest: None,
        }
    }

    /// Highest CO₂ reading since the grace period ended.
    pub fn co2_max(&self) -> u16 {
        self.co2_max
    }

    pub fn alerts(&self) -> &AlertTracker {
        &self.alerts
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn latest(&self) -> Option<Measurement> {
        self.latest
    }

    /// Whether max tracking and alerts are active.
    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    fn in_grace(&self, now_ms: u64, grace_ms: u64) -> bool {
        now_ms.saturating_sub(self.entered_ms) < grace_ms
    }

    fn grace_remaining_secs(&self, now_ms: u64, grace_ms: u64) -> u64 {
        (grace_ms / 1000).saturating_sub(now_ms.saturating_sub(self.entered_ms) / 1000)
    }
}

impl<I2C, D, BTN, B> Monitor<I2C, D, BTN, B>
where
    I2C: I2c,
    D: DelayNs,
    BTN: InputPin,
    B: Board,
{
    pub(super) fn enter_measuring(&mut self) {
        let now = self.board.elapsed_millis();
        self.state = AppState::Measuring;
        self.session = Session::new(now);
        self.battery.invalidate();
        self.board.display().clear();

        if let Err(e) = self.sensor.start_periodic_measurement() {
            warn!("measuring: start failed: {}", e);
            self.board
                .display()
                .write_str(0, 2, "START ERROR", TextStyle::NORMAL);
        }
    }

    pub(super) fn leave_measuring(&mut self) {
        if let Err(e) = self.sensor.stop_periodic_measurement() {
            warn!("measuring: stop failed: {}", e);
        }
    }

    pub(super) fn measuring_step(&mut self, event: Option<ButtonEvent>, now: u64) {
        if event == Some(ButtonEvent::Short) {
            self.transition(AppStateKind::Menu);
            return;
        }
        let due = self
            .session
            .last_tick_ms
            .is_none_or(|last| now.saturating_sub(last) >= self.config.tick_interval_ms);
        if due {
            self.session.last_tick_ms = Some(now);
            self.measuring_tick(now);
        }
    }

    fn measuring_tick(&mut self, now: u64) {
        let grace_ms = self.config.startup_grace_ms;
        if self.session.phase == Phase::Starting {
            let remaining = self.session.grace_remaining_secs(now, grace_ms);
            self.write_countdown(remaining);
        }

        match self.sensor.poll_measurement() {
            Ok(Some(measurement)) => self.show_measurement(measurement, now),
            Ok(None) => {}
            Err(e) => {
                warn!("measuring: {}", e);
                let display = self.board.display();
                display.write_str(0, ERROR_ROW, "ERR:            ", TextStyle::NORMAL);
                display.write_int(
                    5,
                    ERROR_ROW,
                    i64::from(e.status_code()),
                    NumberFormat::HEX,
                    TextStyle::NORMAL,
                );
                self.session.error_shown = true;
            }
        }

        if self.session.ticks % u32::from(self.config.battery_sample_every.max(1)) == 0 {
            let millivolts = self.board.read_millivolts();
            let percent = self.config.battery_percent(millivolts);
            debug!("measuring: battery {} mV ({}%)", millivolts, percent);
            self.battery.show(self.board.display(), percent);
        }

        self.session.ticks = self.session.ticks.wrapping_add(1);
        let spinner = SPINNER[self.session.ticks as usize % SPINNER.len()];
        self.board
            .display()
            .write_glyph(15, 0, spinner, TextStyle::NORMAL);
    }

    fn write_countdown(&mut self, remaining_secs: u64) {
        let display = self.board.display();
        display.write_str(0, STATUS_ROW, "INIT:", TextStyle::NORMAL);
        display.write_int(
            6,
            STATUS_ROW,
            remaining_secs as i64,
            NumberFormat::DECIMAL.width(2),
            TextStyle::NORMAL,
        );
    }

    fn show_measurement(&mut self, m: Measurement, now: u64) {
        let grace_ms = self.config.startup_grace_ms;
        let in_grace = self.session.in_grace(now, grace_ms);

        if self.session.phase == Phase::Empty {
            let display = self.board.display();
            display.write_glyph(4, 3, '.', TextStyle::NORMAL);
            display.write_glyph(7, 2, DEGREE_GLYPH, TextStyle::NORMAL);
            display.write_glyph(8, 2, 'C', TextStyle::NORMAL);
            display.write_glyph(14, 2, '%', TextStyle::NORMAL);
            display.write_str(14, 3, "RH", TextStyle::NORMAL);
            display.write_str(12, 6, "CO2", TextStyle::NORMAL);
            display.write_str(12, 7, "PPM", TextStyle::NORMAL);
            self.session.phase = Phase::Starting;
            if in_grace {
                let remaining = self.session.grace_remaining_secs(now, grace_ms);
                self.write_countdown(remaining);
            }
        }
        if self.session.phase == Phase::Starting && !in_grace {
            self.board
                .display()
                .write_str(0, STATUS_ROW, "CO2 MAX:", TextStyle::NORMAL);
            self.session.phase = Phase::Running;
        }
        if self.session.error_shown {
            self.board
                .display()
                .write_str(0, ERROR_ROW, "                ", TextStyle::NORMAL);
            self.session.error_shown = false;
        }

        let alert = if self.session.phase == Phase::Running {
            self.session.co2_max = self.session.co2_max.max(m.co2_ppm);
            self.board.display().write_int(
                9,
                STATUS_ROW,
                i64::from(self.session.co2_max),
                NumberFormat::DECIMAL,
                TextStyle::NORMAL,
            );
            self.session.alerts.observe(m.co2_ppm)
        } else {
            None
        };

        let style = if self.session.phase == Phase::Starting {
            TextStyle::DOUBLE.light()
        } else {
            TextStyle::DOUBLE
        };
        let display = self.board.display();
        display.write_int(
            1,
            6,
            i64::from(m.co2_ppm),
            NumberFormat::DECIMAL.width(5),
            style,
        );
        write_temperature(display, m, style);
        display.write_int(
            10,
            2,
            i64::from(m.humidity_percent()),
            NumberFormat::DECIMAL.width(2),
            style,
        );
        self.session.latest = Some(m);

        if let Some(alert) = alert {
            self.sound_alert(alert);
        }
    }

    fn sound_alert(&mut self, alert: Alert) {
        match alert {
            Alert::Warning { beeps } => {
                for _ in 0..beeps {
                    self.board.play(Tone::Warn);
                    self.board.delay_ms(WARN_BEEP_GAP_MS);
                }
            }
            Alert::Relax => self.board.play(Tone::Relax),
        }
    }
}

/// Whole degrees at column 0 and tenths at column 5, keeping the sign for
/// readings between -1 and 0 °C.
fn write_temperature<G: GlyphDisplay + ?Sized>(display: &mut G, m: Measurement, style: TextStyle) {
    let whole = m.temperature_whole();
    if whole == 0 && m.temperature_decidegrees < 0 {
        display.write_str(0, 2, "-0", style);
    } else {
        display.write_int(
            0,
            2,
            i64::from(whole),
            NumberFormat::DECIMAL.width(2),
            style,
        );
    }
    display.write_int(
        5,
        2,
        i64::from(m.temperature_tenths()),
        NumberFormat::DECIMAL,
        style,
    );
}

#[cfg(test)]
mod tests {
    use super::super::testing::Rig;
    use super::*;
    use crate::scd4x::Command;
    use alloc::vec::Vec;

    #[test]
    fn first_reading_is_rendered_light_during_grace() {
        let mut rig = Rig::new();
        rig.sensor.set_co2_ppm(812);
        rig.monitor.boot().unwrap();
        rig.run_ms(6000);

        let screen = rig.screen();
        assert!(screen.row_text(6).contains("812"));
        assert!(screen.row_text(2).starts_with("25 0[C 37%"));
        assert_eq!(screen.row_text(3).trim_end(), ".   RH");
        assert!(screen.cell(5, 6).unwrap().style.light);
        assert!(screen.cell(5, 6).unwrap().style.double);
        assert!(screen.row_text(5).starts_with("INIT: 8"));
        assert_eq!(rig.monitor.session().latest().unwrap().co2_ppm, 812);
    }

    #[test]
    fn grace_period_suppresses_max_and_alerts() {
        let mut rig = Rig::new();
        rig.sensor.set_co2_ppm(9000);
        rig.monitor.boot().unwrap();
        rig.run_ms(60_000);
        assert_eq!(rig.monitor.session().co2_max(), 0);
        assert_eq!(rig.monitor.board().tones(), [Tone::Startup]);
        assert!(!rig.monitor.session().is_running());

        rig.run_ms(40_000);
        assert!(rig.monitor.session().is_running());
        assert_eq!(rig.monitor.session().co2_max(), 9000);
        assert_eq!(rig.monitor.board().tones(), [Tone::Startup, Tone::Warn]);
        assert!(rig.screen().row_text(5).starts_with("CO2 MAX: 9000"));
        assert!(!rig.screen().cell(5, 6).unwrap().style.light);
    }

    #[test]
    fn warning_beeps_are_spaced() {
        let mut rig = Rig::new();
        rig.sensor.set_co2_ppm(21_000);
        rig.monitor.boot().unwrap();
        rig.run_ms(100_000);
        assert_eq!(
            rig.monitor.board().tones(),
            [Tone::Startup, Tone::Warn, Tone::Warn, Tone::Warn]
        );
        let gaps = rig
            .monitor
            .board()
            .delays()
            .iter()
            .filter(|ms| **ms == WARN_BEEP_GAP_MS)
            .count();
        assert_eq!(gaps, 3);
        assert_eq!(rig.monitor.session().alerts().last_threshold(), 20_000);
    }

    #[test]
    fn max_tracks_highest_reading() {
        let mut rig = Rig::new();
        rig.sensor.set_co2_ppm(1500);
        rig.monitor.boot().unwrap();
        rig.run_ms(92_000);
        rig.sensor.set_co2_ppm(2500);
        rig.run_ms(5_000);
        rig.sensor.set_co2_ppm(1800);
        rig.run_ms(10_000);
        assert_eq!(rig.monitor.session().co2_max(), 2500);
        assert!(rig.screen().row_text(6).contains("1800"));
        assert!(rig.screen().row_text(5).starts_with("CO2 MAX: 2500"));
    }

    #[test]
    fn transaction_error_is_shown_and_cleared() {
        let mut rig = Rig::booted();
        rig.run_ms(6000);
        rig.sensor.corrupt_response(Command::ReadMeasurement, 0);
        rig.run_ms(5000);
        assert!(rig.screen().row_text(4).starts_with("ERR: 1"));
        assert_eq!(rig.monitor.state(), AppStateKind::Measuring);

        rig.run_ms(5000);
        assert_eq!(rig.screen().row_text(4).trim(), "");
    }

    #[test]
    fn not_ready_is_not_an_error() {
        let mut rig = Rig::booted();
        rig.run_ms(3000);
        assert!(!rig.screen().contains("ERR"));
        assert!(rig.monitor.session().latest().is_none());
    }

    #[test]
    fn battery_sampled_every_tenth_tick() {
        let mut rig = Rig::booted();
        let at_boot = rig.monitor.board().battery_reads();
        rig.run_ms(10_500);
        assert_eq!(rig.monitor.board().battery_reads(), at_boot + 2);
        assert_eq!(rig.screen().text_at(2, 0, 4), "100%");
        assert!(rig.screen().bitmap_at(0, 0).is_some());
    }

    #[test]
    fn spinner_advances_each_tick() {
        let mut rig = Rig::booted();
        let mut seen = Vec::new();
        for _ in 0..4 {
            rig.run_ms(1000);
            seen.push(rig.screen().cell(15, 0).unwrap().ch);
        }
        assert_eq!(seen, ['=', '>', '=', '<']);
    }

    #[test]
    fn negative_fraction_keeps_sign() {
        let mut rig = Rig::new();
        // raw 0x41A0 -> -0.139 °C
        rig.sensor.set_raw_climate(0x41A0, 0);
        rig.monitor.boot().unwrap();
        rig.run_ms(6000);
        assert!(rig.screen().row_text(2).starts_with("-0 1"));
    }
}
