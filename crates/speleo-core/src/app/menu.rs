//! Settings menu
//!
//! ```text
//! row 0   INTV: 5 SEC          (informational)
//! row 1   AUTO-CALIB:  ON
//! row 2   FORCE CALIBRATE
//! row 3   ALTITUDE:  1200M
//! row 4   SELF TEST
//! row 5   POWER OFF
//! row 6  *BACK
//! ```
//!
//! A short press moves the `*` cursor, a long press activates the row.
//! [`Menu::handle`] only updates the menu's own state and returns the
//! [`MenuAction`] the monitor has to carry out; all sensor traffic and
//! drawing happens in [`Monitor`].

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use embedded_hal::i2c::I2c;
use log::{info, warn};

use super::{AppState, AppStateKind, Monitor};
use crate::board::Board;
use crate::config::{MEASUREMENT_INTERVAL_SECS, MonitorConfig};
use crate::display::{GlyphDisplay, NumberFormat, TextStyle};
use crate::input::ButtonEvent;
use crate::power;
use crate::scd4x::{Recalibration, SelfTestOutcome};

/// Number of menu rows, including the informational first row.
pub const MENU_ROWS: u8 = 7;
/// Row the cursor starts on.
pub const MENU_BACK: u8 = 6;

const ROW_INTERVAL: u8 = 0;
const ROW_AUTO_CALIBRATION: u8 = 1;
const ROW_FORCE_CALIBRATION: u8 = 2;
const ROW_ALTITUDE: u8 = 3;
const ROW_SELF_TEST: u8 = 4;
const ROW_POWER_OFF: u8 = 5;

const ASC_COL: u8 = 13;
const ALTITUDE_COL: u8 = 11;
const CONFIRM_ROW: u8 = 5;
const CANCEL_ROW: u8 = 6;

/// Pause before a blocking maintenance action starts.
const ACTION_LEAD_IN_MS: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuMode {
    /// Cursor navigation.
    Browse,
    /// Altitude editor open with the value not yet written.
    EditAltitude { metres: u16 },
    /// Forced-recalibration prompt. `proceed` is the highlighted choice;
    /// `since_ms` is the last input on the prompt.
    ConfirmRecalibration { proceed: bool, since_ms: u64 },
}

/// What the monitor has to do in response to a menu step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum MenuAction {
    MoveCursor { from: u8, to: u8 },
    Exit,
    ToggleAutoCalibration,
    ShowAltitude(u16),
    SaveAltitude(u16),
    OpenRecalibration,
    SelectRecalibration(bool),
    CancelRecalibration,
    Recalibrate,
    SelfTest,
    PowerOff,
}

#[derive(Debug, Clone)]
pub(super) struct Menu {
    cursor: u8,
    mode: MenuMode,
    last_input_ms: u64,
    /// Auto-calibration flag as last read back; `None` after a failed read.
    auto_calibration: Option<bool>,
    altitude_m: Option<u16>,
}

impl Menu {
    pub(super) fn new(now_ms: u64) -> Self {
        Self {
            cursor: MENU_BACK,
            mode: MenuMode::Browse,
            last_input_ms: now_ms,
            auto_calibration: None,
            altitude_m: None,
        }
    }

    pub(super) fn mode(&self) -> MenuMode {
        self.mode
    }

    pub(super) fn cursor(&self) -> u8 {
        self.cursor
    }

    pub(super) fn handle(
        &mut self,
        event: Option<ButtonEvent>,
        now_ms: u64,
        config: &MonitorConfig,
    ) -> Option<MenuAction> {
        if event.is_some() {
            self.last_input_ms = now_ms;
        }
        match (self.mode, event) {
            (MenuMode::Browse, None) => {
                (now_ms.saturating_sub(self.last_input_ms) >= config.menu_timeout_ms)
                    .then_some(MenuAction::Exit)
            }
            (MenuMode::Browse, Some(ButtonEvent::Short)) => {
                let from = self.cursor;
                self.cursor = if from + 1 >= MENU_ROWS {
                    ROW_INTERVAL + 1
                } else {
                    from + 1
                };
                Some(MenuAction::MoveCursor {
                    from,
                    to: self.cursor,
                })
            }
            (MenuMode::Browse, Some(ButtonEvent::Long)) => self.activate(now_ms),

            (MenuMode::EditAltitude { .. }, None) => None,
            (MenuMode::EditAltitude { metres }, Some(ButtonEvent::Short)) => {
                let next = metres.saturating_add(config.altitude_step_m);
                let next = if next > config.altitude_max_m { 0 } else { next };
                self.mode = MenuMode::EditAltitude { metres: next };
                Some(MenuAction::ShowAltitude(next))
            }
            (MenuMode::EditAltitude { metres }, Some(ButtonEvent::Long)) => {
                self.mode = MenuMode::Browse;
                Some(MenuAction::SaveAltitude(metres))
            }

            (MenuMode::ConfirmRecalibration { since_ms, .. }, None) => {
                if now_ms.saturating_sub(since_ms) >= config.recalibration_timeout_ms {
                    self.mode = MenuMode::Browse;
                    Some(MenuAction::CancelRecalibration)
                } else {
                    None
                }
            }
            (MenuMode::ConfirmRecalibration { proceed, .. }, Some(ButtonEvent::Short)) => {
                self.mode = MenuMode::ConfirmRecalibration {
                    proceed: !proceed,
                    since_ms: now_ms,
                };
                Some(MenuAction::SelectRecalibration(!proceed))
            }
            (MenuMode::ConfirmRecalibration { proceed, .. }, Some(ButtonEvent::Long)) => {
                self.mode = MenuMode::Browse;
                Some(if proceed {
                    MenuAction::Recalibrate
                } else {
                    MenuAction::CancelRecalibration
                })
            }
        }
    }

    fn activate(&mut self, now_ms: u64) -> Option<MenuAction> {
        match self.cursor {
            ROW_AUTO_CALIBRATION => Some(MenuAction::ToggleAutoCalibration),
            ROW_FORCE_CALIBRATION => {
                self.mode = MenuMode::ConfirmRecalibration {
                    proceed: false,
                    since_ms: now_ms,
                };
                Some(MenuAction::OpenRecalibration)
            }
            ROW_ALTITUDE => {
                let metres = self.altitude_m.unwrap_or(0);
                self.mode = MenuMode::EditAltitude { metres };
                Some(MenuAction::ShowAltitude(metres))
            }
            ROW_SELF_TEST => Some(MenuAction::SelfTest),
            ROW_POWER_OFF => Some(MenuAction::PowerOff),
            MENU_BACK => Some(MenuAction::Exit),
            _ => None,
        }
    }
}

impl<I2C, D, BTN, B> Monitor<I2C, D, BTN, B>
where
    I2C: I2c,
    D: DelayNs,
    BTN: InputPin,
    B: Board,
{
    pub(super) fn enter_menu(&mut self) {
        let now = self.board.elapsed_millis();
        let mut menu = Menu::new(now);
        menu.auto_calibration = match self.sensor.automatic_self_calibration() {
            Ok(enabled) => Some(enabled),
            Err(e) => {
                warn!("menu: auto-calibration read failed: {}", e);
                None
            }
        };
        menu.altitude_m = match self.sensor.sensor_altitude() {
            Ok(metres) => Some(metres),
            Err(e) => {
                warn!("menu: altitude read failed: {}", e);
                None
            }
        };
        let auto_calibration = menu.auto_calibration;
        let altitude = menu.altitude_m;
        self.state = AppState::Menu(menu);

        let display = self.board.display();
        display.clear();
        let col = display.write_str(1, 0, "INTV:", TextStyle::NORMAL);
        let col = display.write_int(
            col + 1,
            0,
            i64::from(MEASUREMENT_INTERVAL_SECS),
            NumberFormat::DECIMAL,
            TextStyle::NORMAL,
        );
        display.write_str(col, 0, " SEC", TextStyle::NORMAL);
        display.write_str(1, ROW_AUTO_CALIBRATION, "AUTO-CALIB:", TextStyle::NORMAL);
        display.write_str(1, ROW_FORCE_CALIBRATION, "FORCE CALIBRATE", TextStyle::NORMAL);
        display.write_str(1, ROW_ALTITUDE, "ALTITUDE:", TextStyle::NORMAL);
        display.write_glyph(15, ROW_ALTITUDE, 'M', TextStyle::NORMAL);
        display.write_str(1, ROW_SELF_TEST, "SELF TEST", TextStyle::NORMAL);
        display.write_str(1, ROW_POWER_OFF, "POWER OFF", TextStyle::NORMAL);
        display.write_str(1, MENU_BACK, "BACK", TextStyle::NORMAL);
        display.write_glyph(0, MENU_BACK, '*', TextStyle::NORMAL);
        self.show_auto_calibration(auto_calibration);
        self.show_altitude(altitude, TextStyle::NORMAL);
    }

    pub(super) fn menu_step(&mut self, event: Option<ButtonEvent>, now: u64) {
        let AppState::Menu(menu) = &mut self.state else {
            return;
        };
        let Some(action) = menu.handle(event, now, &self.config) else {
            return;
        };
        info!("menu: {:?}", action);

        match action {
            MenuAction::MoveCursor { from, to } => {
                let display = self.board.display();
                display.write_glyph(0, from, ' ', TextStyle::NORMAL);
                display.write_glyph(0, to, '*', TextStyle::NORMAL);
            }
            MenuAction::Exit => self.transition(AppStateKind::Measuring),
            MenuAction::ToggleAutoCalibration => self.toggle_auto_calibration(),
            MenuAction::ShowAltitude(metres) => {
                self.show_altitude(Some(metres), TextStyle::NORMAL.inverted());
            }
            MenuAction::SaveAltitude(metres) => self.save_altitude(metres),
            MenuAction::OpenRecalibration => self.show_recalibration_prompt(),
            MenuAction::SelectRecalibration(proceed) => self.show_recalibration_choice(proceed),
            MenuAction::CancelRecalibration => self.enter_menu(),
            MenuAction::Recalibrate => self.recalibrate(),
            MenuAction::SelfTest => self.self_test(),
            MenuAction::PowerOff => {
                power::power_off(
                    &mut self.sensor,
                    &mut self.board,
                    &mut self.button,
                    &self.config,
                );
                self.transition(AppStateKind::Measuring);
            }
        }
    }

    fn menu_mut(&mut self) -> Option<&mut Menu> {
        match &mut self.state {
            AppState::Menu(menu) => Some(menu),
            AppState::Measuring => None,
        }
    }

    fn show_auto_calibration(&mut self, enabled: Option<bool>) {
        let text = match enabled {
            Some(true) => "ON ",
            Some(false) => "OFF",
            None => "???",
        };
        self.board
            .display()
            .write_str(ASC_COL, ROW_AUTO_CALIBRATION, text, TextStyle::NORMAL);
    }

    fn show_altitude(&mut self, metres: Option<u16>, style: TextStyle) {
        let display = self.board.display();
        match metres {
            Some(metres) => {
                display.write_int(
                    ALTITUDE_COL,
                    ROW_ALTITUDE,
                    i64::from(metres),
                    NumberFormat::DECIMAL.width(4),
                    style,
                );
            }
            None => {
                display.write_str(ALTITUDE_COL, ROW_ALTITUDE, "????", style);
            }
        }
    }

    fn toggle_auto_calibration(&mut self) {
        let current = self.menu_mut().and_then(|menu| menu.auto_calibration);
        let target = current == Some(false);
        if let Err(e) = self.sensor.set_automatic_self_calibration(target) {
            warn!("menu: auto-calibration write failed: {}", e);
        }

        let read_back = match self.sensor.automatic_self_calibration() {
            Ok(enabled) => Some(enabled),
            Err(e) => {
                warn!("menu: auto-calibration read failed: {}", e);
                None
            }
        };
        if let Some(menu) = self.menu_mut() {
            menu.auto_calibration = read_back;
        }
        self.show_auto_calibration(read_back);

        if read_back.is_some()
            && let Err(e) = self.sensor.persist_settings()
        {
            warn!("menu: persist failed: {}", e);
        }
    }

    fn save_altitude(&mut self, metres: u16) {
        let result = self
            .sensor
            .set_sensor_altitude(metres)
            .and_then(|()| self.sensor.persist_settings());
        let saved = match result {
            Ok(()) => Some(metres),
            Err(e) => {
                warn!("menu: altitude write failed: {}", e);
                None
            }
        };
        if let Some(menu) = self.menu_mut() {
            menu.altitude_m = saved;
        }
        self.show_altitude(saved, TextStyle::NORMAL);
    }

    fn show_recalibration_prompt(&mut self) {
        let reference = self.config.recalibration_reference_ppm;
        let display = self.board.display();
        display.clear();
        display.write_str(0, 0, "==CALIBRATION==", TextStyle::NORMAL);
        display.write_str(0, 2, "FORCE CALIBRATE", TextStyle::NORMAL);
        display.write_str(0, 3, "TO ", TextStyle::NORMAL);
        let col = display.write_int(
            3,
            3,
            i64::from(reference),
            NumberFormat::DECIMAL,
            TextStyle::NORMAL,
        );
        display.write_str(col, 3, " PPM CO2 ?", TextStyle::NORMAL);
        display.write_str(1, CONFIRM_ROW, "CONTINUE", TextStyle::NORMAL);
        display.write_str(1, CANCEL_ROW, "CANCEL", TextStyle::NORMAL);
        self.show_recalibration_choice(false);
    }

    fn show_recalibration_choice(&mut self, proceed: bool) {
        let (marked, unmarked) = if proceed {
            (CONFIRM_ROW, CANCEL_ROW)
        } else {
            (CANCEL_ROW, CONFIRM_ROW)
        };
        let display = self.board.display();
        display.write_glyph(0, marked, '*', TextStyle::NORMAL);
        display.write_glyph(0, unmarked, ' ', TextStyle::NORMAL);
    }

    fn recalibrate(&mut self) {
        let reference = self.config.recalibration_reference_ppm;
        let display = self.board.display();
        display.write_str(0, CONFIRM_ROW, "SAVING...       ", TextStyle::NORMAL);
        display.write_str(0, CANCEL_ROW, "                ", TextStyle::NORMAL);
        self.board.delay_ms(ACTION_LEAD_IN_MS);

        let outcome = self.sensor.perform_forced_recalibration(reference);
        let display = self.board.display();
        match outcome {
            Ok(Recalibration::Corrected(correction)) => {
                info!("menu: recalibrated, correction {} ppm", correction);
                display.write_str(0, CANCEL_ROW, "DONE:", TextStyle::NORMAL);
                display.write_int(
                    6,
                    CANCEL_ROW,
                    i64::from(correction),
                    NumberFormat::DECIMAL,
                    TextStyle::NORMAL,
                );
            }
            Ok(Recalibration::Failed) => {
                warn!("menu: sensor rejected recalibration");
                display.write_str(0, CANCEL_ROW, "FAILED", TextStyle::NORMAL);
            }
            Err(e) => {
                warn!("menu: recalibration failed: {}", e);
                display.write_str(0, CANCEL_ROW, "ERR:", TextStyle::NORMAL);
                display.write_int(
                    5,
                    CANCEL_ROW,
                    i64::from(e.status_code()),
                    NumberFormat::HEX,
                    TextStyle::NORMAL,
                );
            }
        }
        self.board.delay_ms(self.config.result_display_ms);
        self.enter_menu();
    }

    fn self_test(&mut self) {
        let display = self.board.display();
        display.clear();
        display.write_str(0, 0, "== SELF TEST ==", TextStyle::NORMAL);
        self.board.delay_ms(ACTION_LEAD_IN_MS);
        self.board
            .display()
            .write_str(0, 2, "TESTING...", TextStyle::NORMAL);

        let outcome = self.sensor.perform_self_test();
        let display = self.board.display();
        display.write_str(0, 3, "DONE.", TextStyle::NORMAL);
        display.write_str(0, 5, "STATUS:", TextStyle::NORMAL);
        match outcome {
            Ok(SelfTestOutcome::Passed) => {
                info!("menu: self-test passed");
                display.write_str(8, 5, "OK", TextStyle::NORMAL);
            }
            Ok(SelfTestOutcome::Fault(code)) => {
                warn!("menu: self-test fault {:#06x}", code);
                display.write_str(8, 5, "ERR", TextStyle::NORMAL);
                display.write_int(
                    12,
                    5,
                    i64::from(code),
                    NumberFormat::DECIMAL,
                    TextStyle::NORMAL,
                );
            }
            // No verdict from the sensor; kept apart from fault codes.
            Err(e) => {
                warn!("menu: self-test transaction failed: {}", e);
                display.write_str(8, 5, "COMM ERR", TextStyle::NORMAL);
            }
        }
        self.board.delay_ms(self.config.result_display_ms);
        self.enter_menu();
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Rig;
    use super::*;
    use crate::mock::JournalEntry;
    use crate::scd4x::Command;
    use crate::tone::Tone;

    fn open_menu(rig: &mut Rig) {
        rig.short_press();
        assert_eq!(rig.monitor.state(), AppStateKind::Menu);
    }

    /// Short presses until the cursor is on `row`.
    fn move_to(rig: &mut Rig, row: u8) {
        while rig.monitor.menu_cursor() != Some(row) {
            rig.short_press();
        }
    }

    fn last_screens(rig: &Rig) -> alloc::string::String {
        rig.monitor.board().screen_history().concat()
    }

    #[test]
    fn cursor_wraps_past_info_row() {
        let config = MonitorConfig::default();
        let mut menu = Menu::new(0);
        let mut rows = alloc::vec::Vec::new();
        for t in 1..=7 {
            match menu.handle(Some(ButtonEvent::Short), t, &config) {
                Some(MenuAction::MoveCursor { to, .. }) => rows.push(to),
                other => panic!("unexpected {:?}", other),
            }
        }
        assert_eq!(rows, [1, 2, 3, 4, 5, 6, 1]);
    }

    #[test]
    fn browse_times_out_after_inactivity() {
        let config = MonitorConfig::default();
        let mut menu = Menu::new(1_000);
        assert_eq!(menu.handle(None, 10_999, &config), None);
        menu.handle(Some(ButtonEvent::Short), 5_000, &config);
        assert_eq!(menu.handle(None, 14_999, &config), None);
        assert_eq!(menu.handle(None, 15_000, &config), Some(MenuAction::Exit));
    }

    #[test]
    fn altitude_editor_wraps_to_zero() {
        let config = MonitorConfig::default();
        let mut menu = Menu::new(0);
        menu.cursor = ROW_ALTITUDE;
        menu.altitude_m = Some(2900);
        assert_eq!(
            menu.handle(Some(ButtonEvent::Long), 1, &config),
            Some(MenuAction::ShowAltitude(2900))
        );
        assert_eq!(
            menu.handle(Some(ButtonEvent::Short), 2, &config),
            Some(MenuAction::ShowAltitude(3000))
        );
        assert_eq!(
            menu.handle(Some(ButtonEvent::Short), 3, &config),
            Some(MenuAction::ShowAltitude(0))
        );
        // no timeout while editing
        assert_eq!(menu.handle(None, 60_000, &config), None);
        assert_eq!(
            menu.handle(Some(ButtonEvent::Long), 60_001, &config),
            Some(MenuAction::SaveAltitude(0))
        );
        assert_eq!(menu.mode(), MenuMode::Browse);
    }

    #[test]
    fn info_row_does_nothing() {
        let config = MonitorConfig::default();
        let mut menu = Menu::new(0);
        menu.cursor = ROW_INTERVAL;
        assert_eq!(menu.handle(Some(ButtonEvent::Long), 1, &config), None);
    }

    #[test]
    fn menu_screen_layout() {
        let mut rig = Rig::booted();
        open_menu(&mut rig);
        let screen = rig.screen();
        assert_eq!(screen.row_text(0).trim_end(), " INTV: 5 SEC");
        assert_eq!(screen.row_text(1), " AUTO-CALIB: ON ");
        assert_eq!(screen.row_text(3), " ALTITUDE:    0M");
        assert_eq!(screen.row_text(6).trim_end(), "*BACK");
        assert_eq!(rig.monitor.menu_cursor(), Some(MENU_BACK));
    }

    #[test]
    fn menu_returns_to_measuring_after_timeout() {
        let mut rig = Rig::booted();
        open_menu(&mut rig);
        rig.run_ms(9_000);
        assert_eq!(rig.monitor.state(), AppStateKind::Menu);
        rig.run_ms(1_500);
        assert_eq!(rig.monitor.state(), AppStateKind::Measuring);
        assert!(rig.sensor.is_measuring());
    }

    #[test]
    fn back_restarts_measuring_with_fresh_session() {
        let mut rig = Rig::booted();
        rig.run_ms(6_000);
        assert!(rig.monitor.session().latest().is_some());
        open_menu(&mut rig);
        rig.long_press();
        assert_eq!(rig.monitor.state(), AppStateKind::Measuring);
        assert!(rig.sensor.is_measuring());
        assert!(rig.monitor.session().latest().is_none());
        assert_eq!(rig.monitor.session().alerts().last_threshold(), 2000);
    }

    #[test]
    fn toggles_auto_calibration_and_persists() {
        let mut rig = Rig::booted();
        open_menu(&mut rig);
        move_to(&mut rig, ROW_AUTO_CALIBRATION);
        rig.long_press();
        assert!(!rig.sensor.asc_enabled());
        assert_eq!(rig.screen().text_at(ASC_COL, 1, 3), "OFF");
        assert_eq!(rig.sensor.persist_count(), 1);

        rig.long_press();
        assert!(rig.sensor.asc_enabled());
        assert_eq!(rig.screen().text_at(ASC_COL, 1, 3), "ON ");
        assert_eq!(rig.sensor.persist_count(), 2);
    }

    #[test]
    fn unreadable_auto_calibration_is_not_persisted() {
        let mut rig = Rig::booted();
        open_menu(&mut rig);
        move_to(&mut rig, ROW_AUTO_CALIBRATION);
        rig.sensor
            .corrupt_response(Command::GetAutomaticSelfCalibration, 0);
        rig.long_press();
        assert_eq!(rig.screen().text_at(ASC_COL, 1, 3), "???");
        assert_eq!(rig.sensor.persist_count(), 0);
    }

    #[test]
    fn altitude_is_edited_and_saved() {
        let mut rig = Rig::booted();
        open_menu(&mut rig);
        move_to(&mut rig, ROW_ALTITUDE);
        rig.long_press();
        assert_eq!(
            rig.monitor.menu_mode(),
            Some(MenuMode::EditAltitude { metres: 0 })
        );
        rig.short_press();
        rig.short_press();
        assert_eq!(rig.screen().text_at(ALTITUDE_COL, 3, 4), " 200");
        assert!(rig.screen().cell(13, 3).unwrap().style.inverted);
        assert_eq!(rig.sensor.altitude(), 0);

        rig.long_press();
        assert_eq!(rig.sensor.altitude(), 200);
        assert_eq!(rig.sensor.persist_count(), 1);
        assert_eq!(rig.monitor.menu_mode(), Some(MenuMode::Browse));
        assert!(!rig.screen().cell(13, 3).unwrap().style.inverted);
    }

    #[test]
    fn recalibration_defaults_to_cancel() {
        let mut rig = Rig::booted();
        open_menu(&mut rig);
        move_to(&mut rig, ROW_FORCE_CALIBRATION);
        rig.long_press();
        assert!(rig.screen().contains("TO 420 PPM CO2 ?"));
        assert_eq!(rig.screen().row_text(CANCEL_ROW).trim_end(), "*CANCEL");

        rig.long_press();
        assert_eq!(rig.monitor.menu_mode(), Some(MenuMode::Browse));
        assert!(rig.screen().contains("*BACK"));
        assert!(
            !rig.journal
                .commands()
                .contains(&Command::PerformForcedRecalibration)
        );
    }

    #[test]
    fn confirmed_recalibration_shows_correction() {
        let mut rig = Rig::booted();
        rig.sensor.set_co2_ppm(500);
        open_menu(&mut rig);
        move_to(&mut rig, ROW_FORCE_CALIBRATION);
        rig.long_press();
        rig.short_press();
        assert_eq!(rig.screen().row_text(CONFIRM_ROW).trim_end(), "*CONTINUE");
        rig.long_press();

        assert!(last_screens(&rig).contains("DONE: -80"));
        assert_eq!(rig.monitor.state(), AppStateKind::Menu);
        assert_eq!(rig.monitor.menu_mode(), Some(MenuMode::Browse));
        assert!(rig.monitor.board().delays().contains(&ACTION_LEAD_IN_MS));
    }

    #[test]
    fn rejected_recalibration_shows_failed() {
        let mut rig = Rig::booted();
        rig.sensor.set_recalibration_fails(true);
        open_menu(&mut rig);
        move_to(&mut rig, ROW_FORCE_CALIBRATION);
        rig.long_press();
        rig.short_press();
        rig.long_press();
        assert!(last_screens(&rig).contains("FAILED"));
    }

    #[test]
    fn recalibration_prompt_times_out() {
        let mut rig = Rig::booted();
        open_menu(&mut rig);
        move_to(&mut rig, ROW_FORCE_CALIBRATION);
        rig.long_press();
        rig.run_ms(5_500);
        assert_eq!(rig.monitor.state(), AppStateKind::Menu);
        assert_eq!(rig.monitor.menu_mode(), Some(MenuMode::Browse));
        assert_eq!(rig.monitor.menu_cursor(), Some(MENU_BACK));
    }

    #[test]
    fn self_test_pass_and_fault() {
        let mut rig = Rig::booted();
        open_menu(&mut rig);
        move_to(&mut rig, ROW_SELF_TEST);
        rig.long_press();
        assert!(last_screens(&rig).contains("STATUS: OK"));
        assert_eq!(rig.monitor.state(), AppStateKind::Menu);

        rig.sensor.set_self_test_result(0x0042);
        move_to(&mut rig, ROW_SELF_TEST);
        rig.long_press();
        assert!(last_screens(&rig).contains("STATUS: ERR 66"));
    }

    #[test]
    fn self_test_transaction_error_is_not_a_fault_code() {
        let mut rig = Rig::booted();
        open_menu(&mut rig);
        move_to(&mut rig, ROW_SELF_TEST);
        rig.sensor.corrupt_response(Command::PerformSelfTest, 0);
        rig.long_press();
        let screens = last_screens(&rig);
        assert!(screens.contains("STATUS: COMM ERR"));
        assert!(!screens.contains("STATUS: ERR"));
        assert_eq!(rig.monitor.state(), AppStateKind::Menu);
    }

    #[test]
    fn power_off_from_menu_resumes_measuring() {
        let mut rig = Rig::booted();
        open_menu(&mut rig);
        move_to(&mut rig, ROW_POWER_OFF);
        let wake_at = rig.clock.now_ms() + 10_000;
        rig.monitor.board_mut().script_wake_at(wake_at);
        rig.button.press(wake_at, 1_500);
        rig.long_press();

        assert_eq!(rig.monitor.state(), AppStateKind::Measuring);
        assert!(rig.sensor.is_measuring());
        assert_eq!(rig.monitor.board().sleeps(), 1);
        assert!(rig.monitor.board().tones().contains(&Tone::Shutdown));
        let power_down = rig
            .journal
            .position(JournalEntry::Sensor(Command::PowerDown))
            .unwrap();
        let start = rig
            .journal
            .entries()
            .iter()
            .rposition(|e| *e == JournalEntry::Sensor(Command::StartPeriodicMeasurement))
            .unwrap();
        assert!(power_down < start);
    }
}
