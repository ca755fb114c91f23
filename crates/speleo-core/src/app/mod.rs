//! Application state machine
//!
//! The [`Monitor`] owns the sensor driver, the board and the button and is
//! driven by calling [`Monitor::step`] from the main loop. Each step samples
//! the button once and dispatches to the active state:
//!
//! * **Measuring**: polls the sensor once per tick, renders readings, tracks
//!   the session maximum and sounds alerts.
//! * **Menu**: settings and maintenance actions, see [`menu`].
//!
//! Periodic measurement runs exactly while Measuring is active: entering it
//! starts measurement, leaving it stops measurement before any other command
//! is sent.

mod measuring;
mod menu;

pub use measuring::{Session, SPINNER};
pub use menu::{MENU_BACK, MENU_ROWS, MenuMode};

use core::fmt::{self, Write};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use embedded_hal::i2c::I2c;
use heapless::String;
use log::{error, info, warn};
use thiserror_no_std::Error;

use crate::board::Board;
use crate::config::{FIRMWARE_VERSION, MonitorConfig};
use crate::display::{BatteryGauge, GlyphDisplay, NumberFormat, TextStyle};
use crate::input::Button;
use crate::scd4x::{ProtocolError, Scd4x, SensorVariant};
use crate::tone::Tone;

use menu::Menu;

/// Fatal conditions during [`Monitor::boot`].
#[derive(Error, Debug)]
pub enum StartupError<E>
where
    E: core::fmt::Debug,
{
    #[error("could not identify the sensor: {0}")]
    Sensor(ProtocolError<E>),

    #[error("unsupported sensor (feature set {0:#06x})")]
    UnknownVariant(u16),
}

/// Which top-level state is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppStateKind {
    Measuring,
    Menu,
}

enum AppState {
    Measuring,
    Menu(Menu),
}

impl AppState {
    fn kind(&self) -> AppStateKind {
        match self {
            Self::Measuring => AppStateKind::Measuring,
            Self::Menu(_) => AppStateKind::Menu,
        }
    }
}

/// The whole device: sensor, board, button and the state machine over them.
pub struct Monitor<I2C, D, BTN, B> {
    sensor: Scd4x<I2C, D>,
    board: B,
    button: Button<BTN>,
    config: MonitorConfig,
    state: AppState,
    session: Session,
    battery: BatteryGauge,
    variant: Option<SensorVariant>,
}

impl<I2C, D, BTN, B> Monitor<I2C, D, BTN, B>
where
    I2C: I2c,
    D: DelayNs,
    BTN: InputPin,
    B: Board,
{
    pub fn new(sensor: Scd4x<I2C, D>, board: B, button: BTN, config: MonitorConfig) -> Self {
        Self {
            sensor,
            board,
            button: Button::new(button),
            config,
            state: AppState::Measuring,
            session: Session::new(0),
            battery: BatteryGauge::new(),
            variant: None,
        }
    }

    pub fn state(&self) -> AppStateKind {
        self.state.kind()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    pub fn sensor_mut(&mut self) -> &mut Scd4x<I2C, D> {
        &mut self.sensor
    }

    /// Sensor identified during boot.
    pub fn variant(&self) -> Option<SensorVariant> {
        self.variant
    }

    /// Current menu sub-state, if the menu is open.
    pub fn menu_mode(&self) -> Option<MenuMode> {
        match &self.state {
            AppState::Menu(menu) => Some(menu.mode()),
            AppState::Measuring => None,
        }
    }

    /// Menu cursor row, if the menu is open.
    pub fn menu_cursor(&self) -> Option<u8> {
        match &self.state {
            AppState::Menu(menu) => Some(menu.cursor()),
            AppState::Measuring => None,
        }
    }

    /// Splash screen, sensor identification and entry into Measuring.
    ///
    /// An error means the sensor cannot be used; the reason is already on
    /// screen and the caller should [`halt`](Self::halt).
    pub fn boot(&mut self) -> Result<SensorVariant, StartupError<I2C::Error>> {
        let display = self.board.display();
        display.set_enabled(true);
        display.clear();
        display.write_str(2, 1, "CO2 MONITOR", TextStyle::NORMAL);
        display.write_str(0, 5, FIRMWARE_VERSION, TextStyle::NORMAL);
        self.board.play(Tone::Startup);

        // The sensor keeps measuring across an MCU reset.
        if let Err(e) = self.sensor.stop_periodic_measurement() {
            warn!("boot: stop measurement failed: {}", e);
            self.board.display().write_int(
                14,
                0,
                i64::from(e.status_code()),
                NumberFormat::HEX,
                TextStyle::NORMAL,
            );
        }

        let variant = match self.sensor.sensor_variant() {
            Ok(SensorVariant::Unknown(word)) => {
                error!("boot: unknown sensor feature set {:#06x}", word);
                self.board
                    .display()
                    .write_str(0, 6, "UNKNW", TextStyle::NORMAL);
                return Err(StartupError::UnknownVariant(word));
            }
            Ok(variant) => variant,
            Err(e) => {
                error!("boot: sensor identification failed: {}", e);
                self.board
                    .display()
                    .write_str(0, 6, "ERROR", TextStyle::NORMAL);
                return Err(StartupError::Sensor(e));
            }
        };
        info!("boot: found {}", variant.name());
        self.variant = Some(variant);
        self.board
            .display()
            .write_str(0, 6, variant.name(), TextStyle::NORMAL);

        let millivolts = self.board.read_millivolts();
        let display = self.board.display();
        display.write_str(7, 6, "VCC ", TextStyle::NORMAL);
        let col = display.write_int(
            11,
            6,
            i64::from(millivolts / 1000),
            NumberFormat::DECIMAL,
            TextStyle::NORMAL,
        );
        display.write_glyph(col, 6, '.', TextStyle::NORMAL);
        let col = display.write_int(
            col + 1,
            6,
            i64::from(millivolts % 1000 / 10),
            NumberFormat::DECIMAL.width(2).zero_filled(),
            TextStyle::NORMAL,
        );
        display.write_glyph(col, 6, 'V', TextStyle::NORMAL);

        match self.sensor.serial_number() {
            Ok(serial) => match format_serial(serial) {
                Ok(text) => {
                    self.board
                        .display()
                        .write_str(0, 7, &text, TextStyle::NORMAL);
                }
                Err(_) => warn!("boot: serial {:#x} does not fit the display", serial),
            },
            Err(e) => {
                warn!("boot: serial number read failed: {}", e);
                self.board
                    .display()
                    .write_str(0, 7, "CRC ERROR", TextStyle::NORMAL);
            }
        }

        self.board.delay_ms(self.config.splash_ms);
        self.enter_measuring();
        Ok(variant)
    }

    /// Park the device after a fatal boot error.
    pub fn halt(&mut self) -> ! {
        loop {
            self.board.delay_ms(1000);
        }
    }

    /// One main-loop iteration.
    pub fn step(&mut self) {
        let now = self.board.elapsed_millis();
        self.button.poll(now);
        let event = self.button.drain();
        match self.state {
            AppState::Measuring => self.measuring_step(event, now),
            AppState::Menu(_) => self.menu_step(event, now),
        }
    }

    fn transition(&mut self, next: AppStateKind) {
        if self.state.kind() == AppStateKind::Measuring {
            self.leave_measuring();
        }
        info!("app: {:?} -> {:?}", self.state.kind(), next);
        match next {
            AppStateKind::Measuring => self.enter_measuring(),
            AppStateKind::Menu => self.enter_menu(),
        }
    }
}

/// Serial number as three groups of four hex digits.
fn format_serial(serial: u64) -> Result<String<16>, fmt::Error> {
    let mut text = String::new();
    write!(
        text,
        "{:04X} {:04X} {:04X}",
        (serial >> 32) & 0xFFFF,
        (serial >> 16) & 0xFFFF,
        serial & 0xFFFF
    )?;
    Ok(text)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::mock::{
        Journal, MockBoard, ScriptedButton, SimClock, SimDelay, SimulatedScd4x,
    };

    pub type SimMonitor = Monitor<SimulatedScd4x, SimDelay, ScriptedButton, MockBoard>;

    pub struct Rig {
        pub clock: SimClock,
        pub sensor: SimulatedScd4x,
        pub button: ScriptedButton,
        pub journal: Journal,
        pub monitor: SimMonitor,
    }

    impl Rig {
        pub fn new() -> Self {
            Self::with_config(MonitorConfig::default())
        }

        pub fn with_config(config: MonitorConfig) -> Self {
            let clock = SimClock::new();
            let journal = Journal::new();
            let sensor = SimulatedScd4x::new(clock.clone()).with_journal(journal.clone());
            let button = ScriptedButton::new(clock.clone());
            let board = MockBoard::new(clock.clone()).with_journal(journal.clone());
            let monitor = Monitor::new(
                Scd4x::new(sensor.clone(), SimDelay::new(clock.clone())),
                board,
                button.clone(),
                config,
            );
            Self {
                clock,
                sensor,
                button,
                journal,
                monitor,
            }
        }

        /// Boot and start measuring.
        pub fn booted() -> Self {
            let mut rig = Self::new();
            rig.monitor.boot().unwrap();
            rig
        }

        /// Step the main loop every 10 ms for `ms` of virtual time.
        pub fn run_ms(&mut self, ms: u64) {
            let end = self.clock.now_ms() + ms;
            while self.clock.now_ms() < end {
                self.clock.advance_ms(10);
                self.monitor.step();
            }
        }

        /// Press for `duration_ms` and run until it is classified.
        ///
        /// A blocking action triggered by the previous press can carry the
        /// clock past that press's release, so the loop first runs until the
        /// classifier has committed the release.
        pub fn press(&mut self, duration_ms: u64) {
            while self.monitor.button.is_pressed() || self.button.is_held() {
                self.run_ms(10);
            }
            self.button.press_in(0, duration_ms);
            self.run_ms(duration_ms + 100);
        }

        pub fn short_press(&mut self) {
            self.press(200);
        }

        pub fn long_press(&mut self) {
            self.press(1200);
        }

        pub fn screen(&self) -> &crate::display::TextFrame {
            self.monitor.board().frame()
        }
    }
}
