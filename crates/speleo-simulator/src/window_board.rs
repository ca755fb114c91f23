//! [`Board`] backed by an SDL2 window.
//!
//! The panel is a [`GraphicsDisplay`] over a `SimulatorDisplay`, time is the
//! core crate's [`SimClock`] moved forward in step with the wall clock, and
//! the button is the space bar.

use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;
use std::time::Duration;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{
    OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window, sdl2::Keycode,
};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use log::info;

use speleo_core::board::{BatterySampler, Board};
use speleo_core::clock::Clock;
use speleo_core::display::{GraphicsDisplay, PANEL_HEIGHT_PX, PANEL_WIDTH_PX};
use speleo_core::mock::{SimClock, SimulatedScd4x};
use speleo_core::tone::{Tone, ToneGenerator};

/// Pixel scale factor for the simulator window.
const WINDOW_SCALE: u32 = 2;

/// Granularity of blocking delays and of the sleep loop.
pub const FRAME_MS: u64 = 10;

/// CO₂ change per arrow key press.
const CO2_STEP_PPM: u16 = 500;

/// Battery change per `B`/`N` key press.
const BATTERY_STEP_MV: u16 = 100;

/// Space bar state, read as an active-low button.
#[derive(Debug, Clone, Default)]
pub struct KeyButton(Rc<Cell<bool>>);

impl ErrorType for KeyButton {
    type Error = Infallible;
}

impl InputPin for KeyButton {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.get())
    }
}

/// Backlight "pin"; the window goes black while it is low.
#[derive(Debug, Clone, Default)]
pub struct Backlight(Rc<Cell<bool>>);

impl ErrorType for Backlight {
    type Error = Infallible;
}

impl OutputPin for Backlight {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set(true);
        Ok(())
    }
}

type Panel = GraphicsDisplay<SimulatorDisplay<Rgb565>, Backlight>;

pub struct WindowBoard {
    clock: SimClock,
    epoch_ms: u64,
    display: Panel,
    backlight: Backlight,
    dark: SimulatorDisplay<Rgb565>,
    window: Window,
    button: KeyButton,
    sensor: SimulatedScd4x,
    co2_ppm: u16,
    battery_mv: u16,
    quit: bool,
}

impl WindowBoard {
    pub fn new(clock: SimClock, sensor: SimulatedScd4x, button: KeyButton) -> Self {
        let size = Size::new(PANEL_WIDTH_PX, PANEL_HEIGHT_PX);
        let backlight = Backlight::default();
        let output_settings = OutputSettingsBuilder::new().scale(WINDOW_SCALE).build();
        let co2_ppm = 800;
        sensor.set_co2_ppm(co2_ppm);

        let mut board = Self {
            clock,
            epoch_ms: 0,
            display: GraphicsDisplay::new(SimulatorDisplay::new(size), backlight.clone()),
            backlight,
            dark: SimulatorDisplay::new(size),
            window: Window::new("Speleo Simulator", &output_settings),
            button,
            sensor,
            co2_ppm,
            battery_mv: 3600,
            quit: false,
        };
        // The SDL window is lazily initialized on the first `update()` call.
        // We must call `update()` once before `events()` or it will panic.
        board.present();
        board
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    /// Copy the panel (or black, with the backlight off) to the window.
    pub fn present(&mut self) {
        if self.backlight.0.get() {
            self.window.update(self.display.target());
        } else {
            self.window.update(&self.dark);
        }
    }

    /// Drain SDL events into the button, the simulated sensor and the
    /// battery voltage.
    pub fn pump(&mut self) {
        for event in self.window.events() {
            match event {
                SimulatorEvent::Quit => self.quit = true,
                SimulatorEvent::KeyDown { keycode, .. } => match keycode {
                    Keycode::Q | Keycode::Escape => self.quit = true,
                    Keycode::Space => self.button.0.set(true),
                    Keycode::Up => {
                        self.co2_ppm = self.co2_ppm.saturating_add(CO2_STEP_PPM);
                        self.sensor.set_co2_ppm(self.co2_ppm);
                        info!("sim: CO2 now {} ppm", self.co2_ppm);
                    }
                    Keycode::Down => {
                        self.co2_ppm = self.co2_ppm.saturating_sub(CO2_STEP_PPM).max(400);
                        self.sensor.set_co2_ppm(self.co2_ppm);
                        info!("sim: CO2 now {} ppm", self.co2_ppm);
                    }
                    Keycode::B => {
                        self.battery_mv = self.battery_mv.saturating_sub(BATTERY_STEP_MV);
                        info!("sim: battery now {} mV", self.battery_mv);
                    }
                    Keycode::N => {
                        self.battery_mv = self.battery_mv.saturating_add(BATTERY_STEP_MV);
                        info!("sim: battery now {} mV", self.battery_mv);
                    }
                    _ => {}
                },
                SimulatorEvent::KeyUp {
                    keycode: Keycode::Space,
                    ..
                } => self.button.0.set(false),
                _ => {}
            }
        }
    }

    /// Let one frame of wall-clock time pass, keeping the window alive.
    pub fn frame(&mut self) {
        std::thread::sleep(Duration::from_millis(FRAME_MS));
        self.clock.advance_ms(FRAME_MS);
        self.pump();
        self.present();
    }
}

impl Clock for WindowBoard {
    fn elapsed_millis(&self) -> u64 {
        self.clock.now_ms() - self.epoch_ms
    }

    fn reset(&mut self) {
        self.epoch_ms = self.clock.now_ms();
    }
}

impl ToneGenerator for WindowBoard {
    fn play(&mut self, tone: Tone) {
        info!("sim: beep {:?} ({} ms)", tone, tone.duration_ms());
    }
}

impl BatterySampler for WindowBoard {
    fn read_millivolts(&mut self) -> u16 {
        self.battery_mv
    }
}

impl DelayNs for WindowBoard {
    fn delay_ns(&mut self, ns: u32) {
        self.clock.advance_us(u64::from(ns).div_ceil(1000));
    }

    fn delay_ms(&mut self, ms: u32) {
        let mut remaining = u64::from(ms);
        if self.quit {
            self.clock.advance_ms(remaining);
            return;
        }
        while remaining > 0 {
            let step = remaining.min(FRAME_MS);
            std::thread::sleep(Duration::from_millis(step));
            self.clock.advance_ms(step);
            remaining -= step;
            self.pump();
            self.present();
        }
    }
}

impl Board for WindowBoard {
    type Display = Panel;

    fn display(&mut self) -> &mut Self::Display {
        &mut self.display
    }

    /// Blocks until the space bar goes down. Virtual time stands still, like
    /// the halted timer on the device. Closing the window while asleep ends
    /// the process, since the device would never come back on its own.
    fn sleep_until_wake(&mut self) {
        info!("sim: asleep, press space to wake");
        self.button.0.set(false);
        self.present();
        while !self.button.0.get() {
            if self.quit {
                info!("Simulator exiting");
                std::process::exit(0);
            }
            std::thread::sleep(Duration::from_millis(FRAME_MS));
            self.pump();
        }
    }
}
