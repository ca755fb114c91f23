//! [`Board`] for the ESP32-S3 handheld.
//!
//! Glyphs are rendered into a PSRAM framebuffer and pushed to the panel in
//! [`EspBoard::present`], which also runs before every blocking delay so
//! splash and result screens are visible while the loop waits.

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::DrawTarget;
use embedded_hal::delay::DelayNs;
use esp_hal::delay::Delay;
use esp_hal::gpio::Output;
use esp_hal::rtc_cntl::Rtc;
use esp_hal::rtc_cntl::sleep::GpioWakeupSource;
use log::{debug, warn};

use speleo_core::board::{BatterySampler, Board};
use speleo_core::clock::{Clock, MillisCounter};
use speleo_core::display::GraphicsDisplay;
use speleo_core::framebuffer::PanelBuffer;
use speleo_core::tone::{Tone, ToneGenerator};

use crate::buzzer::Buzzer;

pub type BufferedDisplay = GraphicsDisplay<PanelBuffer, Output<'static>>;

pub struct EspBoard<P, BAT> {
    millis: &'static MillisCounter,
    display: BufferedDisplay,
    panel: P,
    buzzer: Buzzer,
    battery: BAT,
    delay: Delay,
    rtc: Rtc<'static>,
}

impl<P, BAT> EspBoard<P, BAT>
where
    P: DrawTarget<Color = Rgb565>,
    P::Error: core::fmt::Debug,
    BAT: BatterySampler,
{
    pub fn new(
        millis: &'static MillisCounter,
        display: BufferedDisplay,
        panel: P,
        buzzer: Buzzer,
        battery: BAT,
        rtc: Rtc<'static>,
    ) -> Self {
        Self {
            millis,
            display,
            panel,
            buzzer,
            battery,
            delay: Delay::new(),
            rtc,
        }
    }

    /// Copy whatever changed in the framebuffer to the panel.
    pub fn present(&mut self) {
        if let Err(e) = self.display.target_mut().flush(&mut self.panel) {
            warn!("board: panel flush failed: {:?}", e);
        }
    }
}

impl<P, BAT> Clock for EspBoard<P, BAT> {
    fn elapsed_millis(&self) -> u64 {
        self.millis.now()
    }

    fn reset(&mut self) {
        self.millis.clear();
    }
}

impl<P, BAT> ToneGenerator for EspBoard<P, BAT> {
    fn play(&mut self, tone: Tone) {
        self.buzzer.play(tone, &mut self.delay);
    }
}

impl<P, BAT> BatterySampler for EspBoard<P, BAT>
where
    BAT: BatterySampler,
{
    fn read_millivolts(&mut self) -> u16 {
        self.battery.read_millivolts()
    }
}

impl<P, BAT> DelayNs for EspBoard<P, BAT>
where
    P: DrawTarget<Color = Rgb565>,
    P::Error: core::fmt::Debug,
    BAT: BatterySampler,
{
    fn delay_ns(&mut self, ns: u32) {
        self.delay.delay_ns(ns);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.present();
        self.delay.delay_ms(ms);
    }
}

impl<P, BAT> Board for EspBoard<P, BAT>
where
    P: DrawTarget<Color = Rgb565>,
    P::Error: core::fmt::Debug,
    BAT: BatterySampler,
{
    type Display = BufferedDisplay;

    fn display(&mut self) -> &mut Self::Display {
        &mut self.display
    }

    /// Light sleep until the button pulls its pin low. The button pin must
    /// have been armed with `wakeup_enable` during init.
    fn sleep_until_wake(&mut self) {
        self.present();
        debug!("board: entering light sleep");
        self.rtc.sleep_light(&[&GpioWakeupSource::new()]);
        debug!("board: woke from light sleep");
    }
}
