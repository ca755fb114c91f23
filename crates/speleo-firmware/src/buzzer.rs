//! Piezo buzzer on an LEDC PWM channel.
//!
//! Every note gets its own timer frequency, so the timer and the channel are
//! configured per note and the channel is silenced (duty 0) before the next
//! one. Rests only wait.

use embedded_hal::delay::DelayNs;
use esp_hal::gpio::{AnyPin, DriveMode};
use esp_hal::ledc::channel::{self as ledc_channel, ChannelIFace as _};
use esp_hal::ledc::timer::{self as ledc_timer, TimerIFace as _};
use esp_hal::ledc::{LSGlobalClkSource, Ledc, LowSpeed};
use esp_hal::peripherals::LEDC;
use esp_hal::time::Rate;
use log::warn;

use speleo_core::tone::{Note, Tone};

/// Square wave, half on.
const DUTY_PCT: u8 = 50;

pub struct Buzzer {
    ledc: Ledc<'static>,
    pin: AnyPin<'static>,
}

impl Buzzer {
    pub fn new(ledc: LEDC<'static>, pin: AnyPin<'static>) -> Self {
        let mut ledc = Ledc::new(ledc);
        ledc.set_global_slow_clock(LSGlobalClkSource::APBClk);
        Self { ledc, pin }
    }

    /// Plays the whole melody, blocking.
    pub fn play<D: DelayNs>(&mut self, tone: Tone, delay: &mut D) {
        for note in tone.melody() {
            self.sound(note, delay);
        }
    }

    fn sound<D: DelayNs>(&mut self, note: &Note, delay: &mut D) {
        let Some(hz) = note.frequency_hz() else {
            delay.delay_ms(note.duration_ms());
            return;
        };

        let mut timer = self.ledc.timer::<LowSpeed>(ledc_timer::Number::Timer0);
        if let Err(e) = timer.configure(ledc_timer::config::Config {
            duty: ledc_timer::config::Duty::Duty10Bit,
            clock_source: ledc_timer::LSClockSource::APBClk,
            frequency: Rate::from_hz(hz),
        }) {
            warn!("buzzer: timer at {} Hz rejected: {:?}", hz, e);
            delay.delay_ms(note.duration_ms());
            return;
        }

        let mut channel = self
            .ledc
            .channel::<LowSpeed>(ledc_channel::Number::Channel0, self.pin.reborrow());
        if let Err(e) = channel.configure(ledc_channel::config::Config {
            timer: &timer,
            duty_pct: DUTY_PCT,
            drive_mode: DriveMode::PushPull,
        }) {
            warn!("buzzer: channel setup failed: {:?}", e);
            delay.delay_ms(note.duration_ms());
            return;
        }

        delay.delay_ms(note.duration_ms());
        if let Err(e) = channel.set_duty(0) {
            warn!("buzzer: could not silence channel: {:?}", e);
        }
    }
}
