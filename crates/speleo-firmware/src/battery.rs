//! Battery voltage through ADC1.
//!
//! The cell feeds GPIO1 through a 1:1 resistor divider. With 11 dB
//! attenuation the ADC spans roughly 0..3.1 V at 12 bits.

use esp_hal::Blocking;
use esp_hal::analog::adc::{Adc, AdcConfig, AdcPin, Attenuation};
use esp_hal::peripherals::{ADC1, GPIO1};
use log::warn;

use speleo_core::board::BatterySampler;

/// Full-scale input at 11 dB attenuation.
const FULL_SCALE_MV: u32 = 3100;
const FULL_SCALE_RAW: u32 = 4095;
/// The divider halves the cell voltage.
const DIVIDER_RATIO: u32 = 2;

pub struct AdcBattery {
    adc: Adc<'static, ADC1<'static>, Blocking>,
    pin: AdcPin<GPIO1<'static>, ADC1<'static>>,
}

impl AdcBattery {
    pub fn new(adc1: ADC1<'static>, gpio: GPIO1<'static>) -> Self {
        let mut config = AdcConfig::new();
        let pin = config.enable_pin(gpio, Attenuation::_11dB);
        Self {
            adc: Adc::new(adc1, config),
            pin,
        }
    }
}

impl BatterySampler for AdcBattery {
    fn read_millivolts(&mut self) -> u16 {
        match nb::block!(self.adc.read_oneshot(&mut self.pin)) {
            Ok(raw) => (u32::from(raw) * FULL_SCALE_MV / FULL_SCALE_RAW * DIVIDER_RATIO) as u16,
            Err(()) => {
                warn!("battery: ADC read failed");
                0
            }
        }
    }
}
