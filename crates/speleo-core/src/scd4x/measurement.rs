//! Measurement decoding
//!
//! The SCD4x reports CO₂ directly in ppm; temperature and humidity are
//! 16-bit fractions of their full scale. Conversions are done in integer
//! fixed point so the firmware needs no float support.

/// One decoded reading of the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Measurement {
    /// CO₂ concentration in ppm.
    pub co2_ppm: u16,
    /// Temperature in tenths of a degree Celsius.
    pub temperature_decidegrees: i16,
    /// Relative humidity in tenths of a percent.
    pub humidity_permille: u16,
}

impl Measurement {
    /// Decodes the three words returned by `read_measurement`.
    ///
    /// * T = −45 °C + 175 °C × raw / 2¹⁶
    /// * RH = 100 % × raw / 2¹⁶
    pub fn from_raw(words: [u16; 3]) -> Self {
        Self {
            co2_ppm: words[0],
            temperature_decidegrees: decode_temperature(words[1]),
            humidity_permille: decode_humidity(words[2]),
        }
    }

    /// Whole degrees, truncated towards zero.
    pub fn temperature_whole(&self) -> i16 {
        self.temperature_decidegrees / 10
    }

    /// Tenths digit of the temperature (always non-negative).
    pub fn temperature_tenths(&self) -> u8 {
        (self.temperature_decidegrees % 10).unsigned_abs() as u8
    }

    /// Whole percent of relative humidity.
    pub fn humidity_percent(&self) -> u8 {
        (self.humidity_permille / 10) as u8
    }
}

/// Offset and scaled value share one division, which truncates toward zero.
fn decode_temperature(raw: u16) -> i16 {
    ((-450 * 65536 + i32::from(raw) * 1750) / 65536) as i16
}

fn decode_humidity(raw: u16) -> u16 {
    ((u32::from(raw) * 1000) >> 16) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datasheet_example_values() {
        // Datasheet example: 0x01F4 ppm, 0x6667 -> 25.0 °C, 0x5EB9 -> 37 %RH
        let m = Measurement::from_raw([0x01F4, 0x6667, 0x5EB9]);
        assert_eq!(m.co2_ppm, 500);
        assert_eq!(m.temperature_decidegrees, 250);
        assert_eq!(m.humidity_permille, 370);
        assert_eq!(m.temperature_whole(), 25);
        assert_eq!(m.temperature_tenths(), 0);
        assert_eq!(m.humidity_percent(), 37);
    }

    #[test]
    fn range_limits() {
        let low = Measurement::from_raw([0, 0, 0]);
        assert_eq!(low.temperature_decidegrees, -450);
        assert_eq!(low.humidity_permille, 0);

        let high = Measurement::from_raw([u16::MAX, u16::MAX, u16::MAX]);
        assert_eq!(high.co2_ppm, 65535);
        assert_eq!(high.temperature_decidegrees, 1299);
        assert_eq!(high.humidity_permille, 999);
    }

    #[test]
    fn negative_temperature_split() {
        // raw 0x2000 -> -45 + 21.875 = -23.125 °C
        let m = Measurement::from_raw([0, 0x2000, 0]);
        assert_eq!(m.temperature_decidegrees, -231);
        assert_eq!(m.temperature_whole(), -23);
        assert_eq!(m.temperature_tenths(), 1);
    }

    #[test]
    fn small_negative_temperature_truncates_toward_zero() {
        // raw 0x41D0 -> -0.011 °C, raw 0x41A0 -> -0.139 °C
        assert_eq!(Measurement::from_raw([0, 0x41D0, 0]).temperature_decidegrees, 0);
        assert_eq!(Measurement::from_raw([0, 0x41A0, 0]).temperature_decidegrees, -1);
    }

    #[test]
    fn decoding_is_monotonic_in_every_channel() {
        let mut previous = Measurement::from_raw([0, 0, 0]);
        for raw in 1..=u16::MAX {
            let current = Measurement::from_raw([raw, raw, raw]);
            assert!(current.co2_ppm > previous.co2_ppm);
            assert!(current.temperature_decidegrees >= previous.temperature_decidegrees);
            assert!(current.humidity_permille >= previous.humidity_permille);
            previous = current;
        }
    }
}
