//! SCD4x command protocol engine
//!
//! Every interaction with the sensor is a transaction: one bus write of the
//! opcode and any CRC-protected payload words, the command's execution delay,
//! then (for commands with a response) one bus read of `3 × n` bytes. Each
//! response word is checked against its CRC-8; a mismatch fails the whole
//! transaction but the read is always completed.
//!
//! The driver is generic over any `embedded_hal` I²C bus and delay, so the
//! same code runs on the ESP32-S3 and against [`crate::mock::SimulatedScd4x`].

mod command;
mod crc;
mod error;
mod measurement;

pub use command::Command;
pub use crc::{decode_word, encode_word, word_crc};
pub use error::{ProtocolError, STATUS_NOT_READY, STATUS_TRANSACTION_FAILED};
pub use measurement::Measurement;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use heapless::Vec;
use log::{debug, warn};

/// Fixed 7-bit I²C address of every SCD4x.
pub const SCD4X_ADDRESS: u8 = 0x62;

/// Longest single wait handed to the delay provider. Longer execution times
/// (self-test takes 10 s) are split into several waits.
pub const MAX_DELAY_CHUNK_MS: u32 = 1000;

/// Most words any command returns.
pub const MAX_RESPONSE_WORDS: usize = 3;

const MAX_PAYLOAD_WORDS: usize = 1;
const WRITE_BUFFER_LEN: usize = 2 + 3 * MAX_PAYLOAD_WORDS;
const READ_BUFFER_LEN: usize = 3 * MAX_RESPONSE_WORDS;

/// Bits of the data-ready status word that signal a pending measurement.
const DATA_READY_MASK: u16 = 0x07FF;

/// Offset applied to the forced-recalibration correction word.
const FRC_OFFSET: i32 = 0x8000;
const FRC_FAILED: u16 = 0xFFFF;

/// Bit of the feature-set word that distinguishes the SCD41 from the SCD40.
const VARIANT_BIT: u16 = 1 << 12;
/// Remaining type bits; any of them set means a sensor we do not know.
const UNKNOWN_VARIANT_MASK: u16 = 0xE000;

/// Decoded words of a successful transaction.
pub type Response = Vec<u16, MAX_RESPONSE_WORDS>;

/// Sensor family member, taken from the feature-set word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorVariant {
    Scd40,
    Scd41,
    /// Feature word with type bits this firmware does not recognise.
    Unknown(u16),
}

impl SensorVariant {
    pub fn from_feature_set(word: u16) -> Self {
        if word & UNKNOWN_VARIANT_MASK != 0 {
            Self::Unknown(word)
        } else if word & VARIANT_BIT != 0 {
            Self::Scd41
        } else {
            Self::Scd40
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Scd40 => "SCD40",
            Self::Scd41 => "SCD41",
            Self::Unknown(_) => "UNKNW",
        }
    }
}

/// Result of the on-chip self-test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfTestOutcome {
    Passed,
    /// Nonzero malfunction word reported by the sensor.
    Fault(u16),
}

/// Outcome of a forced recalibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recalibration {
    /// Applied correction in ppm.
    Corrected(i16),
    /// The sensor rejected the recalibration (it was not measuring long
    /// enough beforehand, or the reference is implausible).
    Failed,
}

impl Recalibration {
    pub fn from_word(word: u16) -> Self {
        if word == FRC_FAILED {
            Self::Failed
        } else {
            Self::Corrected((i32::from(word) - FRC_OFFSET) as i16)
        }
    }
}

/// Driver for one SCD4x on a blocking I²C bus.
pub struct Scd4x<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
}

impl<I2C, D> Scd4x<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self {
            i2c,
            delay,
            address: SCD4X_ADDRESS,
        }
    }

    /// Runs one complete transaction and returns the decoded response words.
    ///
    /// `payload` must hold exactly [`Command::payload_words`] words. The
    /// execution delay is always served in full, even for commands without a
    /// response, so the next transaction never reaches a busy sensor.
    pub fn execute(
        &mut self,
        command: Command,
        payload: &[u16],
    ) -> Result<Response, ProtocolError<I2C::Error>> {
        debug_assert_eq!(payload.len(), command.payload_words());

        let mut frame = [0u8; WRITE_BUFFER_LEN];
        frame[..2].copy_from_slice(&command.opcode().to_be_bytes());
        let mut len = 2;
        for word in payload.iter().take(MAX_PAYLOAD_WORDS) {
            frame[len..len + 3].copy_from_slice(&encode_word(*word));
            len += 3;
        }

        // Once the write was attempted the sensor may be executing, so the
        // delay is served before a write error is reported.
        let written = self.i2c.write(self.address, &frame[..len]);
        self.wait_ms(command.execution_time_ms());
        written.map_err(|error| ProtocolError::Bus { command, error })?;

        let mut response = Response::new();
        let words = command.response_words();
        if words == 0 {
            return Ok(response);
        }

        let mut raw = [0u8; READ_BUFFER_LEN];
        let raw = &mut raw[..3 * words];
        self.i2c
            .read(self.address, raw)
            .map_err(|error| ProtocolError::Bus { command, error })?;

        let mut failed_words = 0u8;
        let mut first_word = 0u8;
        for (index, chunk) in raw.chunks_exact(3).enumerate() {
            let (word, valid) = decode_word([chunk[0], chunk[1], chunk[2]]);
            if !valid {
                if failed_words == 0 {
                    first_word = index as u8;
                }
                failed_words += 1;
            }
            // Capacity equals the longest response; cannot overflow.
            let _ = response.push(word);
        }

        if failed_words > 0 {
            warn!(
                "{:?}: {} of {} response words failed CRC",
                command, failed_words, words
            );
            return Err(ProtocolError::Checksum {
                command,
                failed_words,
                first_word,
            });
        }

        Ok(response)
    }

    fn wait_ms(&mut self, mut remaining: u32) {
        while remaining > 0 {
            let chunk = remaining.min(MAX_DELAY_CHUNK_MS);
            self.delay.delay_ms(chunk);
            remaining -= chunk;
        }
    }

    fn execute_one(
        &mut self,
        command: Command,
        payload: &[u16],
    ) -> Result<u16, ProtocolError<I2C::Error>> {
        let response = self.execute(command, payload)?;
        Ok(response.first().copied().unwrap_or_default())
    }

    pub fn start_periodic_measurement(&mut self) -> Result<(), ProtocolError<I2C::Error>> {
        self.execute(Command::StartPeriodicMeasurement, &[])?;
        debug!("SCD4x: periodic measurement started");
        Ok(())
    }

    pub fn stop_periodic_measurement(&mut self) -> Result<(), ProtocolError<I2C::Error>> {
        self.execute(Command::StopPeriodicMeasurement, &[])?;
        debug!("SCD4x: periodic measurement stopped");
        Ok(())
    }

    /// Configured altitude above sea level in metres.
    pub fn sensor_altitude(&mut self) -> Result<u16, ProtocolError<I2C::Error>> {
        self.execute_one(Command::GetSensorAltitude, &[])
    }

    pub fn set_sensor_altitude(&mut self, metres: u16) -> Result<(), ProtocolError<I2C::Error>> {
        self.execute(Command::SetSensorAltitude, &[metres])?;
        Ok(())
    }

    pub fn automatic_self_calibration(&mut self) -> Result<bool, ProtocolError<I2C::Error>> {
        Ok(self.execute_one(Command::GetAutomaticSelfCalibration, &[])? != 0)
    }

    pub fn set_automatic_self_calibration(
        &mut self,
        enabled: bool,
    ) -> Result<(), ProtocolError<I2C::Error>> {
        self.execute(Command::SetAutomaticSelfCalibration, &[u16::from(enabled)])?;
        Ok(())
    }

    /// Recalibrates against a known CO₂ concentration. Periodic measurement
    /// must be stopped.
    pub fn perform_forced_recalibration(
        &mut self,
        reference_ppm: u16,
    ) -> Result<Recalibration, ProtocolError<I2C::Error>> {
        let word = self.execute_one(Command::PerformForcedRecalibration, &[reference_ppm])?;
        let outcome = Recalibration::from_word(word);
        debug!("SCD4x: forced recalibration to {} ppm: {:?}", reference_ppm, outcome);
        Ok(outcome)
    }

    /// Blocks for the full ten second self-test.
    pub fn perform_self_test(&mut self) -> Result<SelfTestOutcome, ProtocolError<I2C::Error>> {
        Ok(match self.execute_one(Command::PerformSelfTest, &[])? {
            0 => SelfTestOutcome::Passed,
            code => SelfTestOutcome::Fault(code),
        })
    }

    pub fn data_ready(&mut self) -> Result<bool, ProtocolError<I2C::Error>> {
        Ok(self.execute_one(Command::GetDataReadyStatus, &[])? & DATA_READY_MASK != 0)
    }

    pub fn read_measurement(&mut self) -> Result<Measurement, ProtocolError<I2C::Error>> {
        let words = self.execute(Command::ReadMeasurement, &[])?;
        let mut raw = [0u16; 3];
        for (slot, word) in raw.iter_mut().zip(words.iter()) {
            *slot = *word;
        }
        Ok(Measurement::from_raw(raw))
    }

    /// Reads a measurement if the sensor has a new one. `Ok(None)` is the
    /// normal "not yet" answer between two periodic samples.
    pub fn poll_measurement(&mut self) -> Result<Option<Measurement>, ProtocolError<I2C::Error>> {
        if !self.data_ready()? {
            return Ok(None);
        }
        self.read_measurement().map(Some)
    }

    /// 48-bit serial number, first word most significant.
    pub fn serial_number(&mut self) -> Result<u64, ProtocolError<I2C::Error>> {
        let words = self.execute(Command::GetSerialNumber, &[])?;
        Ok(words
            .iter()
            .fold(0u64, |serial, word| (serial << 16) | u64::from(*word)))
    }

    pub fn sensor_variant(&mut self) -> Result<SensorVariant, ProtocolError<I2C::Error>> {
        let word = self.execute_one(Command::GetFeatureSet, &[])?;
        Ok(SensorVariant::from_feature_set(word))
    }

    pub fn persist_settings(&mut self) -> Result<(), ProtocolError<I2C::Error>> {
        self.execute(Command::PersistSettings, &[])?;
        Ok(())
    }

    pub fn power_down(&mut self) -> Result<(), ProtocolError<I2C::Error>> {
        self.execute(Command::PowerDown, &[])?;
        Ok(())
    }

    /// Wakes the sensor from power-down. The sensor does not acknowledge this
    /// command, so a bus error is expected and ignored.
    pub fn wake_up(&mut self) {
        if let Err(e) = self.execute(Command::WakeUp, &[]) {
            debug!("SCD4x: wake-up not acknowledged ({:?})", e);
        }
    }
}
