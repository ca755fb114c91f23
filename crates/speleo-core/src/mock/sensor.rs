use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use embedded_hal::i2c::{self, ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use log::debug;

use super::clock::SimClock;
use super::journal::{Journal, JournalEntry};
use crate::scd4x::{Command, SCD4X_ADDRESS, decode_word, encode_word};

const SAMPLE_PERIOD_MS: u64 = 5000;
const DATA_READY_FLAG: u16 = 0x0006;
const DATA_READY_IDLE: u16 = 0x8000;

/// Bus failures the simulated sensor produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimBusError {
    /// The sensor did not acknowledge (wrong state, busy, bad CRC, asleep).
    Nack,
    /// Injected transport failure.
    Bus,
}

impl i2c::Error for SimBusError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Nack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data),
            Self::Bus => ErrorKind::Bus,
        }
    }
}

#[derive(Debug)]
struct State {
    clock: SimClock,
    journal: Option<Journal>,

    measuring: bool,
    powered_down: bool,
    next_sample_ms: u64,
    busy_until_us: u64,
    pending: Option<(Command, Vec<u16>)>,
    corrupt_words: Vec<(Option<Command>, usize)>,
    bus_failure: bool,

    co2_ppm: u16,
    co2_script: Vec<u16>,
    temperature_raw: u16,
    humidity_raw: u16,
    altitude: u16,
    asc_enabled: bool,
    self_test_result: u16,
    feature_set: u16,
    serial: [u16; 3],
    recalibration_fails: bool,
    persisted: usize,

    written: Vec<Vec<u8>>,
    read_lengths: Vec<usize>,
}

/// Behavioural model of an SCD4x on the I²C bus.
///
/// It checks incoming CRCs, enforces execution times and the set of
/// commands allowed during periodic measurement, produces a new sample every
/// five seconds of virtual time while measuring, and answers everything else
/// from its settings.
#[derive(Debug, Clone)]
pub struct SimulatedScd4x {
    state: Rc<RefCell<State>>,
}

impl SimulatedScd4x {
    pub fn new(clock: SimClock) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                clock,
                journal: None,
                measuring: false,
                powered_down: false,
                next_sample_ms: 0,
                busy_until_us: 0,
                pending: None,
                corrupt_words: Vec::new(),
                bus_failure: false,
                co2_ppm: 420,
                co2_script: Vec::new(),
                // 25.0 °C, 37 %RH
                temperature_raw: 0x6667,
                humidity_raw: 0x5EB9,
                altitude: 0,
                asc_enabled: true,
                self_test_result: 0,
                feature_set: 0x1440,
                serial: [0x1234, 0x5678, 0x9ABC],
                recalibration_fails: false,
                persisted: 0,
                written: Vec::new(),
                read_lengths: Vec::new(),
            })),
        }
    }

    pub fn with_journal(self, journal: Journal) -> Self {
        self.state.borrow_mut().journal = Some(journal);
        self
    }

    pub fn set_co2_ppm(&self, ppm: u16) {
        self.state.borrow_mut().co2_ppm = ppm;
    }

    /// Readings served one per sample; the last one sticks.
    pub fn script_co2(&self, readings: &[u16]) {
        let mut state = self.state.borrow_mut();
        state.co2_script = readings.iter().rev().copied().collect();
    }

    pub fn set_raw_climate(&self, temperature_raw: u16, humidity_raw: u16) {
        let mut state = self.state.borrow_mut();
        state.temperature_raw = temperature_raw;
        state.humidity_raw = humidity_raw;
    }

    pub fn set_self_test_result(&self, word: u16) {
        self.state.borrow_mut().self_test_result = word;
    }

    pub fn set_feature_set(&self, word: u16) {
        self.state.borrow_mut().feature_set = word;
    }

    pub fn set_serial(&self, words: [u16; 3]) {
        self.state.borrow_mut().serial = words;
    }

    pub fn set_recalibration_fails(&self, fails: bool) {
        self.state.borrow_mut().recalibration_fails = fails;
    }

    pub fn set_asc_enabled(&self, enabled: bool) {
        self.state.borrow_mut().asc_enabled = enabled;
    }

    pub fn set_altitude(&self, metres: u16) {
        self.state.borrow_mut().altitude = metres;
    }

    /// Every transaction fails with [`SimBusError::Bus`] while set.
    pub fn set_bus_failure(&self, failing: bool) {
        self.state.borrow_mut().bus_failure = failing;
    }

    /// Flip the CRC byte of response word `index` in the next read.
    pub fn corrupt_next_response_word(&self, index: usize) {
        self.state.borrow_mut().corrupt_words.push((None, index));
    }

    /// Flip the CRC byte of response word `index` the next time `command`
    /// is answered.
    pub fn corrupt_response(&self, command: Command, index: usize) {
        self.state
            .borrow_mut()
            .corrupt_words
            .push((Some(command), index));
    }

    /// Move virtual time to the moment the next sample becomes ready.
    pub fn advance_to_next_sample(&self) {
        let state = self.state.borrow();
        state.clock.advance_to_ms(state.next_sample_ms);
    }

    pub fn is_measuring(&self) -> bool {
        self.state.borrow().measuring
    }

    pub fn is_powered_down(&self) -> bool {
        self.state.borrow().powered_down
    }

    pub fn altitude(&self) -> u16 {
        self.state.borrow().altitude
    }

    pub fn asc_enabled(&self) -> bool {
        self.state.borrow().asc_enabled
    }

    pub fn persist_count(&self) -> usize {
        self.state.borrow().persisted
    }

    /// Raw bytes of every write, accepted or not.
    pub fn written_frames(&self) -> Vec<Vec<u8>> {
        self.state.borrow().written.clone()
    }

    /// Byte count of every read.
    pub fn read_lengths(&self) -> Vec<usize> {
        self.state.borrow().read_lengths.clone()
    }
}

impl State {
    fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    fn log(&self, entry: JournalEntry) {
        if let Some(journal) = &self.journal {
            journal.record(entry);
        }
    }

    fn data_ready(&self) -> bool {
        self.measuring && self.now_ms() >= self.next_sample_ms
    }

    fn next_co2(&mut self) -> u16 {
        if let Some(ppm) = self.co2_script.pop() {
            self.co2_ppm = ppm;
        }
        self.co2_ppm
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), SimBusError> {
        self.written.push(bytes.to_vec());
        if self.bus_failure {
            return Err(SimBusError::Bus);
        }
        if bytes.len() < 2 {
            return Err(SimBusError::Nack);
        }
        let opcode = u16::from_be_bytes([bytes[0], bytes[1]]);
        let command = Command::from_opcode(opcode).ok_or(SimBusError::Nack)?;

        let reject = |state: &mut State, why: &str| {
            debug!("sim scd4x: rejecting {:?}: {}", command, why);
            state.log(JournalEntry::SensorRejected(command));
            Err(SimBusError::Nack)
        };

        if self.powered_down {
            if command == Command::WakeUp {
                self.powered_down = false;
                self.busy_until_us = self.clock.now_us() + 30_000;
                self.log(JournalEntry::Sensor(command));
            }
            // the sensor never acknowledges wake-up
            return Err(SimBusError::Nack);
        }
        if self.clock.now_us() < self.busy_until_us {
            return reject(self, "busy");
        }
        if self.measuring && !command.allowed_while_measuring() {
            return reject(self, "periodic measurement running");
        }

        let payload_bytes = &bytes[2..];
        if payload_bytes.len() != 3 * command.payload_words() {
            return reject(self, "wrong payload length");
        }
        let mut payload = Vec::new();
        for chunk in payload_bytes.chunks_exact(3) {
            let (word, valid) = decode_word([chunk[0], chunk[1], chunk[2]]);
            if !valid {
                return reject(self, "payload CRC mismatch");
            }
            payload.push(word);
        }

        let response = match command {
            Command::ReadMeasurement => {
                if !self.data_ready() {
                    return reject(self, "no sample available");
                }
                while self.next_sample_ms <= self.now_ms() {
                    self.next_sample_ms += SAMPLE_PERIOD_MS;
                }
                let co2 = self.next_co2();
                alloc::vec![co2, self.temperature_raw, self.humidity_raw]
            }
            Command::GetDataReadyStatus => {
                let word = if self.data_ready() {
                    DATA_READY_FLAG
                } else {
                    DATA_READY_IDLE
                };
                alloc::vec![word]
            }
            Command::StartPeriodicMeasurement => {
                self.measuring = true;
                self.next_sample_ms = self.now_ms() + SAMPLE_PERIOD_MS;
                Vec::new()
            }
            Command::StopPeriodicMeasurement => {
                self.measuring = false;
                Vec::new()
            }
            Command::SetSensorAltitude => {
                self.altitude = payload[0];
                Vec::new()
            }
            Command::GetSensorAltitude => alloc::vec![self.altitude],
            Command::SetAutomaticSelfCalibration => {
                self.asc_enabled = payload[0] != 0;
                Vec::new()
            }
            Command::GetAutomaticSelfCalibration => alloc::vec![u16::from(self.asc_enabled)],
            Command::PerformForcedRecalibration => {
                let word = if self.recalibration_fails {
                    0xFFFF
                } else {
                    let correction = i32::from(payload[0]) - i32::from(self.co2_ppm);
                    (0x8000 + correction) as u16
                };
                alloc::vec![word]
            }
            Command::PersistSettings => {
                self.persisted += 1;
                Vec::new()
            }
            Command::GetSerialNumber => self.serial.to_vec(),
            Command::PerformSelfTest => alloc::vec![self.self_test_result],
            Command::GetFeatureSet => alloc::vec![self.feature_set],
            Command::PowerDown => {
                self.powered_down = true;
                Vec::new()
            }
            // handled above while powered down; a no-op when awake
            Command::WakeUp => Vec::new(),
        };

        self.log(JournalEntry::Sensor(command));
        self.busy_until_us = self.clock.now_us() + u64::from(command.execution_time_ms()) * 1000;
        self.pending = (!response.is_empty()).then_some((command, response));
        if command == Command::WakeUp {
            return Err(SimBusError::Nack);
        }
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<(), SimBusError> {
        self.read_lengths.push(buffer.len());
        if self.bus_failure {
            return Err(SimBusError::Bus);
        }
        let Some((command, words)) = self.pending.take() else {
            return Err(SimBusError::Nack);
        };
        if self.clock.now_us() < self.busy_until_us {
            debug!("sim scd4x: {:?} read before execution finished", command);
            return Err(SimBusError::Nack);
        }

        let (corrupt, keep): (Vec<_>, Vec<_>) = core::mem::take(&mut self.corrupt_words)
            .into_iter()
            .partition(|(target, _)| target.is_none_or(|c| c == command));
        self.corrupt_words = keep;
        for (index, chunk) in buffer.chunks_mut(3).enumerate() {
            let mut triple = words.get(index).map(|w| encode_word(*w)).unwrap_or([0xFF; 3]);
            if corrupt.iter().any(|(_, word)| *word == index) {
                triple[2] ^= 0xFF;
            }
            chunk.copy_from_slice(&triple[..chunk.len()]);
        }
        Ok(())
    }
}

impl ErrorType for SimulatedScd4x {
    type Error = SimBusError;
}

impl I2c for SimulatedScd4x {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != SCD4X_ADDRESS {
            return Err(SimBusError::Nack);
        }
        let mut state = self.state.borrow_mut();
        for operation in operations {
            match operation {
                Operation::Write(bytes) => state.write(bytes)?,
                Operation::Read(buffer) => state.read(buffer)?,
            }
        }
        Ok(())
    }
}
