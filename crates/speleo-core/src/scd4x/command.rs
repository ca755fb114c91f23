//! SCD4x command table
//!
//! Opcodes, payload sizes, response sizes and execution times are part of the
//! sensor's external contract (datasheet section 3.5) and must not change.

/// Every command the monitor sends to the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    StartPeriodicMeasurement,
    ReadMeasurement,
    StopPeriodicMeasurement,
    SetSensorAltitude,
    GetSensorAltitude,
    PerformForcedRecalibration,
    SetAutomaticSelfCalibration,
    GetAutomaticSelfCalibration,
    GetDataReadyStatus,
    PersistSettings,
    GetSerialNumber,
    PerformSelfTest,
    GetFeatureSet,
    PowerDown,
    WakeUp,
}

impl Command {
    pub const ALL: [Command; 15] = [
        Self::StartPeriodicMeasurement,
        Self::ReadMeasurement,
        Self::StopPeriodicMeasurement,
        Self::SetSensorAltitude,
        Self::GetSensorAltitude,
        Self::PerformForcedRecalibration,
        Self::SetAutomaticSelfCalibration,
        Self::GetAutomaticSelfCalibration,
        Self::GetDataReadyStatus,
        Self::PersistSettings,
        Self::GetSerialNumber,
        Self::PerformSelfTest,
        Self::GetFeatureSet,
        Self::PowerDown,
        Self::WakeUp,
    ];

    pub const fn opcode(self) -> u16 {
        match self {
            Self::StartPeriodicMeasurement => 0x21B1,
            Self::ReadMeasurement => 0xEC05,
            Self::StopPeriodicMeasurement => 0x3F86,
            Self::SetSensorAltitude => 0x2427,
            Self::GetSensorAltitude => 0x2322,
            Self::PerformForcedRecalibration => 0x362F,
            Self::SetAutomaticSelfCalibration => 0x2416,
            Self::GetAutomaticSelfCalibration => 0x2313,
            Self::GetDataReadyStatus => 0xE4B8,
            Self::PersistSettings => 0x3615,
            Self::GetSerialNumber => 0x3682,
            Self::PerformSelfTest => 0x3639,
            Self::GetFeatureSet => 0x202F,
            Self::PowerDown => 0x36E0,
            Self::WakeUp => 0x36F6,
        }
    }

    /// Number of 16-bit words written after the opcode.
    pub const fn payload_words(self) -> usize {
        match self {
            Self::SetSensorAltitude
            | Self::PerformForcedRecalibration
            | Self::SetAutomaticSelfCalibration => 1,
            _ => 0,
        }
    }

    /// Number of 16-bit words (each followed by a CRC byte) read back.
    pub const fn response_words(self) -> usize {
        match self {
            Self::ReadMeasurement | Self::GetSerialNumber => 3,
            Self::GetSensorAltitude
            | Self::PerformForcedRecalibration
            | Self::GetAutomaticSelfCalibration
            | Self::GetDataReadyStatus
            | Self::PerformSelfTest
            | Self::GetFeatureSet => 1,
            _ => 0,
        }
    }

    /// Time the sensor needs between the end of the write and the read (or
    /// the next command).
    pub const fn execution_time_ms(self) -> u32 {
        match self {
            Self::StartPeriodicMeasurement => 0,
            Self::StopPeriodicMeasurement => 500,
            Self::PerformForcedRecalibration => 400,
            Self::PersistSettings => 800,
            Self::PerformSelfTest => 10_000,
            Self::WakeUp => 30,
            _ => 1,
        }
    }

    /// Whether the sensor accepts this command while periodic measurement
    /// is running.
    pub const fn allowed_while_measuring(self) -> bool {
        matches!(
            self,
            Self::ReadMeasurement | Self::StopPeriodicMeasurement | Self::GetDataReadyStatus
        )
    }

    pub fn from_opcode(opcode: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.opcode() == opcode)
    }
}
