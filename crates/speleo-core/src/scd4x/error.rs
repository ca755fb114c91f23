use thiserror_no_std::Error;

use super::command::Command;

/// Status code shown for any failed transaction. Bus and checksum failures
/// are deliberately not distinguished on screen.
pub const STATUS_TRANSACTION_FAILED: u8 = 0x01;

/// Reserved status meaning "no new measurement yet"; never an error.
pub const STATUS_NOT_READY: u8 = 0xFF;

/// Failure of one sensor transaction.
#[derive(Error, Debug)]
pub enum ProtocolError<E>
where
    E: core::fmt::Debug,
{
    /// The I²C transport failed during the write or read phase.
    #[error("bus error during {command:?}: {error:?}")]
    Bus { command: Command, error: E },

    /// One or more response words failed their CRC-8 check. The whole
    /// response was still drained from the bus.
    #[error("{failed_words} CRC mismatch(es) in response to {command:?}, first at word {first_word}")]
    Checksum {
        command: Command,
        failed_words: u8,
        first_word: u8,
    },
}

impl<E: core::fmt::Debug> ProtocolError<E> {
    /// Coarse status code for the display.
    pub fn status_code(&self) -> u8 {
        STATUS_TRANSACTION_FAILED
    }
}
