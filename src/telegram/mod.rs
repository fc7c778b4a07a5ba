use crate::obis::ObisCode;
use std::time::Duration;
use thiserror::Error;

pub mod accumulator;
pub mod checksum;
pub mod parser;
pub mod structs;
pub mod value;

pub use accumulator::{FrameAccumulator, FrameState};
pub use checksum::{calculate_checksum, validate_frame};
pub use parser::{decode_telegram, parse_obis_line};
pub use structs::{DataLine, RawFrame, Telegram, ValueGroup, IDENTIFICATION};

pub const START_DELIMITER: u8 = b'/';
pub const END_DELIMITER: u8 = b'!';

/// Everything that can go wrong between the first byte of a telegram and the
/// delivery of its values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TelegramError {
    #[error("Telegram larger than buffer ({max} bytes)")]
    FrameOverflow { max: usize },
    #[error("Timeout while reading data for telegram ({elapsed:?} since start)")]
    FrameTimeout { elapsed: Duration },
    #[error("Telegram CRC checksum validation failed (expected {expected:04X}, calculated {calculated:04X})")]
    ChecksumMismatch { expected: u16, calculated: u16 },
    #[error("Invalid telegram CRC checksum `{0}`")]
    InvalidChecksum(String),
    #[error("Line does not match the data line format: `{0}`")]
    LineUnparseable(String),
    #[error("Unable to parse \"{value}\" of {code} as a floating point number")]
    ValueParseFailure { code: ObisCode, value: String },
}

impl TelegramError {
    /// Errors that drop the whole telegram, as opposed to a single line.
    pub fn aborts_telegram(&self) -> bool {
        matches!(
            self,
            TelegramError::FrameOverflow { .. }
                | TelegramError::FrameTimeout { .. }
                | TelegramError::ChecksumMismatch { .. }
                | TelegramError::InvalidChecksum(_)
        )
    }
}
