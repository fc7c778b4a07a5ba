use super::{RawFrame, TelegramError};
use crc16::{State, ARC};
use log::{debug, error};

/// CRC-16/ARC over everything from `/` up to and including `!`.
pub fn calculate_checksum(data: &[u8]) -> u16 {
    State::<ARC>::calculate(data)
}

pub fn parse_checksum_token(token: &str) -> Result<u16, TelegramError> {
    if token.len() != 4 || !token.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(TelegramError::InvalidChecksum(token.to_string()));
    }
    u16::from_str_radix(token, 16).map_err(|_| TelegramError::InvalidChecksum(token.to_string()))
}

pub fn verify_checksum(frame: &RawFrame) -> Result<(), TelegramError> {
    let expected = parse_checksum_token(frame.checksum_token().unwrap_or_default())?;
    let calculated = calculate_checksum(frame.data());

    if expected != calculated {
        return Err(TelegramError::ChecksumMismatch { expected, calculated });
    }
    debug!("Telegram checksum {calculated:04X} verified");
    Ok(())
}

/// Passes the frame through untouched when checking is disabled.
pub fn validate_frame(frame: &RawFrame, crc_check: bool) -> Result<(), TelegramError> {
    if !crc_check {
        return Ok(());
    }
    verify_checksum(frame).inspect_err(|e| error!("{e}"))
}
