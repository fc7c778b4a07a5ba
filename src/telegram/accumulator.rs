use super::{RawFrame, TelegramError, END_DELIMITER, START_DELIMITER};
use log::{debug, error, trace, warn};
use std::time::{Duration, Instant};

const CHECKSUM_LENGTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Waiting for a start delimiter, everything else is dropped.
    Idle,
    Accumulating { started: Instant },
    /// End delimiter seen, collecting the checksum token.
    Checksum { started: Instant },
}

/// Turns an unbounded byte stream into complete telegram frames.
pub struct FrameAccumulator {
    buffer: Vec<u8>,
    checksum: String,
    state: FrameState,
    max_telegram_length: usize,
    receive_timeout: Duration,
    capture_checksum: bool,
}

impl FrameAccumulator {
    pub fn new(max_telegram_length: usize, receive_timeout: Duration, capture_checksum: bool) -> Self {
        Self {
            buffer: Vec::with_capacity(max_telegram_length),
            checksum: String::with_capacity(CHECKSUM_LENGTH),
            state: FrameState::Idle,
            max_telegram_length,
            receive_timeout,
            capture_checksum,
        }
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == FrameState::Idle
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Feeds a chunk and returns every frame completed or discarded by it,
    /// in stream order.
    pub fn feed(&mut self, bytes: &[u8], now: Instant) -> Vec<Result<RawFrame, TelegramError>> {
        bytes.iter().filter_map(|byte| self.push(*byte, now)).collect()
    }

    pub fn push(&mut self, byte: u8, now: Instant) -> Option<Result<RawFrame, TelegramError>> {
        // A stale frame must not be extended; a new start replaces it anyway
        if byte != START_DELIMITER {
            if let Some(e) = self.check_timeout(now) {
                return Some(Err(e));
            }
        }

        if byte == START_DELIMITER {
            if !self.is_idle() {
                debug!("Start of a new telegram found, dropping {} buffered bytes", self.buffer.len());
            } else {
                trace!("Header of telegram found");
            }
            self.reset();
            self.state = FrameState::Accumulating { started: now };
        }

        match self.state {
            FrameState::Idle => None,
            FrameState::Accumulating { started } => {
                if self.buffer.len() >= self.max_telegram_length {
                    self.reset();
                    error!("Error: telegram larger than buffer ({} bytes)", self.max_telegram_length);
                    return Some(Err(TelegramError::FrameOverflow { max: self.max_telegram_length }));
                }
                self.buffer.push(byte);

                if byte != END_DELIMITER {
                    return None;
                }
                trace!("Footer of telegram found");
                if self.capture_checksum {
                    self.state = FrameState::Checksum { started };
                    None
                } else {
                    Some(Ok(self.take_frame()))
                }
            }
            FrameState::Checksum { .. } => match byte {
                b'\n' => Some(Ok(self.take_frame())),
                b'\r' => None,
                _ => {
                    self.checksum.push(char::from(byte));
                    if self.checksum.len() == CHECKSUM_LENGTH {
                        Some(Ok(self.take_frame()))
                    } else {
                        None
                    }
                }
            },
        }
    }

    /// Drops a partial telegram whose start is older than the receive timeout.
    pub fn check_timeout(&mut self, now: Instant) -> Option<TelegramError> {
        let started = match self.state {
            FrameState::Idle => return None,
            FrameState::Accumulating { started } | FrameState::Checksum { started } => started,
        };

        let elapsed = now.saturating_duration_since(started);
        if elapsed <= self.receive_timeout {
            return None;
        }

        warn!("Timeout while reading data for telegram");
        self.reset();
        Some(TelegramError::FrameTimeout { elapsed })
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.checksum.clear();
        self.state = FrameState::Idle;
    }

    fn take_frame(&mut self) -> RawFrame {
        let data = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.max_telegram_length));
        let checksum = if self.capture_checksum {
            Some(std::mem::take(&mut self.checksum))
        } else {
            None
        };
        self.state = FrameState::Idle;
        debug!("Complete telegram of {} bytes received", data.len());
        RawFrame::new(data, checksum)
    }
}
