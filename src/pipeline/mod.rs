use crate::dispatch::{DispatchReport, RegistrationTable};
use crate::telegram::{decode_telegram, validate_frame, FrameAccumulator, FrameState, RawFrame, TelegramError};
use log::{debug, info, trace};
use serde::Serialize;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub mod sources;

pub use sources::{pump, ByteSource, ChannelSource, QueueSource};

const READ_CHUNK: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub crc_check: bool,
    pub max_telegram_length: usize,
    pub receive_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            crc_check: true,
            max_telegram_length: 1500,
            receive_timeout: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    Idle,
    Accumulating,
    Validating,
    Decoding,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub bytes_received: u64,
    pub telegrams_received: u64,
    pub telegrams_dispatched: u64,
    pub overflows: u64,
    pub timeouts: u64,
    pub checksum_failures: u64,
    pub value_parse_failures: u64,
    pub values_delivered: u64,
    pub unregistered_lines: u64,
}

impl PipelineStats {
    fn record_error(&mut self, error: &TelegramError) {
        match error {
            TelegramError::FrameOverflow { .. } => self.overflows += 1,
            TelegramError::FrameTimeout { .. } => self.timeouts += 1,
            TelegramError::ChecksumMismatch { .. } | TelegramError::InvalidChecksum(_) => {
                self.checksum_failures += 1
            }
            TelegramError::ValueParseFailure { .. } => self.value_parse_failures += 1,
            TelegramError::LineUnparseable(_) => {}
        }
    }
}

/// What a single poll (or feed) achieved.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PollReport {
    pub bytes_read: usize,
    pub telegrams_dispatched: usize,
    pub values_delivered: usize,
    pub errors: Vec<TelegramError>,
    /// Set when the source reported that the stream is gone.
    pub source_closed: Option<io::ErrorKind>,
}

impl PollReport {
    pub fn is_source_closed(&self) -> bool {
        self.source_closed.is_some()
    }
}

/// Drives bytes through accumulation, validation, decoding and dispatch.
///
/// A pipeline owns the in-progress frame of exactly one stream. Calls take
/// `&mut self`, so one tick can never overlap another.
pub struct Pipeline {
    config: PipelineConfig,
    table: Arc<RegistrationTable>,
    accumulator: FrameAccumulator,
    state: PipelineState,
    stats: PipelineStats,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, table: Arc<RegistrationTable>) -> Self {
        let accumulator = FrameAccumulator::new(config.max_telegram_length, config.receive_timeout, config.crc_check);
        Self {
            config,
            table,
            accumulator,
            state: PipelineState::Idle,
            stats: PipelineStats::default(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn table(&self) -> &RegistrationTable {
        &self.table
    }

    /// One scheduler tick: drops a partial telegram older than the receive
    /// timeout, then drains the source without blocking and runs every
    /// completed telegram through to its consumers.
    ///
    /// Loss of the stream is reported through `source_closed`; whatever was
    /// read before that in the same tick is still processed and reported.
    pub fn poll<S: ByteSource + ?Sized>(&mut self, source: &mut S, now: Instant) -> PollReport {
        let mut report = PollReport::default();
        let mut buf = [0u8; READ_CHUNK];

        if let Some(e) = self.accumulator.check_timeout(now) {
            self.stats.record_error(&e);
            report.errors.push(e);
        }

        loop {
            match source.read_available(&mut buf) {
                Ok(0) => break,
                Ok(count) => self.feed_into(&buf[..count], now, &mut report),
                Err(e) => {
                    info!("Byte source closed: {e}");
                    report.source_closed = Some(e.kind());
                    break;
                }
            }
        }

        self.sync_state();
        report
    }

    /// Feeds bytes that were read elsewhere.
    pub fn feed(&mut self, bytes: &[u8], now: Instant) -> PollReport {
        let mut report = PollReport::default();
        self.feed_into(bytes, now, &mut report);
        report
    }

    /// Validates, decodes and dispatches one complete frame.
    pub fn process_frame(&mut self, frame: &RawFrame) -> Result<DispatchReport, TelegramError> {
        self.transition(PipelineState::Validating);
        if let Err(e) = validate_frame(frame, self.config.crc_check) {
            self.stats.record_error(&e);
            self.transition(PipelineState::Idle);
            return Err(e);
        }

        self.transition(PipelineState::Decoding);
        let telegram = decode_telegram(frame);
        let dispatch = self.table.dispatch(&telegram);

        self.stats.telegrams_dispatched += 1;
        self.stats.values_delivered += dispatch.delivered as u64;
        self.stats.unregistered_lines += dispatch.unregistered as u64;
        for e in &dispatch.failures {
            self.stats.record_error(e);
        }
        debug!(
            "Telegram '{}' dispatched: {} values delivered, {} lines unregistered",
            telegram.identification, dispatch.delivered, dispatch.unregistered
        );

        self.transition(PipelineState::Idle);
        Ok(dispatch)
    }

    fn feed_into(&mut self, bytes: &[u8], now: Instant, report: &mut PollReport) {
        report.bytes_read += bytes.len();
        self.stats.bytes_received += bytes.len() as u64;

        for result in self.accumulator.feed(bytes, now) {
            let frame = match result {
                Ok(frame) => frame,
                Err(e) => {
                    self.stats.record_error(&e);
                    report.errors.push(e);
                    continue;
                }
            };

            self.stats.telegrams_received += 1;
            match self.process_frame(&frame) {
                Ok(dispatch) => {
                    report.telegrams_dispatched += 1;
                    report.values_delivered += dispatch.delivered;
                    report.errors.extend(dispatch.failures);
                }
                Err(e) => report.errors.push(e),
            }
        }

        self.sync_state();
    }

    fn sync_state(&mut self) {
        let next = match self.accumulator.state() {
            FrameState::Idle => PipelineState::Idle,
            FrameState::Accumulating { .. } | FrameState::Checksum { .. } => PipelineState::Accumulating,
        };
        self.transition(next);
    }

    fn transition(&mut self, next: PipelineState) {
        if self.state != next {
            trace!("Pipeline state {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}
