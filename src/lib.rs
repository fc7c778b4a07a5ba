//! P1 port reader for DSMR / IEC 62056-21 smart meters
//!
//! This library turns the byte stream of a smart meter into complete, checksum
//! verified telegrams and hands every OBIS value to the consumers registered
//! for its code.

pub mod config;
pub mod dispatch;
pub mod obis;
pub mod pipeline;
pub mod sinks;
pub mod telegram;

// Re-export common types for easier access
pub use config::{Config, ConfigError};
pub use dispatch::{MeasurementSink, Reading, RegistrationTable, RegistrationTableBuilder, ValueKind};
pub use obis::ObisCode;
pub use pipeline::{ByteSource, Pipeline, PipelineConfig, PipelineStats};
pub use sinks::{SensorKind, SensorSink};
pub use telegram::TelegramError;
