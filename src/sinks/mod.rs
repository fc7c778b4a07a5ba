use crate::dispatch::{MeasurementSink, Reading, ValueKind};
use crate::obis::ObisCode;
use crate::telegram::value::{decode_hex_text, parse_timestamp};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;

/// How a sensor interprets the value text it receives.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    #[default]
    Numeric,
    Text,
    /// `YYMMDDhhmmssX` timestamps, stored as ISO 8601.
    Timestamp,
    /// Hex encoded ASCII such as equipment identifiers.
    HexText,
}

impl SensorKind {
    pub fn value_kind(&self) -> ValueKind {
        match self {
            SensorKind::Numeric => ValueKind::Numeric,
            SensorKind::Text | SensorKind::Timestamp | SensorKind::HexText => ValueKind::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorState {
    pub code: ObisCode,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub updated: DateTime<Utc>,
}

/// Keeps the latest value received for one named sensor.
pub struct SensorSink {
    name: String,
    kind: SensorKind,
    state: Mutex<Option<SensorState>>,
}

impl SensorSink {
    pub fn new(name: &str, kind: SensorKind) -> Self {
        Self { name: name.to_string(), kind, state: Mutex::new(None) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sensor_kind(&self) -> SensorKind {
        self.kind
    }

    pub fn snapshot(&self) -> Option<SensorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn interpret(&self, reading: &Reading) -> Option<Value> {
        match (self.kind, reading) {
            (SensorKind::Numeric, Reading::Numeric { value, .. }) => Some(Value::from(*value)),
            (SensorKind::Text, Reading::Text { text, .. }) => Some(Value::from(text.as_str())),
            (SensorKind::Timestamp, Reading::Text { text, .. }) => parse_timestamp(text)
                .map(|ts| Value::from(ts.format("%Y-%m-%dT%H:%M:%S").to_string())),
            (SensorKind::HexText, Reading::Text { text, .. }) => decode_hex_text(text).map(Value::from),
            _ => None,
        }
    }
}

impl MeasurementSink for SensorSink {
    fn kind(&self) -> ValueKind {
        self.kind.value_kind()
    }

    fn publish(&self, code: &ObisCode, reading: &Reading) {
        let Some(value) = self.interpret(reading) else {
            warn!("Sensor {} is unable to interpret {reading:?} of {code} as {:?}", self.name, self.kind);
            return;
        };

        debug!("Sensor {} updated to {value}", self.name);
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *state = Some(SensorState {
            code: *code,
            value,
            unit: reading.unit().map(str::to_string),
            updated: Utc::now(),
        });
    }
}
