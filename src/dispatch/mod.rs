use crate::obis::ObisCode;
use crate::telegram::value::parse_numeric_value;
use crate::telegram::{DataLine, Telegram, TelegramError, ValueGroup};
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// What a sink wants to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Numeric,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reading {
    Numeric { value: f64, unit: Option<String> },
    Text { text: String, unit: Option<String> },
}

impl Reading {
    pub fn from_group(kind: ValueKind, code: &ObisCode, group: &ValueGroup) -> Result<Self, TelegramError> {
        match kind {
            ValueKind::Numeric => parse_numeric_value(&group.value)
                .map(|value| Reading::Numeric { value, unit: group.unit.clone() })
                .ok_or_else(|| TelegramError::ValueParseFailure { code: *code, value: group.value.clone() }),
            ValueKind::Text => Ok(Reading::Text { text: group.value.clone(), unit: group.unit.clone() }),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Reading::Numeric { value, .. } => Some(*value),
            Reading::Text { .. } => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Reading::Text { text, .. } => Some(text),
            Reading::Numeric { .. } => None,
        }
    }

    pub fn unit(&self) -> Option<&str> {
        match self {
            Reading::Numeric { unit, .. } | Reading::Text { unit, .. } => unit.as_deref(),
        }
    }
}

/// A downstream measurement endpoint.
///
/// Sinks are shared with their owner and only get `&self`, so any state they
/// keep needs interior mutability.
pub trait MeasurementSink: Send + Sync {
    fn kind(&self) -> ValueKind;

    fn publish(&self, code: &ObisCode, reading: &Reading);
}

pub type SinkHandle = Arc<dyn MeasurementSink>;

#[derive(Default)]
pub struct RegistrationTableBuilder {
    sinks: HashMap<ObisCode, Vec<SinkHandle>>,
}

impl RegistrationTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, code: ObisCode, sink: SinkHandle) -> &mut Self {
        let sinks = self.sinks.entry(code).or_default();
        if sinks.is_empty() {
            debug!("Adding new sink list for {code}");
        } else {
            debug!("Adding a new sink to known list for {code}");
        }
        sinks.push(sink);
        self
    }

    pub fn build(self) -> RegistrationTable {
        RegistrationTable { sinks: self.sinks }
    }
}

/// Outcome of dispatching one telegram.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DispatchReport {
    /// Number of `publish` calls made.
    pub delivered: usize,
    pub unregistered: usize,
    pub failures: Vec<TelegramError>,
}

/// Immutable map from OBIS code to the sinks interested in it.
///
/// Built once by [`RegistrationTableBuilder`]; there is no way to change it
/// afterwards.
pub struct RegistrationTable {
    sinks: HashMap<ObisCode, Vec<SinkHandle>>,
}

impl RegistrationTable {
    pub fn builder() -> RegistrationTableBuilder {
        RegistrationTableBuilder::new()
    }

    pub fn is_registered(&self, code: &ObisCode) -> bool {
        self.sinks.contains_key(code)
    }

    pub fn registered_codes(&self) -> Vec<ObisCode> {
        let mut codes: Vec<ObisCode> = self.sinks.keys().copied().collect();
        codes.sort();
        codes
    }

    pub fn len(&self) -> usize {
        self.sinks.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Delivers the identification line on `0-0:0.0.0` first, then every
    /// data line in telegram order.
    pub fn dispatch(&self, telegram: &Telegram) -> DispatchReport {
        let mut report = DispatchReport::default();
        self.dispatch_line(&telegram.identification_line(), &mut report);
        for line in &telegram.lines {
            self.dispatch_line(line, &mut report);
        }
        report
    }

    fn dispatch_line(&self, line: &DataLine, report: &mut DispatchReport) {
        let Some(sinks) = self.sinks.get(&line.code) else {
            trace!("No sink registered for {}", line.code);
            report.unregistered += 1;
            return;
        };

        let group = line.primary();
        let mut numeric: Option<Result<Reading, TelegramError>> = None;
        let mut text: Option<Reading> = None;

        for sink in sinks {
            let reading = match sink.kind() {
                ValueKind::Numeric => {
                    let parsed = numeric.get_or_insert_with(|| {
                        Reading::from_group(ValueKind::Numeric, &line.code, group).inspect_err(|e| {
                            warn!("Error: {e}");
                        })
                    });
                    match parsed {
                        Ok(reading) => &*reading,
                        Err(_) => continue,
                    }
                }
                ValueKind::Text => &*text.get_or_insert_with(|| Reading::Text {
                    text: group.value.clone(),
                    unit: group.unit.clone(),
                }),
            };
            sink.publish(&line.code, reading);
            report.delivered += 1;
        }

        if let Some(Err(e)) = numeric {
            report.failures.push(e);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::telegram::{parse_obis_line, IDENTIFICATION};
    use std::sync::Mutex;

    /// Sink that remembers every call, shared with the pipeline tests.
    pub(crate) struct RecordingSink {
        kind: ValueKind,
        pub(crate) calls: Mutex<Vec<(ObisCode, Reading)>>,
    }

    impl RecordingSink {
        pub(crate) fn new(kind: ValueKind) -> Arc<Self> {
            Arc::new(Self { kind, calls: Mutex::new(Vec::new()) })
        }

        pub(crate) fn calls(&self) -> Vec<(ObisCode, Reading)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl MeasurementSink for RecordingSink {
        fn kind(&self) -> ValueKind {
            self.kind
        }

        fn publish(&self, code: &ObisCode, reading: &Reading) {
            self.calls.lock().unwrap().push((*code, reading.clone()));
        }
    }

    fn telegram(lines: &[&str]) -> Telegram {
        Telegram {
            identification: "TEST".to_string(),
            lines: lines.iter().map(|l| parse_obis_line(l).unwrap()).collect(),
        }
    }

    #[test]
    fn test_registered_code_is_delivered() {
        let sink = RecordingSink::new(ValueKind::Numeric);
        let mut builder = RegistrationTable::builder();
        builder.register(ObisCode::new(1, 0, 1, 8, 0), sink.clone());
        let table = builder.build();

        let report = table.dispatch(&telegram(&["1-0:1.8.0(001234.567*kWh)", "0-0:96.1.1(4B384547)"]));
        assert_eq!(report.delivered, 1);
        // identification line and 0-0:96.1.1
        assert_eq!(report.unregistered, 2);
        assert!(report.failures.is_empty());
        assert_eq!(
            sink.calls(),
            vec![(
                ObisCode::new(1, 0, 1, 8, 0),
                Reading::Numeric { value: 1234.567, unit: Some("kWh".to_string()) }
            )]
        );
    }

    #[test]
    fn test_multiple_sinks_on_one_code() {
        let numeric = RecordingSink::new(ValueKind::Numeric);
        let text = RecordingSink::new(ValueKind::Text);
        let code = ObisCode::new(1, 0, 32, 7, 0);
        let mut builder = RegistrationTable::builder();
        builder.register(code, numeric.clone()).register(code, text.clone());
        let table = builder.build();
        assert_eq!(table.len(), 2);
        assert_eq!(table.registered_codes(), vec![code]);

        let report = table.dispatch(&telegram(&["1-0:32.7.0(230.1*V)"]));
        assert_eq!(report.delivered, 2);
        assert_eq!(numeric.calls()[0].1.as_f64(), Some(230.1));
        assert_eq!(text.calls()[0].1.as_text(), Some("230.1"));
        assert_eq!(text.calls()[0].1.unit(), Some("V"));
    }

    #[test]
    fn test_value_parse_failure_only_affects_its_line() {
        let numeric = RecordingSink::new(ValueKind::Numeric);
        let text = RecordingSink::new(ValueKind::Text);
        let mut builder = RegistrationTable::builder();
        builder
            .register(ObisCode::new(0, 0, 1, 0, 0), numeric.clone())
            .register(ObisCode::new(0, 0, 1, 0, 0), text.clone())
            .register(ObisCode::new(1, 0, 1, 8, 0), numeric.clone());
        let table = builder.build();

        let report = table.dispatch(&telegram(&["0-0:1.0.0(101209113020W)", "1-0:1.8.0(5.5*kWh)"]));
        assert_eq!(
            report.failures,
            vec![TelegramError::ValueParseFailure {
                code: ObisCode::new(0, 0, 1, 0, 0),
                value: "101209113020W".to_string()
            }]
        );
        assert_eq!(report.delivered, 2);
        assert_eq!(text.calls()[0].1.as_text(), Some("101209113020W"));
        assert_eq!(numeric.calls(), vec![(ObisCode::new(1, 0, 1, 8, 0), Reading::Numeric {
            value: 5.5,
            unit: Some("kWh".to_string())
        })]);
    }

    #[test]
    fn test_duplicate_lines_are_each_delivered() {
        let sink = RecordingSink::new(ValueKind::Numeric);
        let mut builder = RegistrationTable::builder();
        builder.register(ObisCode::new(1, 0, 1, 8, 0), sink.clone());
        let table = builder.build();

        table.dispatch(&telegram(&["1-0:1.8.0(1)", "1-0:1.8.0(2)"]));
        let values: Vec<f64> = sink.calls().iter().filter_map(|(_, r)| r.as_f64()).collect();
        assert_eq!(values, vec![1.0, 2.0]);
    }

    #[test]
    fn test_empty_table() {
        let table = RegistrationTable::builder().build();
        assert!(table.is_empty());
        let report = table.dispatch(&telegram(&["1-0:1.8.0(1)"]));
        assert_eq!(report, DispatchReport { delivered: 0, unregistered: 2, failures: vec![] });
    }

    #[test]
    fn test_identification_is_delivered_as_text() {
        let text = RecordingSink::new(ValueKind::Text);
        let numeric = RecordingSink::new(ValueKind::Numeric);
        let mut builder = RegistrationTable::builder();
        builder
            .register(IDENTIFICATION, text.clone())
            .register(ObisCode::new(1, 0, 1, 8, 0), numeric.clone());
        let table = builder.build();

        let report = table.dispatch(&telegram(&["1-0:1.8.0(1.5*kWh)"]));
        assert_eq!(report.delivered, 2);
        assert_eq!(
            text.calls(),
            vec![(IDENTIFICATION, Reading::Text { text: "TEST".to_string(), unit: None })]
        );
        assert_eq!(numeric.calls()[0].1.as_f64(), Some(1.5));
    }
}
