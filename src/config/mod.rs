use crate::obis::{get_well_known_sensor, ObisCode, ObisError};
use crate::pipeline::PipelineConfig;
use crate::sinks::{SensorKind, SensorSink};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const CONFIG_PATHS: [&str; 2] = ["p1meter.yaml", "config/p1meter.yaml"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to read config file {path}: {source}")]
    Io { path: String, source: io::Error },
    #[error("Unable to parse config file: {0}")]
    Yaml(#[from] serde_yml::Error),
    #[error("Sensor {sensor} has an invalid OBIS code: {source}")]
    InvalidObisCode { sensor: String, source: ObisError },
    #[error("Sensor {0} has no obis_code and is not a well-known sensor")]
    UnknownSensor(String),
    #[error("max_telegram_length must be larger than 0, got {0}")]
    InvalidTelegramLength(usize),
    #[error("No config file found, tried {0:?}")]
    NotFound(Vec<String>),
}

fn crc_check_default() -> bool { true }
fn max_telegram_length_default() -> usize { 1500 }
fn receive_timeout_default() -> u64 { 200 }
fn poll_interval_default() -> u64 { 20 }

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct PipelineSettings {
    #[serde(default="crc_check_default")]
    pub crc_check: bool,
    #[serde(default="max_telegram_length_default")]
    pub max_telegram_length: usize,
    /// Milliseconds
    #[serde(default="receive_timeout_default")]
    pub receive_timeout: u64,
    /// Milliseconds between two polls of the source
    #[serde(default="poll_interval_default")]
    pub poll_interval: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            crc_check: crc_check_default(),
            max_telegram_length: max_telegram_length_default(),
            receive_timeout: receive_timeout_default(),
            poll_interval: poll_interval_default(),
        }
    }
}

impl PipelineSettings {
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            crc_check: self.crc_check,
            max_telegram_length: self.max_telegram_length,
            receive_timeout: Duration::from_millis(self.receive_timeout),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval.max(1))
    }
}

fn baud_rate_default() -> u32 { 115200 }

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    #[default]
    Stdin,
    File { path: String },
    Serial {
        port: String,
        #[serde(default="baud_rate_default")]
        baud_rate: u32,
    },
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct SensorConfig {
    pub name: String,
    pub obis_code: Option<String>,
    #[serde(default)]
    pub kind: SensorKind,
}

impl SensorConfig {
    /// The configured code, or the default code of a well-known sensor name.
    pub fn resolve_code(&self) -> Result<ObisCode, ConfigError> {
        match &self.obis_code {
            Some(code) => code.parse().map_err(|source| ConfigError::InvalidObisCode {
                sensor: self.name.clone(),
                source,
            }),
            None => get_well_known_sensor(&self.name)
                .map(|sensor| sensor.code)
                .ok_or_else(|| ConfigError::UnknownSensor(self.name.clone())),
        }
    }
}

fn pipeline_default() -> PipelineSettings { PipelineSettings::default() }
fn source_default() -> SourceConfig { SourceConfig::Stdin }
fn report_interval_default() -> u64 { 60 }
fn sensors_default() -> Vec<SensorConfig> { Vec::new() }

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Config {
    #[serde(default="pipeline_default")]
    pub pipeline: PipelineSettings,
    #[serde(default="source_default")]
    pub source: SourceConfig,
    /// Seconds between two statistics reports
    #[serde(default="report_interval_default")]
    pub report_interval: u64,
    #[serde(default="sensors_default")]
    pub sensors: Vec<SensorConfig>,
}

impl Config {
    /// Loads the given file, or the first default location that exists.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        for candidate in CONFIG_PATHS {
            if Path::new(candidate).exists() {
                return Self::from_file(candidate);
            }
            debug!("No config file at {candidate}");
        }
        Err(ConfigError::NotFound(CONFIG_PATHS.iter().map(|p| p.to_string()).collect()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        info!("Loading config from {}", path.display());
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let contents = if contents.trim().is_empty() { "{}" } else { contents };
        let config: Config = serde_yml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.max_telegram_length == 0 {
            return Err(ConfigError::InvalidTelegramLength(self.pipeline.max_telegram_length));
        }
        for sensor in &self.sensors {
            sensor.resolve_code()?;
        }
        Ok(())
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval.max(1))
    }

    pub fn build_sensors(&self) -> Result<Vec<(ObisCode, Arc<SensorSink>)>, ConfigError> {
        self.sensors
            .iter()
            .map(|sensor| {
                let code = sensor.resolve_code()?;
                Ok((code, Arc::new(SensorSink::new(&sensor.name, sensor.kind))))
            })
            .collect()
    }

    pub fn log_summary(&self) {
        info!("Max telegram length: {}", self.pipeline.max_telegram_length);
        info!("Receive timeout: {} ms", self.pipeline.receive_timeout);
        info!("Poll interval: {} ms", self.pipeline.poll_interval);
        info!("CRC check: {}", if self.pipeline.crc_check { "enabled" } else { "disabled" });
        info!("Source: {:?}", self.source);
        for sensor in &self.sensors {
            match sensor.resolve_code() {
                Ok(code) => info!("Sensor {} on {code} ({:?})", sensor.name, sensor.kind),
                Err(e) => info!("Sensor {}: {e}", sensor.name),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.pipeline, PipelineSettings::default());
        assert!(config.pipeline.crc_check);
        assert_eq!(config.pipeline.max_telegram_length, 1500);
        assert_eq!(config.pipeline.receive_timeout, 200);
        assert_eq!(config.source, SourceConfig::Stdin);
        assert_eq!(config.report_interval, 60);
        assert!(config.sensors.is_empty());

        let pipeline = config.pipeline.to_pipeline_config();
        assert_eq!(pipeline, PipelineConfig::default());
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
pipeline:
  crc_check: false
  max_telegram_length: 2048
  receive_timeout: 500
source:
  type: serial
  port: /dev/ttyUSB0
report_interval: 10
sensors:
  - name: energy_imported
  - name: gas
    obis_code: "0-1:24.2.1"
  - name: timestamp
    obis_code: "0-0:1.0.0"
    kind: timestamp
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert!(!config.pipeline.crc_check);
        assert_eq!(config.pipeline.max_telegram_length, 2048);
        assert_eq!(config.pipeline.to_pipeline_config().receive_timeout, Duration::from_millis(500));
        assert_eq!(config.pipeline.poll_interval, 20);
        assert_eq!(
            config.source,
            SourceConfig::Serial { port: "/dev/ttyUSB0".to_string(), baud_rate: 115200 }
        );
        assert_eq!(config.report_interval(), Duration::from_secs(10));

        let sensors = config.build_sensors().unwrap();
        let codes: Vec<ObisCode> = sensors.iter().map(|(code, _)| *code).collect();
        assert_eq!(
            codes,
            vec![ObisCode::new(1, 0, 1, 8, 0), ObisCode::new(0, 1, 24, 2, 1), ObisCode::new(0, 0, 1, 0, 0)]
        );
        assert_eq!(sensors[1].1.sensor_kind(), SensorKind::Numeric);
        assert_eq!(sensors[2].1.sensor_kind(), SensorKind::Timestamp);
    }

    #[test]
    fn test_file_source() {
        let config = Config::from_yaml("source:\n  type: file\n  path: telegrams.txt\n").unwrap();
        assert_eq!(config.source, SourceConfig::File { path: "telegrams.txt".to_string() });
    }

    #[test]
    fn test_invalid_obis_code() {
        let yaml = "sensors:\n  - name: broken\n    obis_code: \"1-0:300.8.0\"\n";
        assert!(matches!(
            Config::from_yaml(yaml),
            Err(ConfigError::InvalidObisCode { sensor, .. }) if sensor == "broken"
        ));
    }

    #[test]
    fn test_unknown_sensor_without_code() {
        let yaml = "sensors:\n  - name: not_a_sensor\n";
        assert!(matches!(Config::from_yaml(yaml), Err(ConfigError::UnknownSensor(name)) if name == "not_a_sensor"));
    }

    #[test]
    fn test_zero_telegram_length() {
        let yaml = "pipeline:\n  max_telegram_length: 0\n";
        assert!(matches!(Config::from_yaml(yaml), Err(ConfigError::InvalidTelegramLength(0))));
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(Config::from_yaml("pipeline: [1, 2"), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "report_interval: 5").unwrap();
        writeln!(file, "sensors:").unwrap();
        writeln!(file, "  - name: voltage_l1").unwrap();

        let path = file.path().to_str().unwrap();
        let config = Config::load(Some(path)).unwrap();
        assert_eq!(config.report_interval, 5);
        assert_eq!(config.sensors[0].resolve_code().unwrap(), ObisCode::new(1, 0, 32, 7, 0));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.yaml");
        assert!(matches!(Config::from_file(&path), Err(ConfigError::Io { .. })));
    }
}
