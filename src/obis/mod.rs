use lazy_static::lazy_static;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod catalogue;

pub use catalogue::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObisError {
    #[error("OBIS code must be on the format A-B:C.D.E, got `{0}`")]
    InvalidFormat(String),
    #[error("OBIS code component {component} is out of range [0, 255] in `{code}`")]
    ComponentOutOfRange { code: String, component: u16 },
}

lazy_static! {
    // A-B:C.D.E with an optional sixth group that is not part of the identity
    static ref OBIS_PATTERN: Regex =
        Regex::new(r"^(\d{1,3})-(\d{1,3}):(\d{1,3})\.(\d{1,3})\.(\d{1,3})(?:\*(\d{1,3}))?$").unwrap();

    // Meters in the field mix up the separators, e.g. `1-0:99:97.0`
    static ref TOLERANT_OBIS_PATTERN: Regex =
        Regex::new(r"^(\d{1,3})[-:.*](\d{1,3})[-:.*](\d{1,3})[-:.*](\d{1,3})[-:.*](\d{1,3})(?:[-:.*](\d{1,3}))?$").unwrap();
}

/// Object Identification System code.
///
/// Only the five groups A to E take part in equality and hashing. A trailing
/// `*F` group is accepted while parsing but dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObisCode([u8; 5]);

impl ObisCode {
    pub const fn new(a: u8, b: u8, c: u8, d: u8, e: u8) -> Self {
        ObisCode([a, b, c, d, e])
    }

    pub fn parts(&self) -> [u8; 5] {
        self.0
    }

    pub fn medium(&self) -> u8 {
        self.0[0]
    }

    pub fn channel(&self) -> u8 {
        self.0[1]
    }

    pub fn description(&self) -> Option<&'static str> {
        get_obis_description(self)
    }

    /// Parses a code as it appears on a telegram data line, where any of
    /// `-`, `:`, `.` and `*` may separate the groups.
    pub fn parse_tolerant(s: &str) -> Result<Self, ObisError> {
        Self::from_pattern(&TOLERANT_OBIS_PATTERN, s)
    }

    fn from_pattern(pattern: &Regex, s: &str) -> Result<Self, ObisError> {
        let code = normalize_obis_code(s);
        let captures = pattern
            .captures(code)
            .ok_or_else(|| ObisError::InvalidFormat(code.to_string()))?;

        let mut parts = [0u8; 5];
        // Group 6 (the storage tag) is range checked as well, but not kept
        for group in 1..=6 {
            let Some(m) = captures.get(group) else {
                continue;
            };
            let component: u16 = m
                .as_str()
                .parse()
                .map_err(|_| ObisError::InvalidFormat(code.to_string()))?;
            let value = u8::try_from(component).map_err(|_| ObisError::ComponentOutOfRange {
                code: code.to_string(),
                component,
            })?;
            if group <= 5 {
                parts[group - 1] = value;
            }
        }

        Ok(ObisCode(parts))
    }
}

impl FromStr for ObisCode {
    type Err = ObisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_pattern(&OBIS_PATTERN, s)
    }
}

impl fmt::Display for ObisCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e] = self.0;
        write!(f, "{a}-{b}:{c}.{d}.{e}")
    }
}

impl Serialize for ObisCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub fn get_obis_description(obis_code: &ObisCode) -> Option<&'static str> {
    STANDARD_OBIS_DESCRIPTIONS.get(obis_code).copied()
}

lazy_static! {
    static ref STANDARD_OBIS_DESCRIPTIONS: HashMap<ObisCode, &'static str> = get_standard_obis_descriptions();
}

fn get_standard_obis_descriptions() -> HashMap<ObisCode, &'static str> {
    let mut map = HashMap::new();

    for sensor in WELL_KNOWN_SENSORS {
        map.insert(sensor.code, sensor.description);
    }

    // Codes found in DSMR telegrams that are usually exposed as text
    map.insert(ObisCode::new(1, 3, 0, 2, 8), "DSMR version");
    map.insert(ObisCode::new(0, 0, 1, 0, 0), "Date and time");
    map.insert(ObisCode::new(0, 0, 96, 1, 1), "Equipment identifier");
    map.insert(ObisCode::new(0, 0, 96, 14, 0), "Tariff indicator");
    map.insert(ObisCode::new(0, 0, 17, 0, 0), "Actual threshold electricity");
    map.insert(ObisCode::new(0, 0, 96, 3, 10), "Switch position electricity");
    map.insert(ObisCode::new(0, 0, 96, 7, 21), "Number of power failures");
    map.insert(ObisCode::new(0, 0, 96, 7, 9), "Number of long power failures");
    map.insert(ObisCode::new(1, 0, 99, 97, 0), "Power failure event log");
    map.insert(ObisCode::new(0, 0, 96, 13, 0), "Text message");
    map.insert(ObisCode::new(0, 1, 24, 2, 1), "Gas meter reading");

    // Frequency and power factor
    map.insert(ObisCode::new(1, 0, 14, 7, 0), "Supply frequency");
    map.insert(ObisCode::new(1, 0, 13, 7, 0), "Power factor");

    map
}

pub fn validate_obis_code(code: &str) -> bool {
    code.parse::<ObisCode>().is_ok()
}

pub fn normalize_obis_code(code: &str) -> &str {
    code.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_obis_code() {
        let code: ObisCode = "1-0:1.8.0".parse().unwrap();
        assert_eq!(code, ObisCode::new(1, 0, 1, 8, 0));
        assert_eq!(code.medium(), 1);
        assert_eq!(code.channel(), 0);
    }

    #[test]
    fn test_storage_tag_is_ignored_for_identity() {
        let plain: ObisCode = "1-0:1.8.0".parse().unwrap();
        let tagged: ObisCode = "1-0:1.8.0*255".parse().unwrap();
        let other_tag: ObisCode = "1-0:1.8.0*254".parse().unwrap();
        assert_eq!(plain, tagged);
        assert_eq!(plain, other_tag);
        assert!("1-0:1.8.0*256".parse::<ObisCode>().is_err());
    }

    #[test]
    fn test_validate_obis_code() {
        assert!(validate_obis_code("1-0:1.8.1"));
        assert!(validate_obis_code("0-0:1.0.0"));
        assert!(validate_obis_code("1-0:15.7.0"));
        assert!(validate_obis_code(" 255-255:255.255.255 "));
        assert!(!validate_obis_code("invalid"));
        assert!(!validate_obis_code("1:2.3.4"));
        assert!(!validate_obis_code("1-0:1.8"));
        assert!(!validate_obis_code("1-0:999.8.0"));
        assert!(!validate_obis_code("1-0:256.8.0"));
        assert!(!validate_obis_code("1-0:1.8.0(12)"));
    }

    #[test]
    fn test_parse_tolerant_separators() {
        assert_eq!(ObisCode::parse_tolerant("1-0:99:97.0"), Ok(ObisCode::new(1, 0, 99, 97, 0)));
        assert_eq!(ObisCode::parse_tolerant("1-0:72:32.0"), Ok(ObisCode::new(1, 0, 72, 32, 0)));
        assert_eq!(ObisCode::parse_tolerant("1.0.1.8.0*255"), Ok(ObisCode::new(1, 0, 1, 8, 0)));
        assert_eq!(ObisCode::parse_tolerant("1-0:1.8.0"), "1-0:1.8.0".parse());
        assert!(ObisCode::parse_tolerant("1-0:256.8.0").is_err());
        assert!(ObisCode::parse_tolerant("1-0:1.8.0*256").is_err());
        assert!(ObisCode::parse_tolerant("1-0:1.8").is_err());
        assert!(ObisCode::parse_tolerant("1-0/1.8.0").is_err());

        // configuration keeps the strict format
        assert!("1-0:99:97.0".parse::<ObisCode>().is_err());
    }

    #[test]
    fn test_out_of_range_component() {
        let err = "1-0:256.8.0".parse::<ObisCode>().unwrap_err();
        assert_eq!(
            err,
            ObisError::ComponentOutOfRange { code: "1-0:256.8.0".to_string(), component: 256 }
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(ObisCode::new(0, 1, 24, 2, 1).to_string(), "0-1:24.2.1");
    }

    #[test]
    fn test_get_obis_description() {
        assert_eq!(ObisCode::new(1, 0, 1, 8, 1).description(), Some("Active energy + (tariff 1)"));
        assert_eq!(ObisCode::new(0, 0, 96, 1, 1).description(), Some("Equipment identifier"));
        assert_eq!(ObisCode::new(9, 9, 9, 9, 9).description(), None);
    }

    #[test]
    fn test_serde_as_string() {
        let code = ObisCode::new(1, 0, 32, 7, 0);
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"1-0:32.7.0\"");
    }

    proptest! {
        #[test]
        fn prop_parse_reconstructs_components(a: u8, b: u8, c: u8, d: u8, e: u8) {
            let text = format!("{a}-{b}:{c}.{d}.{e}");
            let code: ObisCode = text.parse().unwrap();
            prop_assert_eq!(code.parts(), [a, b, c, d, e]);
            prop_assert_eq!(code.to_string(), text);
        }

        #[test]
        fn prop_component_above_255_fails(pos in 0usize..5, big in 256u16..1000) {
            let mut parts = ["1", "0", "1", "8", "0"].map(String::from);
            parts[pos] = big.to_string();
            let text = format!("{}-{}:{}.{}.{}", parts[0], parts[1], parts[2], parts[3], parts[4]);
            prop_assert!(text.parse::<ObisCode>().is_err());
        }
    }
}
