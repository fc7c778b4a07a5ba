use super::{DataLine, RawFrame, Telegram, TelegramError, ValueGroup, END_DELIMITER, START_DELIMITER};
use crate::obis::ObisCode;
use log::{debug, trace};

/// Decodes a complete frame into its data lines.
///
/// Unrecognised lines (blank lines, vendor extensions, malformed codes) are
/// skipped. A line that starts with `(` continues the previous data line.
pub fn decode_telegram(frame: &RawFrame) -> Telegram {
    let text = String::from_utf8_lossy(frame.data());
    let mut lines = text.split('\n');

    let mut telegram = Telegram {
        identification: lines.next().map(parse_identification_line).unwrap_or_default(),
        lines: Vec::new(),
    };

    let mut previous_parsed = false;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.as_bytes()[0] == END_DELIMITER {
            trace!("End of telegram found");
            break;
        }

        if line.starts_with('(') {
            match (previous_parsed, telegram.lines.last_mut(), parse_value_groups(line)) {
                (true, Some(data_line), Some(groups)) => {
                    for group in groups {
                        data_line.push_value(group);
                    }
                }
                _ => trace!("Skipping dangling value line '{line}'"),
            }
            continue;
        }

        match parse_obis_line(line) {
            Ok(data_line) => {
                telegram.lines.push(data_line);
                previous_parsed = true;
            }
            Err(e) => {
                trace!("{e}");
                previous_parsed = false;
            }
        }
    }

    debug!(
        "Decoded telegram '{}' with {} data lines",
        telegram.identification,
        telegram.lines.len()
    );
    telegram
}

/// Parses `A-B:C.D.E(value)` or `A-B:C.D.E(value*unit)`, possibly with more
/// than one value group. Any of `-:.*` is accepted between the code groups.
pub fn parse_obis_line(line: &str) -> Result<DataLine, TelegramError> {
    let line = line.trim();
    let unparseable = || TelegramError::LineUnparseable(line.to_string());

    let paren_start = line.find('(').ok_or_else(unparseable)?;
    let code = ObisCode::parse_tolerant(&line[..paren_start]).map_err(|_| unparseable())?;
    let values = parse_value_groups(&line[paren_start..]).ok_or_else(unparseable)?;

    DataLine::from_groups(code, values).ok_or_else(unparseable)
}

fn parse_value_groups(text: &str) -> Option<Vec<ValueGroup>> {
    let mut groups = Vec::new();
    let mut rest = text.trim_end();

    while !rest.is_empty() {
        let inner = rest.strip_prefix('(')?;
        let paren_end = inner.find(')')?;
        groups.push(ValueGroup::parse(&inner[..paren_end]));
        rest = &inner[paren_end + 1..];
    }

    (!groups.is_empty()).then_some(groups)
}

pub fn parse_identification_line(line: &str) -> String {
    let line = line.trim();
    match line.as_bytes().first() {
        Some(&START_DELIMITER) => line[1..].to_string(),
        _ => line.to_string(),
    }
}
