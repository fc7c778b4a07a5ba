//! Helpers for interpreting value text. The decoder itself never calls them on
//! text values; they are offered to consumers that know what a code carries.

use chrono::NaiveDateTime;

/// Parses the full value text as a number, e.g. `001234.567` or `-12.5`.
pub fn parse_numeric_value(text: &str) -> Option<f64> {
    let value: f64 = text.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

/// DSMR timestamps look like `101209113020W`: YYMMDDhhmmss followed by `S`
/// (summer time) or `W` (winter time).
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if !text.is_ascii() {
        return None;
    }
    let digits = match text.len() {
        12 => text,
        13 if text.ends_with(['S', 'W']) => &text[..12],
        _ => return None,
    };
    NaiveDateTime::parse_from_str(digits, "%y%m%d%H%M%S").ok()
}

pub fn is_summer_time(text: &str) -> Option<bool> {
    match text.trim().chars().last()? {
        'S' => Some(true),
        'W' => Some(false),
        _ => None,
    }
}

/// Equipment identifiers and text messages are sent as hex encoded ASCII.
pub fn decode_hex_text(text: &str) -> Option<String> {
    let bytes = hex::decode(text.trim()).ok()?;
    String::from_utf8(bytes).ok()
}
