use crate::obis::ObisCode;

/// Bytes of one telegram from the start delimiter up to and including the
/// end delimiter, plus the checksum token captured after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    data: Vec<u8>,
    checksum: Option<String>,
}

impl RawFrame {
    pub fn new(data: Vec<u8>, checksum: Option<String>) -> Self {
        Self { data, checksum }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn checksum_token(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Content of one pair of parentheses, e.g. `001234.567*kWh`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueGroup {
    pub value: String,
    pub unit: Option<String>,
}

impl ValueGroup {
    pub fn parse(content: &str) -> Self {
        match content.split_once('*') {
            Some((value, unit)) if !unit.is_empty() => ValueGroup {
                value: value.to_string(),
                unit: Some(unit.to_string()),
            },
            Some((value, _)) => ValueGroup { value: value.to_string(), unit: None },
            None => ValueGroup { value: content.to_string(), unit: None },
        }
    }
}

/// OBIS code under which the identification line is delivered.
pub const IDENTIFICATION: ObisCode = ObisCode::new(0, 0, 0, 0, 0);

/// One decoded data line. It always carries at least one value group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLine {
    pub code: ObisCode,
    leading: Vec<ValueGroup>,
    primary: ValueGroup,
}

impl DataLine {
    pub fn new(code: ObisCode, value: ValueGroup) -> Self {
        Self { code, leading: Vec::new(), primary: value }
    }

    /// `None` when `groups` is empty.
    pub fn from_groups(code: ObisCode, mut groups: Vec<ValueGroup>) -> Option<Self> {
        let primary = groups.pop()?;
        Some(Self { code, leading: groups, primary })
    }

    pub fn push_value(&mut self, value: ValueGroup) {
        let previous = std::mem::replace(&mut self.primary, value);
        self.leading.push(previous);
    }

    /// All value groups in line order.
    pub fn values(&self) -> impl Iterator<Item = &ValueGroup> {
        self.leading.iter().chain(std::iter::once(&self.primary))
    }

    pub fn value_count(&self) -> usize {
        self.leading.len() + 1
    }

    /// The group consumers receive. Meters put the capture time of a
    /// measurement in front of it, so the measurement itself is the last group.
    pub fn primary(&self) -> &ValueGroup {
        &self.primary
    }

    pub fn value(&self) -> &str {
        &self.primary.value
    }

    pub fn unit(&self) -> Option<&str> {
        self.primary.unit.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Telegram {
    pub identification: String,
    pub lines: Vec<DataLine>,
}

impl Telegram {
    pub fn find(&self, code: &ObisCode) -> Option<&DataLine> {
        self.lines.iter().find(|line| line.code == *code)
    }

    /// The identification line as a text value on `0-0:0.0.0`.
    pub fn identification_line(&self) -> DataLine {
        DataLine::new(IDENTIFICATION, ValueGroup { value: self.identification.clone(), unit: None })
    }
}
