//! Coercion of raw poller values into storable field values.

use std::fmt;

use fluxgate_influx::FieldValue;

/// Sample value used by pollers to mark an unknown or undefined reading.
pub const UNKNOWN_SAMPLE: &str = "U";

/// A field value as handed over by a poller, before coercion.
#[derive(Clone, Debug, PartialEq)]
pub enum RawFieldValue {
    /// An integer.
    Integer(i64),

    /// A floating-point number.
    Float(f64),

    /// A string, which may or may not hold a number.
    String(String),

    /// No value.
    Null,
}

impl From<i64> for RawFieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for RawFieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for RawFieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for RawFieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl<T> From<Option<T>> for RawFieldValue
where
    T: Into<RawFieldValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

impl fmt::Display for RawFieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{}", value),
            Self::Float(value) => write!(f, "{}", value),
            Self::String(value) => write!(f, "{:?}", value),
            Self::Null => f.write_str("null"),
        }
    }
}

/// Normalizes a raw field value into something that can be written.
///
/// Every numeric value, including numeric strings, becomes a float: the store types a field by its first write and
/// rejects later writes of a different type, and integer and float readings of the same field are common. The unknown
/// sample marker `U` and nulls yield `None`, meaning the field is dropped. Other strings pass through unchanged.
pub fn force_type(value: &RawFieldValue) -> Option<FieldValue> {
    match value {
        RawFieldValue::Integer(i) => Some(FieldValue::Float(*i as f64)),
        RawFieldValue::Float(f) => Some(FieldValue::Float(*f)),
        RawFieldValue::String(s) if s == UNKNOWN_SAMPLE => None,
        RawFieldValue::String(s) => match parse_numeric(s) {
            Some(f) => Some(FieldValue::Float(f)),
            None => Some(FieldValue::String(s.clone())),
        },
        RawFieldValue::Null => None,
    }
}

/// Parses a numeric string.
///
/// Accepts decimal integers and decimal floats with an optional sign, fraction and exponent, surrounded by optional
/// ASCII whitespace. Rejects everything else, notably `inf`, `NaN` and hexadecimal, which `f64::from_str` would
/// otherwise accept in part.
fn parse_numeric(s: &str) -> Option<f64> {
    let trimmed = s.trim_matches(|c: char| c.is_ascii_whitespace() || c == '\x0b');
    if !is_decimal_literal(trimmed.as_bytes()) {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

fn is_decimal_literal(bytes: &[u8]) -> bool {
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;

    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        digits += i - frac_start;
    }

    if digits == 0 {
        return false;
    }

    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }

    i == bytes.len()
}
