use std::{collections::BTreeMap, fmt};

/// A field value.
///
/// There is no integer variant: numeric values are always written as floats, so a field never changes column
/// type between writes.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    /// A floating-point value.
    Float(f64),

    /// A string value.
    String(String),
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(value) => write!(f, "{}", value),
            Self::String(value) => write!(f, "{:?}", value),
        }
    }
}

/// A single data point.
///
/// Tags and fields are kept in key order, which is also the order they are encoded in.
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, FieldValue>,
    timestamp: Option<i64>,
}

impl Point {
    /// Creates a new, empty `Point` for the given measurement.
    pub fn new<M: Into<String>>(measurement: M) -> Self {
        Self {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp: None,
        }
    }

    /// Adds a tag, replacing any existing tag with the same key.
    pub fn with_tag<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.insert_tag(key, value);
        self
    }

    /// Adds a field, replacing any existing field with the same key.
    pub fn with_field<K: Into<String>, V: Into<FieldValue>>(mut self, key: K, value: V) -> Self {
        self.insert_field(key, value);
        self
    }

    /// Sets the timestamp, in units of the precision the point is written with.
    ///
    /// Points without a timestamp are stamped by the server on arrival.
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Adds a tag, replacing any existing tag with the same key.
    pub fn insert_tag<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.tags.insert(key.into(), value.into());
    }

    /// Adds a field, replacing any existing field with the same key.
    pub fn insert_field<K: Into<String>, V: Into<FieldValue>>(&mut self, key: K, value: V) {
        self.fields.insert(key.into(), value.into());
    }

    /// Returns the measurement name.
    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    /// Returns the tags.
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Returns the fields.
    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    /// Returns the timestamp, if one was set.
    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    /// Returns `true` if the point has no fields.
    pub fn has_no_fields(&self) -> bool {
        self.fields.is_empty()
    }
}
