//! Native document values.
//!
//! Documents handed to and returned from the mapper are ordered maps of [`Value`]s. The
//! enum mirrors JSON with two additions the store cares about: dates and raw binary.

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An in-memory document: attribute name to value, in insertion order.
pub type Document = IndexMap<String, Value>;

/// A native attribute value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer or floating point number.
    Number(serde_json::Number),
    /// UTF-8 string.
    String(String),
    /// Point in time, stored with millisecond precision.
    Date(DateTime<Utc>),
    /// Raw bytes.
    Binary(Vec<u8>),
    /// Ordered sequence.
    Array(Vec<Value>),
    /// Nested document.
    Object(Document),
}

impl Value {
    /// Whether the value counts as missing: `Null` or the empty string.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::String(string) => string.is_empty(),
            _ => false,
        }
    }

    /// Returns the string slice if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(string) => Some(string),
            _ => None,
        }
    }

    /// Returns the boolean if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(boolean) => Some(*boolean),
            _ => None,
        }
    }

    /// Returns the number as `i64` if it is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(number) => number.as_i64(),
            _ => None,
        }
    }

    /// Returns the number as `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(number) => number.as_f64(),
            _ => None,
        }
    }

    /// Returns the date if this is a date.
    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::Date(date) => Some(date),
            _ => None,
        }
    }

    /// Returns the elements if this is an array.
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Self::Array(array) => Some(array),
            _ => None,
        }
    }

    /// Returns the nested document if this is an object.
    pub fn as_object(&self) -> Option<&Document> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Consumes the value, returning the nested document if this is an object.
    pub fn into_document(self) -> Option<Document> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Plain string rendering used for scalar wire values.
    pub(crate) fn stringify(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(boolean) => boolean.to_string(),
            Self::Number(number) => number.to_string(),
            Self::String(string) => string.clone(),
            Self::Date(date) => date.to_rfc3339_opts(SecondsFormat::Millis, true),
            Self::Binary(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            Self::Array(_) | Self::Object(_) => self.to_json().to_string(),
        }
    }

    /// Converts to JSON. Dates become RFC 3339 strings and binary an array of bytes.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(boolean) => serde_json::Value::Bool(*boolean),
            Self::Number(number) => serde_json::Value::Number(number.clone()),
            Self::String(string) => serde_json::Value::String(string.clone()),
            Self::Date(date) => {
                serde_json::Value::String(date.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Self::Binary(bytes) => serde_json::Value::Array(
                bytes
                    .iter()
                    .map(|byte| serde_json::Value::Number((*byte).into()))
                    .collect(),
            ),
            Self::Array(array) => {
                serde_json::Value::Array(array.iter().map(Self::to_json).collect())
            }
            Self::Object(object) => serde_json::Value::Object(
                object
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(boolean) => serializer.serialize_bool(*boolean),
            Self::Number(number) => number.serialize(serializer),
            Self::String(string) => serializer.serialize_str(string),
            Self::Date(date) => serializer.serialize_i64(date.timestamp_millis()),
            Self::Binary(bytes) => serializer.serialize_bytes(bytes),
            Self::Array(array) => serializer.collect_seq(array),
            Self::Object(object) => serializer.collect_map(object),
        }
    }
}

/// Deserializes through JSON, so dates and binary arrive as numbers, strings and arrays.
impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Self::from)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(boolean) => Self::Bool(boolean),
            serde_json::Value::Number(number) => Self::Number(number),
            serde_json::Value::String(string) => Self::String(string),
            serde_json::Value::Array(array) => {
                Self::Array(array.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(object) => Self::Object(
                object
                    .into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(string: &str) -> Self {
        Self::String(string.to_string())
    }
}

impl From<String> for Value {
    fn from(string: String) -> Self {
        Self::String(string)
    }
}

impl From<bool> for Value {
    fn from(boolean: bool) -> Self {
        Self::Bool(boolean)
    }
}

impl From<i32> for Value {
    fn from(number: i32) -> Self {
        Self::Number(number.into())
    }
}

impl From<i64> for Value {
    fn from(number: i64) -> Self {
        Self::Number(number.into())
    }
}

impl From<u64> for Value {
    fn from(number: u64) -> Self {
        Self::Number(number.into())
    }
}

impl From<f64> for Value {
    /// Non-finite numbers have no JSON form and become `Null`.
    fn from(number: f64) -> Self {
        serde_json::Number::from_f64(number)
            .map(Self::Number)
            .unwrap_or(Self::Null)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(date: DateTime<Utc>) -> Self {
        Self::Date(date)
    }
}

impl From<Vec<Value>> for Value {
    fn from(array: Vec<Value>) -> Self {
        Self::Array(array)
    }
}

impl From<Document> for Value {
    fn from(object: Document) -> Self {
        Self::Object(object)
    }
}
