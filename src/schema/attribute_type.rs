use crate::error::{Error, Result};
use crate::value::Value;

use aws_sdk_dynamodb::types;
use chrono::DateTime;
use std::{fmt, str};

/// Wire tag of a scalar or document value.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum WireTag {
    /// String (`S`), also used for booleans and JSON-encoded values.
    S,
    /// Number (`N`), also used for dates.
    N,
    /// Binary (`B`).
    B,
    /// Map (`M`).
    M,
    /// List (`L`).
    L,
}

impl WireTag {
    /// Tag of a set of this scalar type (`SS`, `NS`, `BS`).
    pub fn set_tag(self) -> Option<&'static str> {
        match self {
            Self::S => Some("SS"),
            Self::N => Some("NS"),
            Self::B => Some("BS"),
            Self::M | Self::L => None,
        }
    }
}

impl fmt::Display for WireTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::S => "S",
            Self::N => "N",
            Self::B => "B",
            Self::M => "M",
            Self::L => "L",
        };
        f.write_str(tag)
    }
}

/// Catalog of attribute types a schema can declare.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AttributeType {
    /// Plain string.
    String,
    /// Number.
    Number,
    /// Boolean, stored as the JSON literal in a string.
    Boolean,
    /// Date, stored as epoch milliseconds.
    Date,
    /// Opaque object, stored as JSON text.
    Object,
    /// Opaque array, stored as JSON text.
    Array,
    /// Document map with declared children.
    Map,
    /// Document list with one declared element type.
    List,
    /// Raw bytes.
    Buffer,
}

impl AttributeType {
    /// Every catalog entry.
    pub const ALL: [Self; 9] = [
        Self::String,
        Self::Number,
        Self::Boolean,
        Self::Date,
        Self::Object,
        Self::Array,
        Self::Map,
        Self::List,
        Self::Buffer,
    ];

    /// Catalog name.
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Object => "object",
            Self::Array => "array",
            Self::Map => "map",
            Self::List => "list",
            Self::Buffer => "buffer",
        }
    }

    /// Wire tag values of this type are stored under.
    pub fn wire_tag(self) -> WireTag {
        match self {
            Self::String | Self::Boolean | Self::Object | Self::Array => WireTag::S,
            Self::Number | Self::Date => WireTag::N,
            Self::Buffer => WireTag::B,
            Self::Map => WireTag::M,
            Self::List => WireTag::L,
        }
    }

    /// Whether values go through a transform instead of plain stringification.
    pub fn has_transform(self) -> bool {
        matches!(
            self,
            Self::Boolean | Self::Date | Self::Object | Self::Array
        )
    }

    /// Whether this is a document type with declared children.
    pub fn is_document(self) -> bool {
        matches!(self, Self::Map | Self::List)
    }

    /// Key attribute type for table definitions, if the type can be a key.
    pub fn scalar_attribute_type(self) -> Option<types::ScalarAttributeType> {
        match self.wire_tag() {
            WireTag::S => Some(types::ScalarAttributeType::S),
            WireTag::N => Some(types::ScalarAttributeType::N),
            WireTag::B => Some(types::ScalarAttributeType::B),
            WireTag::M | WireTag::L => None,
        }
    }

    /// Applies the type's transform, producing the wire string.
    pub(crate) fn transform(self, name: &str, value: &Value) -> Result<String> {
        match self {
            Self::Boolean | Self::Object | Self::Array => {
                serde_json::to_string(&value.to_json()).map_err(|error| {
                    Error::validation(format!("Cannot encode {name} as JSON: {error}"))
                })
            }
            Self::Date => datify(name, value).map(|millis| millis.to_string()),
            _ => Ok(value.stringify()),
        }
    }
}

/// Epoch milliseconds of a date, a number of milliseconds, or an RFC 3339 string.
fn datify(name: &str, value: &Value) -> Result<i64> {
    match value {
        Value::Date(date) => Ok(date.timestamp_millis()),
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|millis| millis.trunc() as i64))
            .ok_or_else(|| Error::validation(format!("Invalid date: {name}"))),
        Value::String(string) => DateTime::parse_from_rfc3339(string)
            .map(|date| date.timestamp_millis())
            .map_err(|_| Error::validation(format!("Invalid date: {name}"))),
        _ => Err(Error::validation(format!("Invalid date: {name}"))),
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl str::FromStr for AttributeType {
    type Err = Error;

    /// Case-insensitive catalog lookup.
    fn from_str(token: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|attribute_type| attribute_type.name().eq_ignore_ascii_case(token))
            .ok_or_else(|| Error::schema(format!("Invalid attribute type: {token}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case::lowercase("string", AttributeType::String)]
    #[case::capitalized("Number", AttributeType::Number)]
    #[case::uppercase("BOOLEAN", AttributeType::Boolean)]
    #[case::date("Date", AttributeType::Date)]
    #[case::buffer("buffer", AttributeType::Buffer)]
    fn test_from_str(#[case] token: &str, #[case] expected: AttributeType) {
        assert_eq!(token.parse::<AttributeType>().unwrap(), expected);
    }

    #[test]
    fn test_from_str_unknown() {
        assert!(matches!(
            "uuid".parse::<AttributeType>(),
            Err(Error::Schema(_))
        ));
    }

    #[rstest]
    #[case::string(AttributeType::String, WireTag::S)]
    #[case::number(AttributeType::Number, WireTag::N)]
    #[case::boolean(AttributeType::Boolean, WireTag::S)]
    #[case::date(AttributeType::Date, WireTag::N)]
    #[case::object(AttributeType::Object, WireTag::S)]
    #[case::array(AttributeType::Array, WireTag::S)]
    #[case::map(AttributeType::Map, WireTag::M)]
    #[case::list(AttributeType::List, WireTag::L)]
    #[case::buffer(AttributeType::Buffer, WireTag::B)]
    fn test_wire_tag(#[case] attribute_type: AttributeType, #[case] expected: WireTag) {
        assert_eq!(attribute_type.wire_tag(), expected);
    }

    #[rstest]
    #[case::boolean_true(AttributeType::Boolean, Value::Bool(true), "true")]
    #[case::boolean_false(AttributeType::Boolean, Value::Bool(false), "false")]
    #[case::date_from_millis(AttributeType::Date, Value::from(1234), "1234")]
    #[case::date_from_string(
        AttributeType::Date,
        Value::from("1970-01-01T00:00:01.500Z"),
        "1500"
    )]
    #[case::object(
        AttributeType::Object,
        Value::from(serde_json::json!({"a": 1})),
        "{\"a\":1}"
    )]
    #[case::number(AttributeType::Number, Value::from(1.5), "1.5")]
    fn test_transform(
        #[case] attribute_type: AttributeType,
        #[case] value: Value,
        #[case] expected: &str,
    ) {
        assert_eq!(attribute_type.transform("a", &value).unwrap(), expected);
    }

    #[test]
    fn test_transform_invalid_date() {
        assert!(matches!(
            AttributeType::Date.transform("a", &Value::from("yesterday")),
            Err(Error::Validation(_))
        ));
    }
}
