use crate::error::{Error, Result};
use crate::schema::attribute_type::{AttributeType, WireTag};
use crate::schema::declaration::{Declaration, DefaultValue, Hooks, Shape};
use crate::schema::index::{IndexDefinition, Throughput};
use crate::value::Value;

use aws_sdk_dynamodb::{primitives, types};
use chrono::DateTime;
use indexmap::IndexMap;
use std::borrow;

/// Structural kind of an attribute.
#[derive(Clone, Debug)]
pub enum Kind {
    /// Single value.
    Scalar,
    /// Set of scalar values.
    Set,
    /// Document map with named children.
    Map(IndexMap<String, Attribute>),
    /// Document list whose elements follow one attribute.
    List(Box<Attribute>),
}

/// Settings shared by every attribute of a schema under construction.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BuildContext {
    pub(crate) use_document_types: bool,
    pub(crate) throughput: Throughput,
    pub(crate) nested: bool,
}

/// A node of the schema tree.
#[derive(Clone, Debug)]
pub struct Attribute {
    name: String,
    attribute_type: AttributeType,
    kind: Kind,
    required: bool,
    trim: bool,
    lowercase: bool,
    uppercase: bool,
    hooks: Hooks,
    indexes: IndexMap<String, IndexDefinition>,
}

impl Attribute {
    pub(crate) fn build(
        name: &str,
        declaration: Declaration,
        context: BuildContext,
    ) -> Result<Self> {
        if context.nested
            && (declaration.hash_key || declaration.range_key || !declaration.indexes.is_empty())
        {
            return Err(Error::schema(format!(
                "Key roles and indexes are only valid on top-level attributes: {name}"
            )));
        }
        if declaration.hash_key && declaration.range_key {
            return Err(Error::schema(format!(
                "Cannot be both hashKey and rangeKey: {name}"
            )));
        }
        let child_context = BuildContext {
            nested: true,
            ..context
        };
        let (attribute_type, kind) = match declaration.shape {
            Shape::Type(AttributeType::Map) => {
                return Err(Error::schema(format!("No map given for attribute: {name}")));
            }
            Shape::Type(AttributeType::List) => {
                return Err(Error::schema(format!("No object given for attribute: {name}")));
            }
            Shape::Type(attribute_type) => (attribute_type, Kind::Scalar),
            Shape::Set(attribute_type) if attribute_type.is_document() => {
                return Err(Error::schema(format!(
                    "Sets of {attribute_type} are not supported: {name}"
                )));
            }
            Shape::Set(attribute_type) => (attribute_type, Kind::Set),
            Shape::Map(_) if !context.use_document_types => (AttributeType::Object, Kind::Scalar),
            Shape::Map(children) => {
                let children = children
                    .into_iter()
                    .map(|(child_name, child)| {
                        let attribute = Self::build(&child_name, child, child_context)?;
                        Ok((child_name, attribute))
                    })
                    .collect::<Result<_>>()?;
                (AttributeType::Map, Kind::Map(children))
            }
            Shape::List(_) if !context.use_document_types => (AttributeType::Array, Kind::Scalar),
            Shape::List(element) => {
                let element = Self::build("0", *element, child_context)?;
                (AttributeType::List, Kind::List(Box::new(element)))
            }
        };
        let mut indexes = IndexMap::with_capacity(declaration.indexes.len());
        for index in &declaration.indexes {
            let index = index.resolve(name, context.throughput)?;
            if indexes.contains_key(&index.name) {
                return Err(Error::schema(format!("Duplicate index names: {}", index.name)));
            }
            indexes.insert(index.name.clone(), index);
        }
        Ok(Self {
            name: name.to_string(),
            attribute_type,
            kind,
            required: declaration.required,
            trim: declaration.trim,
            lowercase: declaration.lowercase,
            uppercase: declaration.uppercase,
            hooks: declaration.hooks,
            indexes,
        })
    }

    /// Name within the parent (`"0"` for a list element).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved catalog type.
    pub fn attribute_type(&self) -> AttributeType {
        self.attribute_type
    }

    /// Structural kind.
    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    /// Whether values are sets of the scalar type.
    pub fn is_set(&self) -> bool {
        matches!(self.kind, Kind::Set)
    }

    /// Whether empty values are rejected.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Secondary indexes declared on this attribute.
    pub fn indexes(&self) -> &IndexMap<String, IndexDefinition> {
        &self.indexes
    }

    /// Produces the default value, if one is declared.
    pub fn default_value(&self) -> Option<Value> {
        self.hooks.default.as_ref().map(DefaultValue::produce)
    }

    /// Key attribute type for table definitions.
    pub(crate) fn key_attribute_type(&self) -> Result<types::ScalarAttributeType> {
        match (&self.kind, self.attribute_type.scalar_attribute_type()) {
            (Kind::Scalar, Some(scalar_attribute_type)) => Ok(scalar_attribute_type),
            _ => Err(Error::schema(format!(
                "Key attribute must be a scalar string, number or binary: {}",
                self.name
            ))),
        }
    }

    /// Fills this attribute's default onto `document` when its value is empty,
    /// then fills nested defaults.
    pub(crate) fn set_default(&self, document: &mut crate::value::Document) {
        let empty = document.get(&self.name).is_none_or(Value::is_empty);
        if empty && let Some(default) = self.default_value() {
            document.insert(self.name.clone(), default);
        }
        if let Some(value) = document.get_mut(&self.name) {
            self.fill_nested_defaults(value);
        }
    }

    fn fill_nested_defaults(&self, value: &mut Value) {
        match (&self.kind, value) {
            (Kind::Map(children), Value::Object(object)) => {
                for child in children.values() {
                    child.set_default(object);
                }
            }
            (Kind::List(element), Value::Array(elements)) => {
                for item in elements {
                    element.fill_nested_defaults(item);
                }
            }
            _ => {}
        }
    }

    /// Encodes a native value. `Ok(None)` means the attribute is omitted from the item.
    ///
    /// With `suppress_set`, a set attribute encodes a single element instead of a set.
    pub fn to_wire(
        &self,
        value: Option<&Value>,
        suppress_set: bool,
    ) -> Result<Option<types::AttributeValue>> {
        let value = match value {
            Some(value) if !value.is_empty() => value,
            _ if self.required => {
                return Err(Error::validation(format!("Required value missing: {}", self.name)));
            }
            _ => return Ok(None),
        };
        let set_mode = self.is_set() && !suppress_set;
        if set_mode {
            match value {
                Value::Array(elements) if elements.is_empty() => return Ok(None),
                Value::Array(_) => {}
                _ => {
                    return Err(Error::validation(format!("Values must be array: {}", self.name)));
                }
            }
        }
        if let Some(validator) = &self.hooks.validator
            && !validator(value)
        {
            return Err(Error::validation(format!("Validation failed: {}", self.name)));
        }
        let value = match &self.hooks.setter {
            Some(setter) => borrow::Cow::Owned(setter(value.clone())),
            None => borrow::Cow::Borrowed(value),
        };
        let wire = match &self.kind {
            Kind::Set if set_mode => self.encode_set(&value)?,
            Kind::Map(children) => {
                let Value::Object(object) = value.as_ref() else {
                    return Err(Error::validation(format!(
                        "Values must be object in a `map`: {}",
                        self.name
                    )));
                };
                let mut map = std::collections::HashMap::with_capacity(children.len());
                for (child_name, child) in children {
                    let child_value = child.value_or_default(object.get(child_name));
                    if let Some(wire) = child.to_wire(child_value.as_deref(), false)? {
                        map.insert(child_name.clone(), wire);
                    }
                }
                types::AttributeValue::M(map)
            }
            Kind::List(element) => {
                let Value::Array(items) = value.as_ref() else {
                    return Err(Error::validation(format!(
                        "Values must be array in a `list`: {}",
                        self.name
                    )));
                };
                let list = items
                    .iter()
                    .map(|item| {
                        let item = element.value_or_default(Some(item));
                        Ok(element
                            .to_wire(item.as_deref(), false)?
                            .unwrap_or(types::AttributeValue::Null(true)))
                    })
                    .collect::<Result<Vec<_>>>()?;
                types::AttributeValue::L(list)
            }
            Kind::Scalar | Kind::Set => self.encode_scalar(&value)?,
        };
        Ok(Some(wire))
    }

    fn value_or_default<'a>(&self, value: Option<&'a Value>) -> Option<borrow::Cow<'a, Value>> {
        match value {
            Some(value) if !value.is_empty() => Some(borrow::Cow::Borrowed(value)),
            _ => self
                .default_value()
                .map(borrow::Cow::Owned)
                .or(value.map(borrow::Cow::Borrowed)),
        }
    }

    fn encode_set(&self, value: &Value) -> Result<types::AttributeValue> {
        let elements = value.as_array().map(Vec::as_slice).unwrap_or_default();
        let wire = match self.attribute_type.wire_tag() {
            WireTag::S => types::AttributeValue::Ss(
                elements
                    .iter()
                    .map(|element| self.scalar_text(element))
                    .collect::<Result<_>>()?,
            ),
            WireTag::N => types::AttributeValue::Ns(
                elements
                    .iter()
                    .map(|element| self.scalar_text(element))
                    .collect::<Result<_>>()?,
            ),
            WireTag::B => types::AttributeValue::Bs(
                elements
                    .iter()
                    .map(|element| self.binary(element).map(primitives::Blob::new))
                    .collect::<Result<_>>()?,
            ),
            WireTag::M | WireTag::L => {
                return Err(Error::schema(format!(
                    "Sets of {} are not supported: {}",
                    self.attribute_type, self.name
                )));
            }
        };
        Ok(wire)
    }

    fn encode_scalar(&self, value: &Value) -> Result<types::AttributeValue> {
        match self.attribute_type.wire_tag() {
            WireTag::S => Ok(types::AttributeValue::S(self.scalar_text(value)?)),
            WireTag::N => Ok(types::AttributeValue::N(self.scalar_text(value)?)),
            WireTag::B => Ok(types::AttributeValue::B(primitives::Blob::new(self.binary(value)?))),
            WireTag::M | WireTag::L => Err(Error::validation(format!(
                "Cannot encode a scalar as a document: {}",
                self.name
            ))),
        }
    }

    /// Wire string of one scalar value, post-processed for plain strings.
    fn scalar_text(&self, value: &Value) -> Result<String> {
        if self.attribute_type.has_transform() {
            return self.attribute_type.transform(&self.name, value);
        }
        if self.attribute_type == AttributeType::Number {
            return match value {
                Value::Number(number) => Ok(number.to_string()),
                Value::String(string) if string.trim().parse::<f64>().is_ok_and(f64::is_finite) => {
                    Ok(string.trim().to_string())
                }
                _ => Err(Error::validation(format!("Invalid number: {}", self.name))),
            };
        }
        let mut text = value.stringify();
        if self.trim {
            text = text.trim().to_string();
        }
        if self.lowercase {
            text = text.to_lowercase();
        }
        if self.uppercase {
            text = text.to_uppercase();
        }
        Ok(text)
    }

    fn binary(&self, value: &Value) -> Result<Vec<u8>> {
        match value {
            Value::Binary(bytes) => Ok(bytes.clone()),
            Value::String(string) => Ok(string.clone().into_bytes()),
            _ => Err(Error::validation(format!("Invalid buffer: {}", self.name))),
        }
    }

    /// Decodes a wire value. `Ok(None)` means the attribute is absent.
    pub fn parse_wire(&self, wire: Option<&types::AttributeValue>) -> Result<Option<Value>> {
        let wire = match wire {
            None | Some(types::AttributeValue::Null(_)) => return Ok(None),
            Some(wire) => wire,
        };
        let value = match (&self.kind, wire) {
            (Kind::Set, types::AttributeValue::Ss(elements))
            | (Kind::Set, types::AttributeValue::Ns(elements)) => {
                self.expect_set_tag(wire)?;
                Value::Array(
                    elements
                        .iter()
                        .map(|element| self.decode_text(element))
                        .collect::<Result<_>>()?,
                )
            }
            (Kind::Set, types::AttributeValue::Bs(elements)) => {
                self.expect_set_tag(wire)?;
                Value::Array(
                    elements
                        .iter()
                        .map(|element| Value::Binary(element.as_ref().to_vec()))
                        .collect(),
                )
            }
            (Kind::Map(children), types::AttributeValue::M(map)) => {
                let mut object = crate::value::Document::with_capacity(children.len());
                for (child_name, child) in children {
                    if let Some(value) = child.parse_wire(map.get(child_name))? {
                        object.insert(child_name.clone(), value);
                    }
                }
                Value::Object(object)
            }
            (Kind::List(element), types::AttributeValue::L(items)) => {
                let mut array = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(value) = element.parse_wire(Some(item))? {
                        array.push(value);
                    }
                }
                Value::Array(array)
            }
            (Kind::Scalar, types::AttributeValue::S(text))
                if self.attribute_type.wire_tag() == WireTag::S =>
            {
                self.decode_text(text)?
            }
            (Kind::Scalar, types::AttributeValue::N(text))
                if self.attribute_type.wire_tag() == WireTag::N =>
            {
                self.decode_text(text)?
            }
            (Kind::Scalar, types::AttributeValue::B(blob))
                if self.attribute_type == AttributeType::Buffer =>
            {
                Value::Binary(blob.as_ref().to_vec())
            }
            (Kind::Scalar, types::AttributeValue::Bool(boolean))
                if self.attribute_type == AttributeType::Boolean =>
            {
                Value::Bool(*boolean)
            }
            _ => return Err(self.wire_mismatch()),
        };
        let value = match &self.hooks.getter {
            Some(getter) => getter(value),
            None => value,
        };
        Ok(Some(value))
    }

    fn expect_set_tag(&self, wire: &types::AttributeValue) -> Result<()> {
        let matches = matches!(
            (self.attribute_type.wire_tag(), wire),
            (WireTag::S, types::AttributeValue::Ss(_))
                | (WireTag::N, types::AttributeValue::Ns(_))
                | (WireTag::B, types::AttributeValue::Bs(_))
        );
        if matches { Ok(()) } else { Err(self.wire_mismatch()) }
    }

    fn wire_mismatch(&self) -> Error {
        let expected = match (&self.kind, self.attribute_type.wire_tag()) {
            (Kind::Set, tag) => tag.set_tag().unwrap_or_default().to_string(),
            (_, tag) => tag.to_string(),
        };
        Error::validation(format!(
            "Invalid wire value for {}: expected {expected}",
            self.name
        ))
    }

    /// Inverse of the type transform for one string-encoded scalar.
    fn decode_text(&self, text: &str) -> Result<Value> {
        let invalid = || {
            Error::validation(format!(
                "Invalid {} value for {}: {text}",
                self.attribute_type, self.name
            ))
        };
        match self.attribute_type {
            AttributeType::Number => text
                .parse::<serde_json::Number>()
                .map(Value::Number)
                .map_err(|_| invalid()),
            AttributeType::Date => {
                let millis = text
                    .parse::<i64>()
                    .or_else(|_| text.parse::<f64>().map(|millis| millis.trunc() as i64))
                    .map_err(|_| invalid())?;
                DateTime::from_timestamp_millis(millis)
                    .map(Value::Date)
                    .ok_or_else(invalid)
            }
            AttributeType::Boolean | AttributeType::Object | AttributeType::Array => {
                serde_json::from_str::<serde_json::Value>(text)
                    .map(Value::from)
                    .map_err(|_| invalid())
            }
            _ => Ok(Value::String(text.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;
    use serde_json::json;

    fn attribute(declaration: serde_json::Value) -> Attribute {
        let declaration = Declaration::try_from(declaration).unwrap();
        Attribute::build(
            "a",
            declaration,
            BuildContext {
                use_document_types: true,
                throughput: Throughput::default(),
                nested: false,
            },
        )
        .unwrap()
    }

    #[rstest]
    #[case::string(json!("string"), Value::from("hello"))]
    #[case::integer(json!("number"), Value::from(42))]
    #[case::float(json!("number"), Value::from(1.25))]
    #[case::boolean(json!("boolean"), Value::from(true))]
    #[case::date(
        json!("date"),
        Value::Date(DateTime::from_timestamp_millis(1_500_000_000_123).unwrap())
    )]
    #[case::object(json!("object"), Value::from(json!({"x": [1, "y"]})))]
    #[case::array(json!("array"), Value::from(json!([1, {"z": null}])))]
    #[case::buffer(json!("buffer"), Value::Binary(vec![0, 1, 255]))]
    #[case::nested_map(
        json!({"first": "string", "inner": {"n": "number"}}),
        Value::from(json!({"first": "a", "inner": {"n": 3}}))
    )]
    #[case::list_of_maps(
        json!([{"name": "string", "age": "number"}]),
        Value::from(json!([{"name": "a", "age": 1}, {"name": "b", "age": 2}]))
    )]
    #[case::set_of_strings(json!(["string"]), Value::from(json!(["x", "y"])))]
    #[case::set_of_numbers(json!(["number"]), Value::from(json!([1, 2.5])))]
    fn test_round_trip(#[case] declaration: serde_json::Value, #[case] value: Value) {
        let attribute = attribute(declaration);
        let wire = attribute.to_wire(Some(&value), false).unwrap();
        let actual = attribute.parse_wire(wire.as_ref()).unwrap();
        assert_eq!(actual, Some(value));
    }

    #[rstest]
    #[case::string(json!("string"), Value::from("x"), types::AttributeValue::S("x".to_string()))]
    #[case::number(json!("number"), Value::from(0), types::AttributeValue::N("0".to_string()))]
    #[case::numeric_string(
        json!("number"),
        Value::from(" 7 "),
        types::AttributeValue::N("7".to_string())
    )]
    #[case::boolean_as_string(
        json!("boolean"),
        Value::from(false),
        types::AttributeValue::S("false".to_string())
    )]
    #[case::date_as_millis(
        json!("date"),
        Value::Date(DateTime::from_timestamp_millis(86_400_000).unwrap()),
        types::AttributeValue::N("86400000".to_string())
    )]
    #[case::set(
        json!(["string"]),
        Value::from(json!(["b", "a"])),
        types::AttributeValue::Ss(vec!["b".to_string(), "a".to_string()])
    )]
    #[case::trim_lowercase(
        json!({"type": "string", "trim": true, "lowercase": true}),
        Value::from("  MiXeD "),
        types::AttributeValue::S("mixed".to_string())
    )]
    #[case::uppercase_set(
        json!({"type": ["string"], "uppercase": true}),
        Value::from(json!(["a"])),
        types::AttributeValue::Ss(vec!["A".to_string()])
    )]
    #[case::list_keeps_positions(
        json!([{"type": "string"}]),
        Value::from(json!(["a", null, "b"])),
        types::AttributeValue::L(vec![
            types::AttributeValue::S("a".to_string()),
            types::AttributeValue::Null(true),
            types::AttributeValue::S("b".to_string()),
        ])
    )]
    #[case::map_omits_empty_children(
        json!({"x": "string", "y": "string"}),
        Value::from(json!({"x": "1", "y": ""})),
        types::AttributeValue::M(std::collections::HashMap::from([(
            "x".to_string(),
            types::AttributeValue::S("1".to_string()),
        )]))
    )]
    #[case::map_child_default(
        json!({"x": {"type": "number", "default": 9}}),
        Value::from(json!({})),
        types::AttributeValue::M(std::collections::HashMap::from([(
            "x".to_string(),
            types::AttributeValue::N("9".to_string()),
        )]))
    )]
    fn test_to_wire(
        #[case] declaration: serde_json::Value,
        #[case] value: Value,
        #[case] expected: types::AttributeValue,
    ) {
        let actual = attribute(declaration).to_wire(Some(&value), false).unwrap();
        assert_eq!(actual, Some(expected));
    }

    #[rstest]
    #[case::missing(None)]
    #[case::null(Some(Value::Null))]
    #[case::empty_string(Some(Value::from("")))]
    fn test_to_wire_required(#[case] value: Option<Value>) {
        let required = attribute(json!({"type": "string", "required": true}));
        assert!(matches!(
            required.to_wire(value.as_ref(), false),
            Err(Error::Validation(_))
        ));
        let optional = attribute(json!("string"));
        assert_eq!(optional.to_wire(value.as_ref(), false).unwrap(), None);
        assert!(required.to_wire(Some(&Value::from("x")), false).unwrap().is_some());
    }

    #[test]
    fn test_to_wire_empty_set_is_omitted() {
        let set = attribute(json!(["number"]));
        assert_eq!(set.to_wire(Some(&Value::Array(vec![])), false).unwrap(), None);
    }

    #[test]
    fn test_to_wire_suppressed_set_encodes_element() {
        let set = attribute(json!(["string"]));
        assert_eq!(
            set.to_wire(Some(&Value::from("x")), true).unwrap(),
            Some(types::AttributeValue::S("x".to_string()))
        );
    }

    #[rstest]
    #[case::set_needs_array(json!(["string"]), Value::from("x"))]
    #[case::list_needs_array(json!([{"type": "string"}]), Value::from("x"))]
    #[case::map_needs_object(json!({"x": "string"}), Value::from(1))]
    #[case::number_needs_number(json!("number"), Value::from("abc"))]
    #[case::failed_validator(json!({"type": "string", "validate": "ok"}), Value::from("nope"))]
    fn test_to_wire_invalid(#[case] declaration: serde_json::Value, #[case] value: Value) {
        assert!(matches!(
            attribute(declaration).to_wire(Some(&value), false),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_setter_runs_after_validator() {
        let declaration = Declaration::string()
            .validate(|value| value.as_str() == Some("raw"))
            .set(|value| Value::from(format!("{}!", value.stringify())));
        let context = BuildContext {
            use_document_types: true,
            throughput: Throughput::default(),
            nested: false,
        };
        let attribute = Attribute::build("a", declaration, context).unwrap();
        assert_eq!(
            attribute.to_wire(Some(&Value::from("raw")), false).unwrap(),
            Some(types::AttributeValue::S("raw!".to_string()))
        );
    }

    #[test]
    fn test_getter_runs_after_decode() {
        let declaration =
            Declaration::number().get(|value| Value::from(value.as_i64().unwrap_or(0) * 2));
        let context = BuildContext {
            use_document_types: true,
            throughput: Throughput::default(),
            nested: false,
        };
        let attribute = Attribute::build("a", declaration, context).unwrap();
        let wire = types::AttributeValue::N("21".to_string());
        assert_eq!(attribute.parse_wire(Some(&wire)).unwrap(), Some(Value::from(42)));
    }

    #[rstest]
    #[case::absent(json!("string"), None, None)]
    #[case::native_bool(
        json!("boolean"),
        Some(types::AttributeValue::Bool(true)),
        Some(Value::from(true))
    )]
    #[case::list_skips_nulls(
        json!([{"type": "number"}]),
        Some(types::AttributeValue::L(vec![
            types::AttributeValue::N("1".to_string()),
            types::AttributeValue::Null(true),
        ])),
        Some(Value::from(json!([1])))
    )]
    #[case::map_skips_undeclared(
        json!({"x": "string"}),
        Some(types::AttributeValue::M(std::collections::HashMap::from([
            ("x".to_string(), types::AttributeValue::S("1".to_string())),
            ("y".to_string(), types::AttributeValue::S("2".to_string())),
        ]))),
        Some(Value::from(json!({"x": "1"})))
    )]
    fn test_parse_wire(
        #[case] declaration: serde_json::Value,
        #[case] wire: Option<types::AttributeValue>,
        #[case] expected: Option<Value>,
    ) {
        assert_eq!(attribute(declaration).parse_wire(wire.as_ref()).unwrap(), expected);
    }

    #[rstest]
    #[case::string_from_number(json!("string"), types::AttributeValue::N("1".to_string()))]
    #[case::set_from_scalar(json!(["string"]), types::AttributeValue::S("1".to_string()))]
    #[case::string_set_from_number_set(
        json!(["string"]),
        types::AttributeValue::Ns(vec!["1".to_string()])
    )]
    #[case::bad_number(json!("number"), types::AttributeValue::N("one".to_string()))]
    fn test_parse_wire_invalid(
        #[case] declaration: serde_json::Value,
        #[case] wire: types::AttributeValue,
    ) {
        assert!(matches!(
            attribute(declaration).parse_wire(Some(&wire)),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_set_default_fills_nested_objects() {
        let attribute = attribute(json!({
            "inner": {"flag": {"type": "boolean", "default": true}},
            "count": {"type": "number", "default": 0},
        }));
        let mut document = crate::value::Document::from([(
            "a".to_string(),
            Value::from(json!({"inner": {}})),
        )]);
        attribute.set_default(&mut document);
        assert_eq!(
            document["a"],
            Value::from(json!({"inner": {"flag": true}, "count": 0}))
        );
    }

    #[rstest]
    #[case::nested_hash_key(json!({"x": {"type": "string", "hashKey": true}}))]
    #[case::nested_index(json!({"x": {"type": "string", "index": true}}))]
    #[case::both_keys(json!({"type": "string", "hashKey": true, "rangeKey": true}))]
    #[case::set_of_maps(json!({"type": ["map"]}))]
    #[case::bare_map_token(json!("map"))]
    #[case::duplicate_index(json!({"type": "string", "index": [true, true]}))]
    fn test_build_invalid(#[case] declaration: serde_json::Value) {
        let declaration = Declaration::try_from(declaration).unwrap();
        let context = BuildContext {
            use_document_types: true,
            throughput: Throughput::default(),
            nested: false,
        };
        assert!(matches!(
            Attribute::build("a", declaration, context),
            Err(Error::Schema(_))
        ));
    }

    #[test]
    fn test_build_without_document_types() {
        let declaration = Declaration::try_from(json!({"x": "string"})).unwrap();
        let context = BuildContext {
            use_document_types: false,
            throughput: Throughput::default(),
            nested: false,
        };
        let attribute = Attribute::build("a", declaration, context).unwrap();
        assert_eq!(attribute.attribute_type(), AttributeType::Object);
        assert_eq!(
            attribute.to_wire(Some(&Value::from(json!({"x": "1"}))), false).unwrap(),
            Some(types::AttributeValue::S("{\"x\":\"1\"}".to_string()))
        );
    }
}
