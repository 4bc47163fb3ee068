use crate::error::{Error, Result};
use crate::schema::{Item, Schema};
use crate::value::{Document, Value};

/// Primary key of an item.
///
/// A bare value is the hash key; a document carries the key attributes by name.
///
/// ```rust
/// use dynamodb_odm::common::key::Key;
/// use dynamodb_odm::value::Value;
///
/// let hash_only = Key::from("user-1");
/// let composite = Key::HashRange(Value::from("user-1"), Value::from(42));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Key {
    /// Hash key value.
    Hash(Value),
    /// Hash and range key values.
    HashRange(Value, Value),
    /// Document holding the key attributes.
    Document(Document),
}

impl Key {
    /// Key built from the declared defaults of the key attributes.
    pub fn from_defaults(schema: &Schema) -> Result<Self> {
        let hash = schema
            .hash_key()
            .default_value()
            .ok_or_else(|| Error::model("Key required to get item"))?;
        match schema.range_key() {
            Some(range_key) => {
                let range = range_key.default_value().ok_or_else(|| {
                    Error::model(format!("Range key required: {}", range_key.name()))
                })?;
                Ok(Self::HashRange(hash, range))
            }
            None => Ok(Self::Hash(hash)),
        }
    }

    fn hash(&self, schema: &Schema) -> Option<&Value> {
        let hash = match self {
            Self::Hash(hash) | Self::HashRange(hash, _) => Some(hash),
            Self::Document(document) => document.get(schema.hash_key().name()),
        };
        hash.filter(|hash| !hash.is_empty())
    }

    fn range(&self, schema: &Schema) -> Option<&Value> {
        let range = match (self, schema.range_key()) {
            (Self::HashRange(_, range), Some(_)) => Some(range),
            (Self::Document(document), Some(range_key)) => document.get(range_key.name()),
            _ => None,
        };
        range.filter(|range| !range.is_empty())
    }

    /// Key attributes as a document.
    pub fn to_document(&self, schema: &Schema) -> Document {
        let mut document = Document::with_capacity(2);
        if let Some(hash) = self.hash(schema) {
            document.insert(schema.hash_key().name().to_string(), hash.clone());
        }
        if let (Some(range_key), Some(range)) = (schema.range_key(), self.range(schema)) {
            document.insert(range_key.name().to_string(), range.clone());
        }
        document
    }

    /// Encodes the key into a wire item, requiring every key attribute of the schema.
    pub fn to_item(&self, schema: &Schema) -> Result<Item> {
        let hash_key = schema.hash_key();
        let hash = self
            .hash(schema)
            .ok_or_else(|| Error::model(format!("Hash key required: {}", hash_key.name())))?;
        let mut item = Item::with_capacity(2);
        let hash = hash_key
            .to_wire(Some(hash), false)?
            .ok_or_else(|| Error::model(format!("Hash key required: {}", hash_key.name())))?;
        item.insert(hash_key.name().to_string(), hash);
        if let Some(range_key) = schema.range_key() {
            let range = self
                .range(schema)
                .ok_or_else(|| Error::model(format!("Range key required: {}", range_key.name())))?;
            let range = range_key
                .to_wire(Some(range), false)?
                .ok_or_else(|| Error::model(format!("Range key required: {}", range_key.name())))?;
            item.insert(range_key.name().to_string(), range);
        }
        Ok(item)
    }
}

impl From<Value> for Key {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(document) => Self::Document(document),
            value => Self::Hash(value),
        }
    }
}

impl From<Document> for Key {
    fn from(document: Document) -> Self {
        Self::Document(document)
    }
}

impl From<&str> for Key {
    fn from(hash: &str) -> Self {
        Self::Hash(Value::from(hash))
    }
}

impl From<String> for Key {
    fn from(hash: String) -> Self {
        Self::Hash(Value::from(hash))
    }
}

impl From<i64> for Key {
    fn from(hash: i64) -> Self {
        Self::Hash(Value::from(hash))
    }
}

impl<H: Into<Value>, R: Into<Value>> From<(H, R)> for Key {
    fn from((hash, range): (H, R)) -> Self {
        Self::HashRange(hash.into(), range.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::schema::SchemaOptions;
    use aws_sdk_dynamodb::types;
    use rstest::rstest;
    use serde_json::json;

    fn hash_schema() -> Schema {
        Schema::from_json(
            json!({
                "id": {
                    "type": "string",
                    "hashKey": true,
                },
            }),
            SchemaOptions::default(),
        )
        .unwrap()
    }

    fn composite_schema() -> Schema {
        Schema::from_json(
            json!({
                "id": {
                    "type": "string",
                    "hashKey": true,
                    "default": "d",
                },
                "at": {
                    "type": "number",
                    "rangeKey": true,
                    "default": 0,
                },
            }),
            SchemaOptions::default(),
        )
        .unwrap()
    }

    #[rstest]
    #[case::hash_only_value(
        hash_schema(),
        Key::from("b"),
        Item::from(
            [(
                "id".to_string(),
                types::AttributeValue::S(
                    "b".to_string()
                ),
            )]
        )
    )]
    #[case::hash_only_document(
        hash_schema(),
        Key::from(Value::from(json!({"id": "b", "other": 1}))),
        Item::from(
            [(
                "id".to_string(),
                types::AttributeValue::S(
                    "b".to_string()
                ),
            )]
        )
    )]
    #[case::hash_and_range(
        composite_schema(),
        Key::from(("b", 100)),
        Item::from(
            [
                (
                    "id".to_string(),
                    types::AttributeValue::S(
                        "b".to_string()
                    )
                ),
                (
                    "at".to_string(),
                    types::AttributeValue::N(
                        "100".to_string()
                    )
                ),
            ]
        )
    )]
    #[case::hash_and_range_document(
        composite_schema(),
        Key::from(Value::from(json!({"id": "b", "at": 7}))),
        Item::from(
            [
                (
                    "id".to_string(),
                    types::AttributeValue::S(
                        "b".to_string()
                    )
                ),
                (
                    "at".to_string(),
                    types::AttributeValue::N(
                        "7".to_string()
                    )
                ),
            ]
        )
    )]
    fn test_key_to_item(#[case] schema: Schema, #[case] key: Key, #[case] expected: Item) {
        let actual = key.to_item(&schema).unwrap();
        assert_eq!(actual, expected);
    }

    #[rstest]
    #[case::missing_range(composite_schema(), Key::from("b"))]
    #[case::empty_hash(hash_schema(), Key::from(""))]
    #[case::document_without_hash(hash_schema(), Key::from(Value::from(json!({"other": 1}))))]
    fn test_key_to_item_missing(#[case] schema: Schema, #[case] key: Key) {
        assert!(matches!(key.to_item(&schema), Err(Error::Model(_))));
    }

    #[test]
    fn test_key_from_defaults() {
        assert_eq!(
            Key::from_defaults(&composite_schema()).unwrap(),
            Key::HashRange(Value::from("d"), Value::from(0))
        );
        assert!(matches!(
            Key::from_defaults(&hash_schema()),
            Err(Error::Model(_))
        ));
    }
}
