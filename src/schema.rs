//! Schema declaration and the document codec.
//!
//! A [`Schema`] is built once from an ordered list of [`declaration::Declaration`]s and is
//! immutable afterwards, except for the method, static and virtual registries. Every read
//! and write goes through it to translate documents to and from DynamoDB items.

/// Attribute tree nodes and their wire codec.
pub mod attribute;

/// Catalog of attribute types and their wire tags.
pub mod attribute_type;

/// Declared attribute shapes.
pub mod declaration;

/// Secondary index declarations and throughput.
pub mod index;

/// Computed, non-stored document properties.
pub mod virtual_type;

use crate::error::{Error, Result};
use crate::value::{Document, Value};

use aws_sdk_dynamodb::types;
use chrono::Utc;
use indexmap::IndexMap;
use serde::Deserialize;
use std::{collections, fmt, sync};

/// A wire item: attribute name to DynamoDB value.
pub type Item = collections::HashMap<String, types::AttributeValue>;

/// Instance method: receives the document and call arguments.
pub type Method = sync::Arc<dyn Fn(&mut Document, &[Value]) -> Result<Value> + Send + Sync>;

/// Static method: receives the call arguments.
pub type Static = sync::Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// Throughput option: one number for both axes, or each axis.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
pub enum ThroughputOption {
    /// Same units for reads and writes.
    Uniform(i64),
    /// Units per axis. Both must be present.
    Axes {
        /// Read capacity units.
        read: Option<i64>,
        /// Write capacity units.
        write: Option<i64>,
    },
}

impl ThroughputOption {
    fn resolve(self) -> Result<index::Throughput> {
        let throughput = match self {
            Self::Uniform(units) => index::Throughput::uniform(units),
            Self::Axes {
                read: Some(read),
                write: Some(write),
            } => index::Throughput { read, write },
            Self::Axes { read, write } => {
                return Err(Error::schema(format!(
                    "Invalid throughput: read {read:?} write {write:?}"
                )));
            }
        };
        throughput.validate()
    }
}

impl From<index::Throughput> for ThroughputOption {
    fn from(throughput: index::Throughput) -> Self {
        Self::Axes {
            read: Some(throughput.read),
            write: Some(throughput.write),
        }
    }
}

/// Timestamps option: `true` for `createdAt`/`updatedAt`, or explicit names.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
pub enum TimestampsOption {
    /// Default names when `true`.
    Enabled(bool),
    /// Explicit names. Both must be present.
    Named {
        /// Creation timestamp attribute.
        #[serde(rename = "createdAt")]
        created_at: Option<String>,
        /// Update timestamp attribute.
        #[serde(rename = "updatedAt")]
        updated_at: Option<String>,
    },
}

impl Default for TimestampsOption {
    fn default() -> Self {
        Self::Enabled(false)
    }
}

/// Names of the timestamp attributes.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Timestamps {
    /// Set once, when the item is created.
    pub created_at: String,
    /// Set on every write.
    pub updated_at: String,
}

impl TimestampsOption {
    fn resolve(self) -> Result<Option<Timestamps>> {
        match self {
            Self::Enabled(false) => Ok(None),
            Self::Enabled(true) => Ok(Some(Timestamps {
                created_at: "createdAt".to_string(),
                updated_at: "updatedAt".to_string(),
            })),
            Self::Named {
                created_at: Some(created_at),
                updated_at: Some(updated_at),
            } if !created_at.is_empty() && !updated_at.is_empty() => Ok(Some(Timestamps {
                created_at,
                updated_at,
            })),
            Self::Named { .. } => Err(Error::schema(
                "Missing createdAt and updatedAt timestamps attribute. Maybe set timestamps: true?",
            )),
        }
    }
}

/// Schema construction options.
///
/// ```rust
/// use dynamodb_odm::schema::SchemaOptions;
///
/// let options: SchemaOptions = serde_json::from_value(serde_json::json!({
///     "throughput": {"read": 5, "write": 2},
///     "timestamps": true,
/// }))
/// .unwrap();
/// assert!(options.use_document_types);
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SchemaOptions {
    /// Table throughput; 1/1 when absent.
    pub throughput: Option<ThroughputOption>,
    /// Automatic creation/update timestamps.
    pub timestamps: TimestampsOption,
    /// Store maps and lists as native `M`/`L` values instead of JSON text. Defaults to
    /// `true`; `false` stores them as JSON strings.
    pub use_document_types: bool,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            throughput: None,
            timestamps: TimestampsOption::default(),
            use_document_types: true,
        }
    }
}

/// Ordered attribute tree plus the keys, indexes and hooks derived from it.
#[derive(Clone)]
pub struct Schema {
    attributes: IndexMap<String, attribute::Attribute>,
    hash_key: String,
    range_key: Option<String>,
    local_indexes: IndexMap<String, String>,
    global_indexes: IndexMap<String, String>,
    throughput: index::Throughput,
    timestamps: Option<Timestamps>,
    use_document_types: bool,
    methods: IndexMap<String, Method>,
    statics: IndexMap<String, Static>,
    virtuals: IndexMap<String, virtual_type::VirtualType>,
    virtual_tree: virtual_type::VirtualTree,
}

impl Schema {
    /// Builds the attribute tree from declarations in order.
    ///
    /// ```rust
    /// use dynamodb_odm::schema::{Schema, SchemaOptions};
    /// use dynamodb_odm::schema::declaration::Declaration;
    ///
    /// let schema = Schema::new(
    ///     [
    ///         ("id", Declaration::string().hash_key()),
    ///         ("count", Declaration::number().default(0)),
    ///     ],
    ///     SchemaOptions::default(),
    /// )
    /// .unwrap();
    /// assert_eq!(schema.hash_key().name(), "id");
    /// ```
    pub fn new<K: Into<String>>(
        declarations: impl IntoIterator<Item = (K, declaration::Declaration)>,
        options: SchemaOptions,
    ) -> Result<Self> {
        let throughput = match options.throughput {
            Some(throughput) => throughput.resolve()?,
            None => index::Throughput::default(),
        };
        let timestamps = options.timestamps.resolve()?;
        let mut declared = IndexMap::new();
        for (name, declaration) in declarations {
            let name = name.into();
            if declared.contains_key(&name) {
                return Err(Error::schema(format!("Duplicate attribute: {name}")));
            }
            declared.insert(name, declaration);
        }
        if let Some(timestamps) = &timestamps {
            let now = || Value::Date(Utc::now());
            declared.insert(
                timestamps.created_at.clone(),
                declaration::Declaration::date().default_with(now),
            );
            declared.insert(
                timestamps.updated_at.clone(),
                declaration::Declaration::date()
                    .default_with(now)
                    .set(move |_| now()),
            );
        }
        let context = attribute::BuildContext {
            use_document_types: options.use_document_types,
            throughput,
            nested: false,
        };
        let mut attributes = IndexMap::with_capacity(declared.len());
        let mut hash_key: Option<(String, bool)> = None;
        let mut range_key = None;
        let mut local_indexes = IndexMap::new();
        let mut global_indexes = IndexMap::new();
        for (name, declaration) in declared {
            let explicit_hash_key = declaration.hash_key;
            let explicit_range_key = declaration.range_key;
            let attribute = attribute::Attribute::build(&name, declaration, context)?;
            if explicit_hash_key {
                if let Some((existing, true)) = &hash_key {
                    return Err(Error::schema(format!(
                        "Duplicate hashKey: {existing} and {name}"
                    )));
                }
                hash_key = Some((name.clone(), true));
            } else if hash_key.is_none() && !explicit_range_key {
                hash_key = Some((name.clone(), false));
            }
            if explicit_range_key {
                if let Some(existing) = &range_key {
                    return Err(Error::schema(format!(
                        "Duplicate rangeKey: {existing} and {name}"
                    )));
                }
                range_key = Some(name.clone());
            }
            for index in attribute.indexes().values() {
                if local_indexes.contains_key(&index.name)
                    || global_indexes.contains_key(&index.name)
                {
                    return Err(Error::schema(format!("Duplicate index name: {}", index.name)));
                }
                let registry = if index.global {
                    &mut global_indexes
                } else {
                    &mut local_indexes
                };
                registry.insert(index.name.clone(), name.clone());
            }
            attributes.insert(name, attribute);
        }
        let Some((hash_key, _)) = hash_key else {
            return Err(Error::schema("No hashKey defined"));
        };
        let schema = Self {
            attributes,
            hash_key,
            range_key,
            local_indexes,
            global_indexes,
            throughput,
            timestamps,
            use_document_types: options.use_document_types,
            methods: IndexMap::new(),
            statics: IndexMap::new(),
            virtuals: IndexMap::new(),
            virtual_tree: virtual_type::VirtualTree::default(),
        };
        for index_name in schema.global_indexes.keys() {
            if let Some(range_key) = schema
                .index_definition(index_name)
                .and_then(|index| index.range_key.as_ref())
                && !schema.attributes.contains_key(range_key)
            {
                return Err(Error::schema(format!(
                    "Index {index_name} uses undeclared rangeKey: {range_key}"
                )));
            }
        }
        Ok(schema)
    }

    /// Builds a schema from a JSON object of declared shapes.
    ///
    /// ```rust
    /// use dynamodb_odm::schema::{Schema, SchemaOptions};
    /// use serde_json::json;
    ///
    /// let schema = Schema::from_json(
    ///     json!({
    ///         "id": {"type": "string", "hashKey": true},
    ///         "count": {"type": "number", "default": 0},
    ///     }),
    ///     SchemaOptions::default(),
    /// )
    /// .unwrap();
    /// assert_eq!(schema.attributes().len(), 2);
    /// ```
    pub fn from_json(json: serde_json::Value, options: SchemaOptions) -> Result<Self> {
        let serde_json::Value::Object(declarations) = json else {
            return Err(Error::schema(format!("Invalid schema: {json}")));
        };
        let declarations = declarations
            .into_iter()
            .map(|(name, declaration)| Ok((name, declaration::Declaration::try_from(declaration)?)))
            .collect::<Result<Vec<_>>>()?;
        Self::new(declarations, options)
    }

    /// Top-level attributes in declaration order.
    pub fn attributes(&self) -> &IndexMap<String, attribute::Attribute> {
        &self.attributes
    }

    /// Top-level attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&attribute::Attribute> {
        self.attributes.get(name)
    }

    /// Hash key attribute.
    pub fn hash_key(&self) -> &attribute::Attribute {
        &self.attributes[&self.hash_key]
    }

    /// Range key attribute, if any.
    pub fn range_key(&self) -> Option<&attribute::Attribute> {
        self.range_key
            .as_ref()
            .and_then(|range_key| self.attributes.get(range_key))
    }

    /// Local indexes: index name to attribute name.
    pub fn local_indexes(&self) -> &IndexMap<String, String> {
        &self.local_indexes
    }

    /// Global indexes: index name to attribute name.
    pub fn global_indexes(&self) -> &IndexMap<String, String> {
        &self.global_indexes
    }

    /// Definition of a local or global index.
    pub fn index_definition(&self, index_name: &str) -> Option<&index::IndexDefinition> {
        self.local_indexes
            .get(index_name)
            .or_else(|| self.global_indexes.get(index_name))
            .and_then(|attribute_name| self.attributes.get(attribute_name))
            .and_then(|attribute| attribute.indexes().get(index_name))
    }

    /// Table throughput.
    pub fn throughput(&self) -> index::Throughput {
        self.throughput
    }

    /// Timestamp attribute names, when enabled.
    pub fn timestamps(&self) -> Option<&Timestamps> {
        self.timestamps.as_ref()
    }

    /// Whether maps and lists are stored as native document values.
    pub fn use_document_types(&self) -> bool {
        self.use_document_types
    }

    /// Fills defaults onto `document` and encodes every declared attribute.
    pub fn to_wire(&self, document: &mut Document) -> Result<Item> {
        let mut item = Item::with_capacity(self.attributes.len());
        for (name, attribute) in &self.attributes {
            attribute.set_default(document);
            if let Some(wire) = attribute.to_wire(document.get(name), false)? {
                item.insert(name.clone(), wire);
            }
        }
        Ok(item)
    }

    /// Decodes every declared attribute of `item` onto `document`.
    pub fn parse_wire<'a>(&self, document: &mut Document, item: &'a Item) -> Result<&'a Item> {
        for (name, attribute) in &self.attributes {
            if let Some(value) = attribute.parse_wire(item.get(name))? {
                document.insert(name.clone(), value);
            }
        }
        Ok(item)
    }

    /// Decodes an item into a new document.
    pub fn from_wire(&self, item: &Item) -> Result<Document> {
        let mut document = Document::with_capacity(self.attributes.len());
        self.parse_wire(&mut document, item)?;
        Ok(document)
    }

    /// Encodes one value for `name`, generically when the attribute is undeclared.
    pub fn encode(
        &self,
        name: &str,
        value: &Value,
        suppress_set: bool,
    ) -> Result<Option<types::AttributeValue>> {
        match self.attributes.get(name) {
            Some(attribute) => attribute.to_wire(Some(value), suppress_set),
            None if value.is_empty() => Ok(None),
            None => Ok(Some(serde_dynamo::to_attribute_value(value)?)),
        }
    }

    /// Primary-key item of `key`.
    pub fn key_item(&self, key: &crate::common::key::Key) -> Result<Item> {
        key.to_item(self)
    }

    /// Registers a virtual path, or returns the existing one.
    pub fn virtual_type(&mut self, path: &str) -> &mut virtual_type::VirtualType {
        self.virtual_tree.insert(path);
        self.virtuals
            .entry(path.to_string())
            .or_insert_with(|| virtual_type::VirtualType::new(path))
    }

    /// Registered virtual by path.
    pub fn virtual_path(&self, path: &str) -> Option<&virtual_type::VirtualType> {
        self.virtuals.get(path)
    }

    /// Computes a virtual value.
    pub fn get_virtual(&self, document: &Document, path: &str) -> Option<Value> {
        self.virtuals
            .get(path)
            .and_then(|virtual_type| virtual_type.apply_get(document))
    }

    /// Writes a virtual value through its setter.
    pub fn set_virtual(&self, document: &mut Document, path: &str, value: Value) -> Result<()> {
        match self.virtuals.get(path) {
            Some(virtual_type) if virtual_type.apply_set(document, value) => Ok(()),
            Some(_) => Err(Error::model(format!("Virtual {path} has no setter"))),
            None => Err(Error::model(format!("Unknown virtual: {path}"))),
        }
    }

    /// Evaluates every virtual getter into nested objects following the dotted paths.
    pub fn virtuals(&self, document: &Document) -> Document {
        self.virtual_tree.evaluate(&self.virtuals, document)
    }

    /// Registers an instance method.
    pub fn method(
        &mut self,
        name: impl Into<String>,
        method: impl Fn(&mut Document, &[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> &mut Self {
        self.methods.insert(name.into(), sync::Arc::new(method));
        self
    }

    /// Calls an instance method on `document`.
    pub fn call_method(
        &self,
        name: &str,
        document: &mut Document,
        arguments: &[Value],
    ) -> Result<Value> {
        let method = self
            .methods
            .get(name)
            .ok_or_else(|| Error::model(format!("Unknown method: {name}")))?;
        method(document, arguments)
    }

    /// Registers a static method.
    pub fn static_fn(
        &mut self,
        name: impl Into<String>,
        function: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> &mut Self {
        self.statics.insert(name.into(), sync::Arc::new(function));
        self
    }

    /// Calls a static method.
    pub fn call_static(&self, name: &str, arguments: &[Value]) -> Result<Value> {
        let function = self
            .statics
            .get(name)
            .ok_or_else(|| Error::model(format!("Unknown static: {name}")))?;
        function(arguments)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("attributes", &self.attributes)
            .field("hash_key", &self.hash_key)
            .field("range_key", &self.range_key)
            .field("local_indexes", &self.local_indexes)
            .field("global_indexes", &self.global_indexes)
            .field("throughput", &self.throughput)
            .field("timestamps", &self.timestamps)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("statics", &self.statics.keys().collect::<Vec<_>>())
            .field("virtuals", &self.virtuals)
            .finish()
    }
}
