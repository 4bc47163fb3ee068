use crate::error::{Error, Result};
use crate::schema::attribute_type::AttributeType;
use crate::schema::index::IndexDeclaration;
use crate::value::Value;

use indexmap::IndexMap;
use std::{fmt, sync};

/// Producer of a default value.
pub type Producer = sync::Arc<dyn Fn() -> Value + Send + Sync>;

/// Predicate a value must satisfy before it is encoded.
pub type Validator = sync::Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Value transformation applied when encoding (setter) or decoding (getter).
pub type Transform = sync::Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Default of an attribute: a constant or a producer called on every use.
#[derive(Clone)]
pub enum DefaultValue {
    /// Fixed value.
    Constant(Value),
    /// Computed on every use.
    Producer(Producer),
}

impl DefaultValue {
    pub(crate) fn produce(&self) -> Value {
        match self {
            Self::Constant(value) => value.clone(),
            Self::Producer(producer) => producer(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::Producer(_) => f.write_str("Producer"),
        }
    }
}

/// Behavioral hooks of an attribute.
#[derive(Clone, Default)]
pub(crate) struct Hooks {
    pub(crate) default: Option<DefaultValue>,
    pub(crate) validator: Option<Validator>,
    pub(crate) getter: Option<Transform>,
    pub(crate) setter: Option<Transform>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("default", &self.default)
            .field("validator", &self.validator.is_some())
            .field("getter", &self.getter.is_some())
            .field("setter", &self.setter.is_some())
            .finish()
    }
}

/// Declared shape of an attribute.
#[derive(Clone, Debug)]
pub enum Shape {
    /// Single value of a catalog type.
    Type(AttributeType),
    /// Set of a scalar catalog type.
    Set(AttributeType),
    /// Document map with named children.
    Map(IndexMap<String, Declaration>),
    /// Document list whose elements all follow one declaration.
    List(Box<Declaration>),
}

/// Declared form of one attribute, the input to schema construction.
///
/// ```rust
/// use dynamodb_odm::schema::declaration::Declaration;
/// use dynamodb_odm::schema::index::IndexDeclaration;
///
/// let email = Declaration::string()
///     .required()
///     .lowercase()
///     .index(IndexDeclaration::global());
/// ```
#[derive(Clone, Debug)]
pub struct Declaration {
    pub(crate) shape: Shape,
    pub(crate) hash_key: bool,
    pub(crate) range_key: bool,
    pub(crate) required: bool,
    pub(crate) trim: bool,
    pub(crate) lowercase: bool,
    pub(crate) uppercase: bool,
    pub(crate) indexes: Vec<IndexDeclaration>,
    pub(crate) hooks: Hooks,
}

impl Declaration {
    /// Declaration of the given shape with no options.
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            hash_key: false,
            range_key: false,
            required: false,
            trim: false,
            lowercase: false,
            uppercase: false,
            indexes: Vec::new(),
            hooks: Hooks::default(),
        }
    }

    /// Single value of a catalog type.
    pub fn of(attribute_type: AttributeType) -> Self {
        Self::new(Shape::Type(attribute_type))
    }

    /// `string` attribute.
    pub fn string() -> Self {
        Self::of(AttributeType::String)
    }

    /// `number` attribute.
    pub fn number() -> Self {
        Self::of(AttributeType::Number)
    }

    /// `boolean` attribute.
    pub fn boolean() -> Self {
        Self::of(AttributeType::Boolean)
    }

    /// `date` attribute.
    pub fn date() -> Self {
        Self::of(AttributeType::Date)
    }

    /// `buffer` attribute.
    pub fn buffer() -> Self {
        Self::of(AttributeType::Buffer)
    }

    /// Set of a scalar catalog type.
    pub fn set_of(attribute_type: AttributeType) -> Self {
        Self::new(Shape::Set(attribute_type))
    }

    /// Document map with the given children, in order.
    pub fn map<K: Into<String>>(children: impl IntoIterator<Item = (K, Declaration)>) -> Self {
        Self::new(Shape::Map(
            children
                .into_iter()
                .map(|(name, child)| (name.into(), child))
                .collect(),
        ))
    }

    /// Document list of the given element declaration.
    pub fn list(element: Declaration) -> Self {
        Self::new(Shape::List(Box::new(element)))
    }

    /// Marks the attribute as the table hash key.
    pub fn hash_key(mut self) -> Self {
        self.hash_key = true;
        self
    }

    /// Marks the attribute as the table range key.
    pub fn range_key(mut self) -> Self {
        self.range_key = true;
        self
    }

    /// Rejects documents where the attribute is empty.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Trims string values before storing them.
    pub fn trim(mut self) -> Self {
        self.trim = true;
        self
    }

    /// Lowercases string values before storing them.
    pub fn lowercase(mut self) -> Self {
        self.lowercase = true;
        self
    }

    /// Uppercases string values before storing them.
    pub fn uppercase(mut self) -> Self {
        self.uppercase = true;
        self
    }

    /// Declares a secondary index on the attribute.
    pub fn index(mut self, index: IndexDeclaration) -> Self {
        self.indexes.push(index);
        self
    }

    /// Constant default for empty values.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.hooks.default = Some(DefaultValue::Constant(value.into()));
        self
    }

    /// Default computed on every use.
    pub fn default_with(mut self, producer: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.hooks.default = Some(DefaultValue::Producer(sync::Arc::new(producer)));
        self
    }

    /// Predicate a value must satisfy.
    pub fn validate(mut self, validator: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        self.hooks.validator = Some(sync::Arc::new(validator));
        self
    }

    /// Transformation applied to decoded values.
    pub fn get(mut self, getter: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.hooks.getter = Some(sync::Arc::new(getter));
        self
    }

    /// Transformation applied to values before encoding.
    pub fn set(mut self, setter: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.hooks.setter = Some(sync::Arc::new(setter));
        self
    }

    /// Parses a type expression: a token, `[token]`, `[{..}]` or a children object.
    fn shape_from_json(json: &serde_json::Value) -> Result<Shape> {
        match json {
            serde_json::Value::String(token) => Ok(Shape::Type(token.parse()?)),
            serde_json::Value::Array(elements) if elements.len() == 1 => match &elements[0] {
                serde_json::Value::String(token) => Ok(Shape::Set(token.parse()?)),
                element @ serde_json::Value::Object(_) => {
                    Ok(Shape::List(Box::new(Self::try_from(element.clone())?)))
                }
                element => Err(Error::schema(format!("Invalid attribute type: {element}"))),
            },
            serde_json::Value::Array(elements) if elements.len() > 1 => Err(Error::schema(
                "Only one object can be defined as a list type",
            )),
            serde_json::Value::Object(children) => {
                Ok(Shape::Map(Self::children_from_json(children)?))
            }
            _ => Err(Error::schema(format!("Invalid attribute value: {json}"))),
        }
    }

    fn children_from_json(
        children: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<IndexMap<String, Self>> {
        children
            .iter()
            .map(|(name, child)| Ok((name.clone(), Self::try_from(child.clone())?)))
            .collect()
    }
}

impl TryFrom<serde_json::Value> for Declaration {
    type Error = Error;

    /// Parses the JSON declared form.
    ///
    /// ```rust
    /// use dynamodb_odm::schema::declaration::Declaration;
    /// use serde_json::json;
    ///
    /// let declaration = Declaration::try_from(json!({
    ///     "type": "string",
    ///     "hashKey": true,
    ///     "index": {"global": true, "rangeKey": "createdAt"},
    /// }))
    /// .unwrap();
    /// ```
    fn try_from(json: serde_json::Value) -> Result<Self> {
        let options = match &json {
            serde_json::Value::Object(options) if options.contains_key("type") => options,
            _ => return Ok(Self::new(Self::shape_from_json(&json)?)),
        };
        let flag = |key: &str| {
            options
                .get(key)
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false)
        };
        let shape = match (
            Self::shape_from_json(&options["type"])?,
            options.get("map"),
            options.get("list"),
        ) {
            (Shape::Type(AttributeType::Map), Some(serde_json::Value::Object(children)), _) => {
                Shape::Map(Self::children_from_json(children)?)
            }
            (Shape::Type(AttributeType::Map), _, _) => {
                return Err(Error::schema("No map given for a map attribute"));
            }
            (Shape::Type(AttributeType::List), _, Some(list)) => {
                match Self::shape_from_json(list)? {
                    list @ Shape::List(_) => list,
                    _ => return Err(Error::schema("No object given for a list attribute")),
                }
            }
            (Shape::Type(AttributeType::List), _, None) => {
                return Err(Error::schema("No object given for a list attribute"));
            }
            (shape, _, _) => shape,
        };
        let mut declaration = Self::new(shape);
        declaration.hash_key = flag("hashKey");
        declaration.range_key = flag("rangeKey");
        declaration.required = flag("required");
        declaration.trim = flag("trim");
        declaration.lowercase = flag("lowercase");
        declaration.uppercase = flag("uppercase");
        if let Some(index) = options.get("index") {
            declaration.indexes = IndexDeclaration::list_from_json(index)?;
        }
        match options.get("default") {
            None | Some(serde_json::Value::Null) => {}
            Some(default) => declaration = declaration.default(Value::from(default.clone())),
        }
        match options.get("validate") {
            None | Some(serde_json::Value::Null) => {}
            Some(expected) => {
                let expected = Value::from(expected.clone());
                declaration = declaration.validate(move |value| *value == expected);
            }
        }
        Ok(declaration)
    }
}
