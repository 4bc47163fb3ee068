use crate::error::{Error, Result};

use aws_sdk_dynamodb::types;
use serde::Deserialize;

/// Provisioned read/write capacity units.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq)]
pub struct Throughput {
    /// Read capacity units.
    pub read: i64,
    /// Write capacity units.
    pub write: i64,
}

impl Default for Throughput {
    fn default() -> Self {
        Self { read: 1, write: 1 }
    }
}

impl Throughput {
    /// Same capacity on both axes.
    pub fn uniform(units: i64) -> Self {
        Self {
            read: units,
            write: units,
        }
    }

    /// Rejects capacities below one unit.
    pub fn validate(self) -> Result<Self> {
        if self.read < 1 || self.write < 1 {
            return Err(Error::schema(format!(
                "Invalid throughput: read {} write {}",
                self.read, self.write
            )));
        }
        Ok(self)
    }

    /// Parses either a single number or a `{read, write}` object.
    pub(crate) fn from_json(json: &serde_json::Value) -> Result<Self> {
        let throughput = match json {
            serde_json::Value::Number(units) => units
                .as_i64()
                .map(Self::uniform)
                .ok_or_else(|| Error::schema(format!("Invalid throughput: {json}")))?,
            serde_json::Value::Object(axes) => {
                let axis = |name: &str| {
                    axes.get(name)
                        .and_then(serde_json::Value::as_i64)
                        .ok_or_else(|| Error::schema(format!("Invalid throughput: {json}")))
                };
                Self {
                    read: axis("read")?,
                    write: axis("write")?,
                }
            }
            _ => return Err(Error::schema(format!("Invalid throughput: {json}"))),
        };
        throughput.validate()
    }
}

/// Which attributes an index copies alongside its key.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub enum Projection {
    /// Only the key attributes.
    KeysOnly,
    /// Every attribute.
    #[default]
    All,
    /// The key attributes plus the named non-key attributes.
    Include(Vec<String>),
}

impl Projection {
    /// `null` means `All`; otherwise an array of names is `Include`, any other truthy
    /// value is `All` and `false`, `0` or `""` is `KeysOnly`.
    pub(crate) fn from_json(json: &serde_json::Value) -> Result<Self> {
        match json {
            serde_json::Value::Null => Ok(Self::All),
            serde_json::Value::Bool(project) => Ok(Self::all_or_keys_only(*project)),
            serde_json::Value::Number(number) => {
                Ok(Self::all_or_keys_only(number.as_f64().is_some_and(|number| number != 0.0)))
            }
            serde_json::Value::String(string) => Ok(Self::all_or_keys_only(!string.is_empty())),
            serde_json::Value::Object(_) => Ok(Self::All),
            serde_json::Value::Array(names) => names
                .iter()
                .map(|name| {
                    name.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| Error::schema(format!("Invalid projection: {json}")))
                })
                .collect::<Result<Vec<_>>>()
                .map(Self::Include),
        }
    }

    fn all_or_keys_only(all: bool) -> Self {
        if all { Self::All } else { Self::KeysOnly }
    }

    pub(crate) fn to_projection(&self) -> types::Projection {
        match self {
            Self::KeysOnly => types::Projection::builder()
                .projection_type(types::ProjectionType::KeysOnly)
                .build(),
            Self::All => types::Projection::builder()
                .projection_type(types::ProjectionType::All)
                .build(),
            Self::Include(names) => types::Projection::builder()
                .projection_type(types::ProjectionType::Include)
                .set_non_key_attributes(Some(names.clone()))
                .build(),
        }
    }
}

/// Secondary index declared on an attribute.
///
/// ```rust
/// use dynamodb_odm::schema::index::{IndexDeclaration, Projection};
///
/// let index = IndexDeclaration::global()
///     .name("ByEmail")
///     .range_key("createdAt")
///     .project(Projection::KeysOnly);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IndexDeclaration {
    global: bool,
    name: Option<String>,
    range_key: Option<String>,
    throughput: Option<Throughput>,
    projection: Projection,
}

impl IndexDeclaration {
    /// Local secondary index using the attribute as its range key.
    pub fn local() -> Self {
        Self::default()
    }

    /// Global secondary index using the attribute as its hash key.
    pub fn global() -> Self {
        Self {
            global: true,
            ..Default::default()
        }
    }

    /// Overrides the generated index name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Range key of a global index.
    pub fn range_key(mut self, range_key: impl Into<String>) -> Self {
        self.range_key = Some(range_key.into());
        self
    }

    /// Provisioned capacity of a global index.
    pub fn throughput(mut self, throughput: Throughput) -> Self {
        self.throughput = Some(throughput);
        self
    }

    /// Projected attributes.
    pub fn project(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    /// Parses the `index` option: `true`, an object, or an array of either.
    pub(crate) fn list_from_json(json: &serde_json::Value) -> Result<Vec<Self>> {
        match json {
            serde_json::Value::Null | serde_json::Value::Bool(false) => Ok(Vec::new()),
            serde_json::Value::Array(indexes) => indexes.iter().map(Self::from_json).collect(),
            index => Ok(vec![Self::from_json(index)?]),
        }
    }

    fn from_json(json: &serde_json::Value) -> Result<Self> {
        let Some(options) = json.as_object() else {
            return Ok(Self::local());
        };
        let global = options
            .get("global")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        let text = |key: &str| {
            options
                .get(key)
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        };
        let throughput = match options.get("throughput") {
            Some(throughput) if global => Some(Throughput::from_json(throughput)?),
            _ => None,
        };
        let project = options.get("project").unwrap_or(&serde_json::Value::Null);
        let projection = Projection::from_json(project)?;
        Ok(Self {
            global,
            name: text("name"),
            range_key: if global { text("rangeKey") } else { None },
            throughput,
            projection,
        })
    }

    pub(crate) fn resolve(
        &self,
        attribute_name: &str,
        schema_throughput: Throughput,
    ) -> Result<IndexDefinition> {
        let name = match &self.name {
            Some(name) => name.clone(),
            None if self.global => format!("{attribute_name}GlobalIndex"),
            None => format!("{attribute_name}LocalIndex"),
        };
        let throughput = if self.global {
            Some(self.throughput.unwrap_or(schema_throughput).validate()?)
        } else {
            None
        };
        Ok(IndexDefinition {
            global: self.global,
            name,
            range_key: if self.global { self.range_key.clone() } else { None },
            throughput,
            projection: self.projection.clone(),
        })
    }
}

/// Resolved secondary index of an attribute.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IndexDefinition {
    /// Whether this is a global secondary index.
    pub global: bool,
    /// Index name, unique within the schema.
    pub name: String,
    /// Range key of a global index.
    pub range_key: Option<String>,
    /// Provisioned capacity of a global index.
    pub throughput: Option<Throughput>,
    /// Projected attributes.
    pub projection: Projection,
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case::uniform(json!(5), Throughput { read: 5, write: 5 })]
    #[case::axes(json!({"read": 2, "write": 3}), Throughput { read: 2, write: 3 })]
    fn test_throughput_from_json(#[case] json: serde_json::Value, #[case] expected: Throughput) {
        assert_eq!(Throughput::from_json(&json).unwrap(), expected);
    }

    #[rstest]
    #[case::missing_write(json!({"read": 2}))]
    #[case::zero(json!({"read": 0, "write": 3}))]
    #[case::negative(json!(-1))]
    #[case::text(json!("fast"))]
    fn test_throughput_from_json_invalid(#[case] json: serde_json::Value) {
        assert!(matches!(Throughput::from_json(&json), Err(Error::Schema(_))));
    }

    #[rstest]
    #[case::true_is_local(json!(true), vec![IndexDeclaration::local()])]
    #[case::false_is_none(json!(false), vec![])]
    #[case::global(
        json!({"global": true, "rangeKey": "b", "name": "X", "project": false}),
        vec![IndexDeclaration::global().range_key("b").name("X").project(Projection::KeysOnly)]
    )]
    #[case::local_ignores_range_key(
        json!({"rangeKey": "b", "project": ["c"]}),
        vec![IndexDeclaration::local().project(Projection::Include(vec!["c".to_string()]))]
    )]
    #[case::array(
        json!([true, {"global": true, "throughput": 4}]),
        vec![
            IndexDeclaration::local(),
            IndexDeclaration::global().throughput(Throughput::uniform(4)),
        ]
    )]
    fn test_index_declarations_from_json(
        #[case] json: serde_json::Value,
        #[case] expected: Vec<IndexDeclaration>,
    ) {
        assert_eq!(IndexDeclaration::list_from_json(&json).unwrap(), expected);
    }

    #[rstest]
    #[case::absent(json!(null), Projection::All)]
    #[case::enabled(json!(true), Projection::All)]
    #[case::disabled(json!(false), Projection::KeysOnly)]
    #[case::nonzero(json!(1), Projection::All)]
    #[case::zero(json!(0), Projection::KeysOnly)]
    #[case::text(json!("yes"), Projection::All)]
    #[case::empty_text(json!(""), Projection::KeysOnly)]
    #[case::object(json!({}), Projection::All)]
    #[case::names(
        json!(["a", "b"]),
        Projection::Include(vec!["a".to_string(), "b".to_string()])
    )]
    fn test_projection_from_json(#[case] json: serde_json::Value, #[case] expected: Projection) {
        assert_eq!(Projection::from_json(&json).unwrap(), expected);
    }

    #[test]
    fn test_projection_from_json_invalid() {
        assert!(matches!(Projection::from_json(&json!([1])), Err(Error::Schema(_))));
    }

    #[rstest]
    #[case::local_default_name(
        IndexDeclaration::local(),
        IndexDefinition {
            global: false,
            name: "emailLocalIndex".to_string(),
            range_key: None,
            throughput: None,
            projection: Projection::All,
        }
    )]
    #[case::global_inherits_throughput(
        IndexDeclaration::global(),
        IndexDefinition {
            global: true,
            name: "emailGlobalIndex".to_string(),
            range_key: None,
            throughput: Some(Throughput { read: 3, write: 7 }),
            projection: Projection::All,
        }
    )]
    fn test_resolve(#[case] declaration: IndexDeclaration, #[case] expected: IndexDefinition) {
        let actual = declaration
            .resolve("email", Throughput { read: 3, write: 7 })
            .unwrap();
        assert_eq!(actual, expected);
    }
}
