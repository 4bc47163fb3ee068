use crate::error::{Error, Result};
use crate::schema::{Schema, index::Throughput};

use aws_sdk_dynamodb::types;
use indexmap::IndexMap;

/// Create-table request derived from a [`Schema`].
///
/// Building is a pure function of the schema: the same schema always yields the same
/// definition.
///
/// ```rust
/// use dynamodb_odm::schema::{Schema, SchemaOptions};
/// use dynamodb_odm::table::definition::TableDefinition;
/// use serde_json::json;
///
/// let schema = Schema::from_json(
///     json!({
///         "id": {"type": "string", "hashKey": true},
///         "email": {"type": "string", "index": {"global": true}},
///     }),
///     SchemaOptions::default(),
/// )
/// .unwrap();
/// let definition = TableDefinition::build("users", &schema).unwrap();
/// assert_eq!(definition.attribute_definitions.len(), 2);
/// assert_eq!(definition.global_secondary_indexes.len(), 1);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct TableDefinition {
    /// Table name.
    pub table_name: String,
    /// Key-bearing attributes, deduplicated by name.
    pub attribute_definitions: Vec<types::AttributeDefinition>,
    /// Primary key: hash, then optional range.
    pub key_schema: Vec<types::KeySchemaElement>,
    /// Table throughput.
    pub provisioned_throughput: types::ProvisionedThroughput,
    /// One per local index.
    pub local_secondary_indexes: Vec<types::LocalSecondaryIndex>,
    /// One per global index.
    pub global_secondary_indexes: Vec<types::GlobalSecondaryIndex>,
}

impl TableDefinition {
    /// Derives the definition of `table_name` from `schema`.
    pub fn build(table_name: impl Into<String>, schema: &Schema) -> Result<Self> {
        let mut key_attributes = IndexMap::new();
        let mut declare = |name: &str| -> Result<()> {
            if key_attributes.contains_key(name) {
                return Ok(());
            }
            let attribute = schema
                .attribute(name)
                .ok_or_else(|| Error::schema(format!("Undeclared key attribute: {name}")))?;
            key_attributes.insert(name.to_string(), attribute.key_attribute_type()?);
            Ok(())
        };

        let hash_key = schema.hash_key().name();
        declare(hash_key)?;
        let range_key = schema.range_key().map(|attribute| attribute.name());
        if let Some(range_key) = range_key {
            declare(range_key)?;
        }
        for (index_name, attribute_name) in schema.global_indexes() {
            declare(attribute_name.as_str())?;
            if let Some(range_key) = schema
                .index_definition(index_name)
                .and_then(|index| index.range_key.as_deref())
            {
                declare(range_key)?;
            }
        }
        for attribute_name in schema.local_indexes().values() {
            declare(attribute_name.as_str())?;
        }

        let attribute_definitions = key_attributes
            .into_iter()
            .map(|(name, attribute_type)| {
                types::AttributeDefinition::builder()
                    .attribute_name(name)
                    .attribute_type(attribute_type)
                    .build()
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let local_secondary_indexes = schema
            .local_indexes()
            .iter()
            .filter_map(|(index_name, attribute_name)| {
                schema
                    .index_definition(index_name)
                    .map(|index| (index, attribute_name))
            })
            .map(|(index, attribute_name)| {
                types::LocalSecondaryIndex::builder()
                    .index_name(&index.name)
                    .set_key_schema(Some(key_schema(hash_key, Some(attribute_name.as_str()))?))
                    .projection(index.projection.to_projection())
                    .build()
                    .map_err(Into::into)
            })
            .collect::<Result<Vec<_>>>()?;

        let global_secondary_indexes = schema
            .global_indexes()
            .iter()
            .filter_map(|(index_name, attribute_name)| {
                schema
                    .index_definition(index_name)
                    .map(|index| (index, attribute_name))
            })
            .map(|(index, attribute_name)| {
                let throughput = index.throughput.unwrap_or(schema.throughput());
                types::GlobalSecondaryIndex::builder()
                    .index_name(&index.name)
                    .set_key_schema(Some(key_schema(attribute_name, index.range_key.as_deref())?))
                    .projection(index.projection.to_projection())
                    .provisioned_throughput(provisioned_throughput(throughput)?)
                    .build()
                    .map_err(Into::into)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            table_name: table_name.into(),
            attribute_definitions,
            key_schema: key_schema(hash_key, range_key)?,
            provisioned_throughput: provisioned_throughput(schema.throughput())?,
            local_secondary_indexes,
            global_secondary_indexes,
        })
    }

    /// Global index by name.
    pub fn global_secondary_index(&self, index_name: &str) -> Option<&types::GlobalSecondaryIndex> {
        self.global_secondary_indexes
            .iter()
            .find(|index| index.index_name == index_name)
    }
}

fn key_schema(hash_key: &str, range_key: Option<&str>) -> Result<Vec<types::KeySchemaElement>> {
    let mut key_schema = vec![
        types::KeySchemaElement::builder()
            .attribute_name(hash_key)
            .key_type(types::KeyType::Hash)
            .build()?,
    ];
    if let Some(range_key) = range_key {
        key_schema.push(
            types::KeySchemaElement::builder()
                .attribute_name(range_key)
                .key_type(types::KeyType::Range)
                .build()?,
        );
    }
    Ok(key_schema)
}

fn provisioned_throughput(throughput: Throughput) -> Result<types::ProvisionedThroughput> {
    let provisioned_throughput = types::ProvisionedThroughput::builder()
        .read_capacity_units(throughput.read)
        .write_capacity_units(throughput.write)
        .build()?;
    Ok(provisioned_throughput)
}

/// Global index changes needed to bring a remote table in line with its definition.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IndexDiff {
    /// Declared locally, missing remotely.
    pub create: Vec<types::GlobalSecondaryIndex>,
    /// Present remotely, no longer declared.
    pub delete: Vec<String>,
    /// Present on both sides with a different shape: deleted, then recreated.
    pub both: Vec<types::GlobalSecondaryIndex>,
}

impl IndexDiff {
    /// Whether the remote indexes already match.
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.delete.is_empty() && self.both.is_empty()
    }
}

/// The fields of a global index that can't be altered in place.
#[derive(Debug, PartialEq)]
struct IndexShape<'a> {
    key_schema: Vec<(&'a str, &'a types::KeyType)>,
    projection_type: Option<&'a types::ProjectionType>,
    non_key_attributes: Vec<&'a str>,
    throughput: Option<(i64, i64)>,
}

impl<'a> IndexShape<'a> {
    fn new(
        key_schema: &'a [types::KeySchemaElement],
        projection: Option<&'a types::Projection>,
        throughput: Option<(i64, i64)>,
    ) -> Self {
        let mut non_key_attributes: Vec<&str> = projection
            .and_then(|projection| projection.non_key_attributes.as_deref())
            .unwrap_or_default()
            .iter()
            .map(String::as_str)
            .collect();
        non_key_attributes.sort_unstable();
        Self {
            key_schema: key_schema
                .iter()
                .map(|element| (element.attribute_name.as_str(), &element.key_type))
                .collect(),
            projection_type: projection.and_then(|projection| projection.projection_type.as_ref()),
            non_key_attributes,
            throughput,
        }
    }

    fn local(index: &'a types::GlobalSecondaryIndex) -> Self {
        let throughput = index
            .provisioned_throughput
            .as_ref()
            .map(|throughput| (throughput.read_capacity_units, throughput.write_capacity_units));
        Self::new(&index.key_schema, index.projection.as_ref(), throughput)
    }

    fn remote(index: &'a types::GlobalSecondaryIndexDescription) -> Self {
        let throughput = index.provisioned_throughput.as_ref().map(|throughput| {
            (
                throughput.read_capacity_units.unwrap_or_default(),
                throughput.write_capacity_units.unwrap_or_default(),
            )
        });
        Self::new(
            index.key_schema.as_deref().unwrap_or_default(),
            index.projection.as_ref(),
            throughput,
        )
    }
}

/// Compares the global indexes of `local` with those `remote` reports.
///
/// ```rust
/// use aws_sdk_dynamodb::types;
/// use dynamodb_odm::schema::{Schema, SchemaOptions};
/// use dynamodb_odm::table::definition::{self, TableDefinition};
/// use serde_json::json;
///
/// let schema = Schema::from_json(
///     json!({
///         "id": {"type": "string", "hashKey": true},
///         "email": {"type": "string", "index": {"global": true}},
///     }),
///     SchemaOptions::default(),
/// )
/// .unwrap();
/// let local = TableDefinition::build("users", &schema).unwrap();
/// let remote = types::TableDescription::builder().build();
/// let diff = definition::diff(&local, &remote);
/// assert_eq!(diff.create.len(), 1);
/// ```
pub fn diff(local: &TableDefinition, remote: &types::TableDescription) -> IndexDiff {
    let remote_indexes: IndexMap<&str, &types::GlobalSecondaryIndexDescription> = remote
        .global_secondary_indexes
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(|index| index.index_name.as_deref().map(|name| (name, index)))
        .collect();
    let mut diff = IndexDiff::default();
    for index in &local.global_secondary_indexes {
        match remote_indexes.get(index.index_name.as_str()) {
            None => diff.create.push(index.clone()),
            Some(remote_index) if IndexShape::local(index) != IndexShape::remote(remote_index) => {
                diff.both.push(index.clone())
            }
            Some(_) => {}
        }
    }
    diff.delete = remote_indexes
        .keys()
        .filter(|name| local.global_secondary_index(name).is_none())
        .map(|name| name.to_string())
        .collect();
    diff
}
