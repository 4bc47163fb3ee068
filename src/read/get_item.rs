use crate::common::key::Key;
use crate::error::{Error, Result};
use crate::schema::{Item, Schema};
use crate::value::Document;

use aws_sdk_dynamodb::Client;
use serde::Deserialize;

/// Options of a single-item read.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq)]
#[serde(default)]
pub struct GetOptions {
    /// Attributes to fetch, all when unset.
    pub attributes: Option<Vec<String>>,
    /// Strongly consistent read.
    pub consistent: bool,
}

/// get item operation
#[derive(Clone, Debug, Default, PartialEq)]
struct GetItemInput {
    attributes_to_get: Option<Vec<String>>,
    consistent_read: Option<bool>,
    key: Item,
    table_name: String,
}

/// Get item operation.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_odm::read::get_item::GetItem;
/// use dynamodb_odm::schema::Schema;
///
/// # async fn example(client: &Client, schema: &Schema) -> dynamodb_odm::error::Result<()> {
/// let user = GetItem::new(schema, "users", "user-1").send(client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct GetItem<'a> {
    /// Primary key of the item.
    pub key: Key,
    /// Read options.
    pub options: GetOptions,
    schema: &'a Schema,
    table_name: String,
}

impl<'a> GetItem<'a> {
    /// Read of the item under `key`.
    pub fn new(schema: &'a Schema, table_name: impl Into<String>, key: impl Into<Key>) -> Self {
        Self {
            key: key.into(),
            options: GetOptions::default(),
            schema,
            table_name: table_name.into(),
        }
    }

    /// Replaces the read options.
    pub fn options(mut self, options: GetOptions) -> Self {
        self.options = options;
        self
    }
}

impl TryFrom<GetItem<'_>> for GetItemInput {
    type Error = Error;

    fn try_from(get_item: GetItem<'_>) -> Result<Self> {
        let key = get_item.key.to_item(get_item.schema)?;
        let operation = Self {
            attributes_to_get: get_item.options.attributes,
            consistent_read: get_item.options.consistent.then_some(true),
            key,
            table_name: get_item.table_name,
        };
        Ok(operation)
    }
}

impl GetItem<'_> {
    /// Execute the get item operation, decoding the item if one is stored.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_odm.get_item", skip_all, err)
    )]
    pub async fn send(self, client: &Client) -> Result<Option<Document>> {
        let schema = self.schema;
        let get_item: GetItemInput = self.try_into()?;
        let output = client
            .get_item()
            .set_attributes_to_get(get_item.attributes_to_get)
            .set_consistent_read(get_item.consistent_read)
            .set_key(Some(get_item.key))
            .table_name(get_item.table_name)
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        output.item.map(|item| schema.from_wire(&item)).transpose()
    }
}
