use crate::common::ExpressionInput;
use crate::error::{Error, Result};
use crate::schema::{Item, Schema};
use crate::value::Document;
use crate::write::common::{self, ConditionOptions, WriteInput};

use aws_sdk_dynamodb::Client;
use serde::Deserialize;

/// Options of a put.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PutOptions {
    /// Replaces a stored item with the same key. When unset, the put fails if
    /// the key is taken.
    pub overwrite: bool,
    /// Caller condition.
    #[serde(flatten)]
    pub condition: ConditionOptions,
}

impl PutOptions {
    /// Options of a create: the key must not be taken.
    pub fn create() -> Self {
        Self {
            overwrite: false,
            ..Default::default()
        }
    }
}

impl Default for PutOptions {
    fn default() -> Self {
        Self {
            overwrite: true,
            condition: ConditionOptions::default(),
        }
    }
}

/// put item operation
#[derive(Clone, Debug, PartialEq)]
struct PutItemInput {
    document: Document,
    item: Item,
    write_operation: WriteInput,
}

/// Put item operation.
///
/// Defaults are filled on the document before it is encoded; the stored document
/// is returned.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_odm::schema::Schema;
/// use dynamodb_odm::value::Value;
/// use dynamodb_odm::write::put_item::{PutItem, PutOptions};
/// use serde_json::json;
///
/// # async fn example(client: &Client, schema: &Schema) -> dynamodb_odm::error::Result<()> {
/// let document = Value::from(json!({"id": "1", "name": "John"}))
///     .into_document()
///     .unwrap_or_default();
/// let stored = PutItem::new(schema, "users", document)
///     .options(PutOptions::create())
///     .send(client)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct PutItem<'a> {
    /// The document to store.
    pub document: Document,
    /// Put options.
    pub options: PutOptions,
    schema: &'a Schema,
    table_name: String,
}

impl<'a> PutItem<'a> {
    /// Put of `document`.
    pub fn new(schema: &'a Schema, table_name: impl Into<String>, document: Document) -> Self {
        Self {
            document,
            options: PutOptions::default(),
            schema,
            table_name: table_name.into(),
        }
    }

    /// Replaces the put options.
    pub fn options(mut self, options: PutOptions) -> Self {
        self.options = options;
        self
    }
}

impl TryFrom<PutItem<'_>> for PutItemInput {
    type Error = Error;

    fn try_from(put_item: PutItem<'_>) -> Result<Self> {
        let mut document = put_item.document;
        let item = put_item.schema.to_wire(&mut document)?;
        let guard = if put_item.options.overwrite {
            ExpressionInput::default()
        } else {
            common::hash_key_guard(put_item.schema, false)
        };
        let write_operation = WriteInput::new(
            &put_item.table_name,
            put_item.schema,
            guard,
            &put_item.options.condition,
        )?;
        let operation = Self {
            document,
            item,
            write_operation,
        };
        Ok(operation)
    }
}

impl PutItem<'_> {
    /// Execute the put item operation.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_odm.put_item", skip_all, err)
    )]
    pub async fn send(self, client: &Client) -> Result<Document> {
        let put_item: PutItemInput = self.try_into()?;
        let builder = client.put_item().set_item(Some(put_item.item));
        crate::apply_write_operation!(builder, put_item.write_operation)
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        Ok(put_item.document)
    }
}
