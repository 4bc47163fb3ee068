//! Models: a schema bound to a table, with the document operations on it.

use crate::common::key::Key;
use crate::error::{Error, Result};
use crate::read::batch_get_item::{BatchGetItem, BatchGetOutput};
use crate::read::get_item::{GetItem, GetOptions};
use crate::read::query::Query;
use crate::read::scan::Scan;
use crate::schema::Schema;
use crate::table::Table;
use crate::value::{Document, Value};
use crate::write::batch_write_item::{BatchWriteItem, BatchWriteItemRequest, BatchWriteOutput};
use crate::write::delete_item::{DeleteItem, DeleteOptions};
use crate::write::put_item::{PutItem, PutOptions};
use crate::write::update_item::{UpdateItem, UpdateOptions, UpdateRequest};

use aws_sdk_dynamodb::Client;
use serde::{Deserialize, Deserializer};
use std::{sync, time};

/// Table lifecycle options of a model.
///
/// ```rust
/// use dynamodb_odm::model::ModelOptions;
/// use std::time::Duration;
///
/// let options: ModelOptions = serde_json::from_value(serde_json::json!({
///     "update": true,
///     "waitForActiveTimeout": 60000,
///     "prefix": "dev-",
/// }))
/// .unwrap();
/// assert!(options.create);
/// assert_eq!(options.wait_for_active_timeout, Duration::from_secs(60));
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelOptions {
    /// Creates the table when it doesn't exist.
    pub create: bool,
    /// Reconciles global indexes of an existing table.
    pub update: bool,
    /// Waits for a created table to become active.
    pub wait_for_active: bool,
    /// How long to wait for the table to become active, given in milliseconds.
    #[serde(deserialize_with = "deserialize_millis")]
    pub wait_for_active_timeout: time::Duration,
    /// Prepended to the model name to form the table name.
    pub prefix: String,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            create: true,
            update: false,
            wait_for_active: true,
            wait_for_active_timeout: time::Duration::from_secs(180),
            prefix: String::new(),
        }
    }
}

fn deserialize_millis<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<time::Duration, D::Error> {
    u64::deserialize(deserializer).map(time::Duration::from_millis)
}

/// A schema bound to a table.
///
/// Every operation initializes the table first, once per model.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_odm::model::{Model, ModelOptions};
/// use dynamodb_odm::read::get_item::GetOptions;
/// use dynamodb_odm::schema::{Schema, SchemaOptions};
/// use dynamodb_odm::write::update_item::{UpdateOptions, UpdateRequest};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// # async fn example(client: Client) -> dynamodb_odm::error::Result<()> {
/// let schema = Schema::from_json(
///     json!({
///         "id": {"type": "string", "hashKey": true},
///         "count": {"type": "number", "default": 0},
///     }),
///     SchemaOptions::default(),
/// )?;
/// let model = Model::new("counters", Arc::new(schema), client, ModelOptions::default());
/// model.create(model.new_document(json!({"id": "x"}))?).await?;
/// model
///     .update(
///         Some("x".into()),
///         UpdateRequest::default().add("count", 5),
///         UpdateOptions::default(),
///     )
///     .await?;
/// let counter = model.get("x", GetOptions::default()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Model {
    name: String,
    table: Table,
}

impl Model {
    /// Model stored in the table `<prefix><name>`.
    pub fn new(
        name: impl Into<String>,
        schema: sync::Arc<Schema>,
        client: Client,
        options: ModelOptions,
    ) -> Self {
        let name = name.into();
        let table_name = format!("{}{name}", options.prefix);
        Self {
            name,
            table: Table::new(table_name, schema, client, options),
        }
    }

    /// Model name, without prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backing table.
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Schema of the documents.
    pub fn schema(&self) -> &Schema {
        self.table.schema()
    }

    /// Document from a JSON object. Nothing is stored or defaulted until it is written.
    pub fn new_document(&self, json: serde_json::Value) -> Result<Document> {
        Value::from(json)
            .into_document()
            .ok_or_else(|| Error::model("A document must be an object"))
    }

    /// Fetches the document under `key`.
    pub async fn get(&self, key: impl Into<Key>, options: GetOptions) -> Result<Option<Document>> {
        self.table.ready().await?;
        GetItem::new(self.schema(), self.table.name(), key)
            .options(options)
            .send(self.table.client())
            .await
    }

    /// Stores `document`, replacing any item under its key unless told otherwise.
    pub async fn put(&self, document: Document, options: PutOptions) -> Result<Document> {
        self.table.ready().await?;
        PutItem::new(self.schema(), self.table.name(), document)
            .options(options)
            .send(self.table.client())
            .await
    }

    /// Stores `document`, failing when its key is taken.
    pub async fn create(&self, document: Document) -> Result<Document> {
        self.put(document, PutOptions::create()).await
    }

    /// Applies `request` to the item under `key`, or under the key defaults when no key
    /// is given, and returns the updated document.
    pub async fn update(
        &self,
        key: Option<Key>,
        request: UpdateRequest,
        options: UpdateOptions,
    ) -> Result<Option<Document>> {
        let key = match key {
            Some(key) => key,
            None => Key::from_defaults(self.schema())?,
        };
        self.table.ready().await?;
        UpdateItem::new(self.schema(), self.table.name(), key, request)
            .options(options)
            .send(self.table.client())
            .await
    }

    /// Deletes the item under `key`.
    pub async fn delete(
        &self,
        key: impl Into<Key>,
        options: DeleteOptions,
    ) -> Result<Option<Document>> {
        self.table.ready().await?;
        DeleteItem::new(self.schema(), self.table.name(), key)
            .options(options)
            .send(self.table.client())
            .await
    }

    /// Query on the hash key or index hash key `hash_name`, sent with [`Query::exec`].
    pub fn query(&self, hash_name: impl Into<String>) -> Query<'_> {
        Query::on(&self.table, hash_name)
    }

    /// Query resolving to the first match only.
    pub fn query_one(&self, hash_name: impl Into<String>) -> Query<'_> {
        self.query(hash_name).one()
    }

    /// Scan of the whole table, sent with [`Scan::exec`].
    pub fn scan(&self) -> Scan<'_> {
        Scan::on(&self.table)
    }

    /// Fetches the documents under `keys`.
    pub async fn batch_get(&self, keys: Vec<Key>, options: GetOptions) -> Result<BatchGetOutput> {
        self.table.ready().await?;
        BatchGetItem::new(self.schema(), self.table.name(), keys)
            .options(options)
            .send(self.table.client())
            .await
    }

    /// Stores `documents`, replacing items under the same keys.
    pub async fn batch_put(&self, documents: Vec<Document>) -> Result<BatchWriteOutput> {
        let requests = documents
            .into_iter()
            .map(BatchWriteItemRequest::PutItem)
            .collect();
        self.batch_write(requests).await
    }

    /// Deletes the items under `keys`.
    pub async fn batch_delete(&self, keys: Vec<Key>) -> Result<BatchWriteOutput> {
        let requests = keys
            .into_iter()
            .map(BatchWriteItemRequest::DeleteItem)
            .collect();
        self.batch_write(requests).await
    }

    async fn batch_write(&self, requests: Vec<BatchWriteItemRequest>) -> Result<BatchWriteOutput> {
        self.table.ready().await?;
        BatchWriteItem::new(self.schema(), self.table.name(), requests)
            .send(self.table.client())
            .await
    }

    /// Waits for the table to become active, `timeout` defaulting to the model's.
    pub async fn wait_for_active(&self, timeout: Option<time::Duration>) -> Result<()> {
        let timeout = timeout.unwrap_or(self.table.options().wait_for_active_timeout);
        self.table.wait_for_active(timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case::empty(json!({}), ModelOptions::default())]
    #[case::overrides(
        json!({
            "create": false,
            "update": true,
            "waitForActive": false,
            "waitForActiveTimeout": 1500,
            "prefix": "test-",
        }),
        ModelOptions {
            create: false,
            update: true,
            wait_for_active: false,
            wait_for_active_timeout: time::Duration::from_millis(1500),
            prefix: "test-".to_string(),
        }
    )]
    fn test_model_options_from_json(
        #[case] json: serde_json::Value,
        #[case] expected: ModelOptions,
    ) {
        let actual: ModelOptions = serde_json::from_value(json).unwrap();
        assert_eq!(actual, expected);
    }

    fn model(options: ModelOptions) -> Model {
        let schema = Schema::from_json(
            json!({
                "id": {
                    "type": "string",
                    "hashKey": true,
                },
            }),
            crate::schema::SchemaOptions::default(),
        )
        .unwrap();
        let config = aws_sdk_dynamodb::Config::builder()
            .behavior_version(aws_sdk_dynamodb::config::BehaviorVersion::latest())
            .build();
        Model::new("users", sync::Arc::new(schema), Client::from_conf(config), options)
    }

    #[test]
    fn test_model_table_name() {
        let model = model(ModelOptions {
            prefix: "dev-".to_string(),
            ..Default::default()
        });
        assert_eq!(model.name(), "users");
        assert_eq!(model.table().name(), "dev-users");
    }

    #[test]
    fn test_new_document() {
        let model = model(ModelOptions::default());
        assert_eq!(
            model.new_document(json!({"id": "x"})).unwrap(),
            Value::from(json!({"id": "x"})).into_document().unwrap()
        );
        assert!(matches!(model.new_document(json!([1])), Err(Error::Model(_))));
    }

    #[tokio::test]
    async fn test_update_without_key_defaults() {
        let model = model(ModelOptions {
            create: false,
            ..Default::default()
        });
        let result = model
            .update(None, UpdateRequest::default(), UpdateOptions::default())
            .await;
        assert!(matches!(result, Err(Error::Model(_))));
    }
}
