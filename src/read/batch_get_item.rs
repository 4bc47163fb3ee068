use crate::common::key::Key;
use crate::error::{Error, Result};
use crate::read::get_item::GetOptions;
use crate::schema::Schema;
use crate::value::Document;

use aws_sdk_dynamodb::{Client, types};
use futures_util::future;
use std::collections;

/// Maximum number of keys in one batch get request.
pub const MAX_BATCH_GET_SIZE: usize = 100;

/// batch get item operation, one request per chunk
#[derive(Clone, Debug, Default, PartialEq)]
struct BatchGetItemInput {
    chunks: Vec<types::KeysAndAttributes>,
    return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    table_name: String,
}

/// Documents of a batch get.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchGetOutput {
    /// Decoded items, in no particular order.
    pub documents: Vec<Document>,
    /// Keys the store left unprocessed, decoded.
    pub unprocessed: Vec<Document>,
    /// Capacity consumed by every chunk, when requested.
    pub consumed_capacity: Option<types::ConsumedCapacity>,
}

/// Batch get item operation.
///
/// Keys are sent in chunks of [`MAX_BATCH_GET_SIZE`], all chunks concurrently.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_odm::common::key::Key;
/// use dynamodb_odm::read::batch_get_item::BatchGetItem;
/// use dynamodb_odm::schema::Schema;
///
/// # async fn example(client: &Client, schema: &Schema) -> dynamodb_odm::error::Result<()> {
/// let keys = vec![Key::from("user-1"), Key::from("user-2")];
/// let output = BatchGetItem::new(schema, "users", keys).send(client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct BatchGetItem<'a> {
    /// Primary keys of the items.
    pub keys: Vec<Key>,
    /// Read options applied to every key.
    pub options: GetOptions,
    /// Whether to return the consumed capacity information.
    pub return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    schema: &'a Schema,
    table_name: String,
}

impl<'a> BatchGetItem<'a> {
    /// Read of the items under `keys`.
    pub fn new(schema: &'a Schema, table_name: impl Into<String>, keys: Vec<Key>) -> Self {
        Self {
            keys,
            options: GetOptions::default(),
            return_consumed_capacity: None,
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

impl TryFrom<BatchGetItem<'_>> for BatchGetItemInput {
    type Error = Error;

    fn try_from(batch_get_item: BatchGetItem<'_>) -> Result<Self> {
        let keys = batch_get_item
            .keys
            .iter()
            .map(|key| key.to_item(batch_get_item.schema))
            .collect::<Result<Vec<_>>>()?;
        let chunks = keys
            .chunks(MAX_BATCH_GET_SIZE)
            .map(|chunk| {
                types::KeysAndAttributes::builder()
                    .set_attributes_to_get(batch_get_item.options.attributes.clone())
                    .set_consistent_read(batch_get_item.options.consistent.then_some(true))
                    .set_keys(Some(chunk.to_vec()))
                    .build()
            })
            .collect::<Result<_, _>>()?;
        let input = Self {
            chunks,
            return_consumed_capacity: batch_get_item.return_consumed_capacity,
            table_name: batch_get_item.table_name,
        };
        Ok(input)
    }
}

impl BatchGetItem<'_> {
    /// Execute the batch get item operation.
    ///
    /// Every chunk settles before the first failure, if any, is returned.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_odm.batch_get_item", skip_all, err)
    )]
    pub async fn send(self, client: &Client) -> Result<BatchGetOutput> {
        let schema = self.schema;
        let batch_get_item: BatchGetItemInput = self.try_into()?;
        let table_name = batch_get_item.table_name;
        let requests = batch_get_item.chunks.into_iter().map(|keys_and_attributes| {
            client
                .batch_get_item()
                .set_request_items(Some(collections::HashMap::from([(
                    table_name.clone(),
                    keys_and_attributes,
                )])))
                .set_return_consumed_capacity(batch_get_item.return_consumed_capacity.clone())
                .send()
        });
        let mut output = BatchGetOutput::default();
        let mut capacities = Vec::new();
        for result in future::join_all(requests).await {
            let mut chunk = result.map_err(aws_sdk_dynamodb::Error::from)?;
            if let Some(items) = chunk
                .responses
                .as_mut()
                .and_then(|responses| responses.remove(&table_name))
            {
                for item in items {
                    output.documents.push(schema.from_wire(&item)?);
                }
            }
            if let Some(unprocessed) = chunk
                .unprocessed_keys
                .as_mut()
                .and_then(|unprocessed| unprocessed.remove(&table_name))
            {
                for key in unprocessed.keys {
                    output.unprocessed.push(schema.from_wire(&key)?);
                }
            }
            capacities.extend(chunk.consumed_capacity.unwrap_or_default());
        }
        if !capacities.is_empty() {
            output.consumed_capacity = Some(crate::read::common::aggregate_capacity(capacities));
        }
        Ok(output)
    }
}
