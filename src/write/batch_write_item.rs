use crate::common::key::Key;
use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::value::Document;

use aws_sdk_dynamodb::{Client, types};
use futures_util::future;
use std::collections;

/// Maximum number of requests in one batch write.
pub const MAX_BATCH_WRITE_SIZE: usize = 25;

/// A single request within a batch write.
#[derive(Clone, Debug, PartialEq)]
pub enum BatchWriteItemRequest {
    /// Stores the document, defaults filled.
    PutItem(Document),
    /// Deletes the item under the key.
    DeleteItem(Key),
}

impl BatchWriteItemRequest {
    fn into_write_request(self, schema: &Schema) -> Result<types::WriteRequest> {
        let builder = match self {
            Self::PutItem(mut document) => {
                let item = schema.to_wire(&mut document)?;
                let put_request = types::PutRequest::builder().set_item(Some(item)).build()?;
                types::WriteRequest::builder().set_put_request(Some(put_request))
            }
            Self::DeleteItem(key) => {
                let key = key.to_item(schema)?;
                let delete_request = types::DeleteRequest::builder().set_key(Some(key)).build()?;
                types::WriteRequest::builder().set_delete_request(Some(delete_request))
            }
        };
        Ok(builder.build())
    }
}

/// batch write item operation, one request per chunk
#[derive(Clone, Debug, Default, PartialEq)]
struct BatchWriteItemInput {
    chunks: Vec<Vec<types::WriteRequest>>,
    return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    table_name: String,
}

/// Outcome of a batch write.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchWriteOutput {
    /// Requests the store left unprocessed, to be resent by the caller.
    pub unprocessed: Vec<types::WriteRequest>,
    /// Capacity consumed by every chunk, when requested.
    pub consumed_capacity: Option<types::ConsumedCapacity>,
}

/// Batch write item operation.
///
/// Requests are sent in chunks of [`MAX_BATCH_WRITE_SIZE`], all chunks concurrently.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_odm::common::key::Key;
/// use dynamodb_odm::schema::Schema;
/// use dynamodb_odm::write::batch_write_item::{BatchWriteItem, BatchWriteItemRequest};
///
/// # async fn example(client: &Client, schema: &Schema) -> dynamodb_odm::error::Result<()> {
/// let requests = vec![
///     BatchWriteItemRequest::DeleteItem(Key::from("user-1")),
///     BatchWriteItemRequest::DeleteItem(Key::from("user-2")),
/// ];
/// BatchWriteItem::new(schema, "users", requests).send(client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct BatchWriteItem<'a> {
    /// Write requests.
    pub requests: Vec<BatchWriteItemRequest>,
    /// Whether to return the consumed capacity information.
    pub return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    schema: &'a Schema,
    table_name: String,
}

impl<'a> BatchWriteItem<'a> {
    /// Batch of `requests` against one table.
    pub fn new(
        schema: &'a Schema,
        table_name: impl Into<String>,
        requests: Vec<BatchWriteItemRequest>,
    ) -> Self {
        Self {
            requests,
            return_consumed_capacity: None,
            schema,
            table_name: table_name.into(),
        }
    }
}

impl TryFrom<BatchWriteItem<'_>> for BatchWriteItemInput {
    type Error = Error;

    fn try_from(batch_write_item: BatchWriteItem<'_>) -> Result<Self> {
        let schema = batch_write_item.schema;
        let requests = batch_write_item
            .requests
            .into_iter()
            .map(|request| request.into_write_request(schema))
            .collect::<Result<Vec<_>>>()?;
        let chunks = requests
            .chunks(MAX_BATCH_WRITE_SIZE)
            .map(<[types::WriteRequest]>::to_vec)
            .collect();
        let operation = Self {
            chunks,
            return_consumed_capacity: batch_write_item.return_consumed_capacity,
            table_name: batch_write_item.table_name,
        };
        Ok(operation)
    }
}

impl BatchWriteItem<'_> {
    /// Execute the batch write item operation.
    ///
    /// Every chunk settles before the first failure, if any, is returned.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_odm.batch_write_item", skip_all, err)
    )]
    pub async fn send(self, client: &Client) -> Result<BatchWriteOutput> {
        let batch_write_item: BatchWriteItemInput = self.try_into()?;
        let table_name = batch_write_item.table_name;
        let requests = batch_write_item.chunks.into_iter().map(|chunk| {
            client
                .batch_write_item()
                .set_request_items(Some(collections::HashMap::from([(table_name.clone(), chunk)])))
                .set_return_consumed_capacity(batch_write_item.return_consumed_capacity.clone())
                .send()
        });
        let mut output = BatchWriteOutput::default();
        let mut capacities = Vec::new();
        for result in future::join_all(requests).await {
            let mut chunk = result.map_err(aws_sdk_dynamodb::Error::from)?;
            if let Some(unprocessed) = chunk
                .unprocessed_items
                .as_mut()
                .and_then(|unprocessed| unprocessed.remove(&table_name))
            {
                output.unprocessed.extend(unprocessed);
            }
            capacities.extend(chunk.consumed_capacity.unwrap_or_default());
        }
        if !capacities.is_empty() {
            output.consumed_capacity = Some(crate::read::common::aggregate_capacity(capacities));
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::schema::{Item, SchemaOptions};
    use crate::value::Value;
    use serde_json::json;
    use std::sync;

    static SCHEMA: sync::LazyLock<Schema> = sync::LazyLock::new(|| {
        Schema::from_json(
            json!({
                "id": {
                    "type": "string",
                    "hashKey": true,
                },
                "count": {
                    "type": "number",
                    "default": 0,
                },
            }),
            SchemaOptions::default(),
        )
        .unwrap()
    });

    #[test]
    fn test_batch_write_item_requests() {
        let requests = vec![
            BatchWriteItemRequest::PutItem(
                Value::from(json!({"id": "a"})).into_document().unwrap(),
            ),
            BatchWriteItemRequest::DeleteItem(Key::from("b")),
        ];
        let input: BatchWriteItemInput = BatchWriteItem::new(&SCHEMA, "t", requests)
            .try_into()
            .unwrap();
        assert_eq!(
            input.chunks,
            vec![vec![
                types::WriteRequest::builder()
                    .put_request(
                        types::PutRequest::builder()
                            .set_item(Some(Item::from([
                                (
                                    "id".to_string(),
                                    types::AttributeValue::S(
                                        "a".to_string()
                                    ),
                                ),
                                (
                                    "count".to_string(),
                                    types::AttributeValue::N(
                                        "0".to_string()
                                    ),
                                ),
                            ])))
                            .build()
                            .unwrap()
                    )
                    .build(),
                types::WriteRequest::builder()
                    .delete_request(
                        types::DeleteRequest::builder()
                            .set_key(Some(Item::from([(
                                "id".to_string(),
                                types::AttributeValue::S(
                                    "b".to_string()
                                ),
                            )])))
                            .build()
                            .unwrap()
                    )
                    .build(),
            ]]
        );
    }

    #[test]
    fn test_batch_write_item_chunks() {
        let requests = (0..60)
            .map(|index| BatchWriteItemRequest::DeleteItem(Key::from(format!("k{index}"))))
            .collect();
        let input: BatchWriteItemInput = BatchWriteItem::new(&SCHEMA, "t", requests)
            .try_into()
            .unwrap();
        assert_eq!(
            input.chunks.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![25, 25, 10]
        );
    }

    #[test]
    fn test_batch_write_item_invalid_key() {
        let requests = vec![BatchWriteItemRequest::DeleteItem(Key::from(""))];
        let result: Result<BatchWriteItemInput> =
            BatchWriteItem::new(&SCHEMA, "t", requests).try_into();
        assert!(matches!(result, Err(Error::Model(_))));
    }
}
