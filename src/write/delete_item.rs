use crate::common::{ExpressionInput, key::Key};
use crate::error::{Error, Result};
use crate::schema::{Item, Schema};
use crate::value::Document;
use crate::write::common::{self, ConditionOptions, WriteInput};

use aws_sdk_dynamodb::{Client, types};
use serde::Deserialize;

/// Options of a delete.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DeleteOptions {
    /// Requires the item to exist and returns it as it was before the delete.
    pub update: bool,
    /// Caller condition.
    #[serde(flatten)]
    pub condition: ConditionOptions,
}

/// delete item operation
#[derive(Clone, Debug, Default, PartialEq)]
struct DeleteItemInput {
    key: Item,
    write_operation: WriteInput,
}

/// Delete item operation.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_odm::schema::Schema;
/// use dynamodb_odm::write::delete_item::{DeleteItem, DeleteOptions};
///
/// # async fn example(client: &Client, schema: &Schema) -> dynamodb_odm::error::Result<()> {
/// let old = DeleteItem::new(schema, "users", "user-1")
///     .options(DeleteOptions {
///         update: true,
///         ..Default::default()
///     })
///     .send(client)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct DeleteItem<'a> {
    /// Primary key of the item.
    pub key: Key,
    /// Delete options.
    pub options: DeleteOptions,
    schema: &'a Schema,
    table_name: String,
}

impl<'a> DeleteItem<'a> {
    /// Delete of the item under `key`.
    pub fn new(schema: &'a Schema, table_name: impl Into<String>, key: impl Into<Key>) -> Self {
        Self {
            key: key.into(),
            options: DeleteOptions::default(),
            schema,
            table_name: table_name.into(),
        }
    }

    /// Replaces the delete options.
    pub fn options(mut self, options: DeleteOptions) -> Self {
        self.options = options;
        self
    }
}

impl TryFrom<DeleteItem<'_>> for DeleteItemInput {
    type Error = Error;

    fn try_from(delete_item: DeleteItem<'_>) -> Result<Self> {
        let key = delete_item.key.to_item(delete_item.schema)?;
        let guard = if delete_item.options.update {
            common::hash_key_guard(delete_item.schema, true)
        } else {
            ExpressionInput::default()
        };
        let mut write_operation = WriteInput::new(
            &delete_item.table_name,
            delete_item.schema,
            guard,
            &delete_item.options.condition,
        )?;
        if delete_item.options.update {
            write_operation.return_values = Some(types::ReturnValue::AllOld);
        }
        let operation = Self {
            key,
            write_operation,
        };
        Ok(operation)
    }
}

impl DeleteItem<'_> {
    /// Execute the delete item operation, returning the deleted item when
    /// [`DeleteOptions::update`] is set.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_odm.delete_item", skip_all, err)
    )]
    pub async fn send(self, client: &Client) -> Result<Option<Document>> {
        let schema = self.schema;
        let delete_item: DeleteItemInput = self.try_into()?;
        let builder = client.delete_item().set_key(Some(delete_item.key));
        let output = crate::apply_write_operation!(builder, delete_item.write_operation)
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        output.attributes.map(|item| schema.from_wire(&item)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::schema::SchemaOptions;
    use rstest::rstest;
    use serde_json::json;
    use std::sync;

    static SCHEMA: sync::LazyLock<Schema> = sync::LazyLock::new(|| {
        Schema::from_json(
            json!({
                "id": {
                    "type": "string",
                    "hashKey": true,
                },
                "at": {
                    "type": "number",
                    "rangeKey": true,
                },
            }),
            SchemaOptions::default(),
        )
        .unwrap()
    });

    #[rstest]
    #[case::plain(
        DeleteItem::new(&SCHEMA, "a", ("x", 1)),
        DeleteItemInput {
            key: Item::from(
                [
                    (
                        "id".to_string(),
                        types::AttributeValue::S(
                            "x".to_string()
                        ),
                    ),
                    (
                        "at".to_string(),
                        types::AttributeValue::N(
                            "1".to_string()
                        ),
                    ),
                ]
            ),
            write_operation: WriteInput {
                table_name: "a".to_string(),
                ..Default::default()
            },
        }
    )]
    #[case::update(
        DeleteItem::new(&SCHEMA, "a", ("x", 1)).options(DeleteOptions {
            update: true,
            ..Default::default()
        }),
        DeleteItemInput {
            key: Item::from(
                [
                    (
                        "id".to_string(),
                        types::AttributeValue::S(
                            "x".to_string()
                        ),
                    ),
                    (
                        "at".to_string(),
                        types::AttributeValue::N(
                            "1".to_string()
                        ),
                    ),
                ]
            ),
            write_operation: WriteInput {
                condition_expression: Some(
                    "attribute_exists(id)".to_string()
                ),
                return_values: Some(types::ReturnValue::AllOld),
                table_name: "a".to_string(),
                ..Default::default()
            },
        }
    )]
    fn test_delete_item_input(
        #[case] delete_item: DeleteItem<'_>,
        #[case] expected: DeleteItemInput,
    ) {
        let actual: DeleteItemInput = delete_item.try_into().unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_delete_item_requires_range_key() {
        let result: Result<DeleteItemInput> = DeleteItem::new(&SCHEMA, "a", "x").try_into();
        assert!(matches!(result, Err(Error::Model(_))));
    }
}
