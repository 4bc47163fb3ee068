use crate::common::{ExpressionInput, key::Key};
use crate::error::{Error, Result};
use crate::schema::{Item, Schema};
use crate::value::{Document, Value};
use crate::write::common::{ConditionOptions, WriteInput};

use aws_sdk_dynamodb::{Client, types};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections;

/// Separator between items of one clause.
const ITEM_SEPARATOR: &str = ", ";

/// Separator between clauses.
const CLAUSE_SEPARATOR: &str = " ";

/// Encoded operations of an update, keyed by attribute name.
///
/// Rendering assigns `#_n<i>`/`:_p<i>` placeholders from one counter, in the order
/// if-absent sets, sets, adds, removals.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateOperations {
    if_not_exists_set: IndexMap<String, types::AttributeValue>,
    set: IndexMap<String, types::AttributeValue>,
    add: IndexMap<String, types::AttributeValue>,
    remove: IndexMap<String, Option<types::AttributeValue>>,
}

impl UpdateOperations {
    /// Sets `name` only when the stored item has no value for it.
    pub fn if_not_exists_set(&mut self, name: impl Into<String>, value: types::AttributeValue) {
        self.if_not_exists_set.insert(name.into(), value);
    }

    /// Sets `name`.
    pub fn set(&mut self, name: impl Into<String>, value: types::AttributeValue) {
        self.set.insert(name.into(), value);
    }

    /// Adds to a number or a set.
    pub fn add(&mut self, name: impl Into<String>, value: types::AttributeValue) {
        self.add.insert(name.into(), value);
    }

    /// Removes the attribute, or only the given elements of a set.
    pub fn remove(&mut self, name: impl Into<String>, value: Option<types::AttributeValue>) {
        self.remove.insert(name.into(), value);
    }

    /// Whether no operation was recorded.
    pub fn is_empty(&self) -> bool {
        self.if_not_exists_set.is_empty()
            && self.set.is_empty()
            && self.add.is_empty()
            && self.remove.is_empty()
    }

    fn touches(&self, name: &str) -> bool {
        self.if_not_exists_set.contains_key(name)
            || self.set.contains_key(name)
            || self.add.contains_key(name)
            || self.remove.contains_key(name)
    }

    /// Rejects a second operation on `name`; one expression can't name a path twice.
    fn claim(&self, name: &str) -> Result<()> {
        if self.touches(name) {
            return Err(Error::model(format!(
                "Attribute \"{name}\" is updated by more than one operation"
            )));
        }
        Ok(())
    }

    /// Renders `SET .. ADD .. DELETE .. REMOVE ..`, skipping empty clauses.
    pub(crate) fn render(self) -> ExpressionInput {
        let mut expression_attribute_names = collections::HashMap::new();
        let mut expression_attribute_values = Item::new();
        let mut index = 0;
        let mut placeholders = |name: String, value: Option<types::AttributeValue>| {
            let name_placeholder = format!("#_n{index}");
            let value_placeholder = format!(":_p{index}");
            index += 1;
            expression_attribute_names.insert(name_placeholder.clone(), name);
            let has_value = value.is_some();
            if let Some(value) = value {
                expression_attribute_values.insert(value_placeholder.clone(), value);
            }
            (name_placeholder, has_value.then_some(value_placeholder))
        };
        let mut set = Vec::with_capacity(self.if_not_exists_set.len() + self.set.len());
        for (name, value) in self.if_not_exists_set {
            let (name, value) = placeholders(name, Some(value));
            let value = value.unwrap_or_default();
            set.push(format!("{name} = if_not_exists({name}, {value})"));
        }
        for (name, value) in self.set {
            let (name, value) = placeholders(name, Some(value));
            set.push(format!("{name} = {}", value.unwrap_or_default()));
        }
        let mut add = Vec::with_capacity(self.add.len());
        for (name, value) in self.add {
            let (name, value) = placeholders(name, Some(value));
            add.push(format!("{name} {}", value.unwrap_or_default()));
        }
        let mut delete = Vec::new();
        let mut remove = Vec::new();
        for (name, value) in self.remove {
            match placeholders(name, value) {
                (name, Some(value)) => delete.push(format!("{name} {value}")),
                (name, None) => remove.push(name),
            }
        }
        let expression = [("SET", set), ("ADD", add), ("DELETE", delete), ("REMOVE", remove)]
            .into_iter()
            .filter(|(_, items)| !items.is_empty())
            .map(|(clause, items)| format!("{clause} {}", items.join(ITEM_SEPARATOR)))
            .collect::<Vec<_>>()
            .join(CLAUSE_SEPARATOR);
        ExpressionInput {
            expression,
            expression_attribute_names,
            expression_attribute_values,
        }
    }
}

/// Changes requested by an update.
///
/// ```rust
/// use dynamodb_odm::write::update_item::UpdateRequest;
/// use serde_json::json;
///
/// let fluent = UpdateRequest::default()
///     .put("name", "Ada")
///     .add("count", 1)
///     .delete("nickname");
/// let parsed = UpdateRequest::from_json(json!({
///     "$PUT": {"name": "Ada"},
///     "$ADD": {"count": 1},
///     "$DELETE": {"nickname": null},
/// }))
/// .unwrap();
/// assert_eq!(fluent, parsed);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateRequest {
    /// Values to set; empty values remove the attribute.
    pub put: Document,
    /// Attributes to remove, or set elements to delete when a value is given.
    pub delete: IndexMap<String, Option<Value>>,
    /// Values to add to numbers or sets.
    pub add: Document,
}

impl UpdateRequest {
    /// Sets `name` to `value`.
    pub fn put(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.put.insert(name.into(), value.into());
        self
    }

    /// Adds `value` to `name`.
    pub fn add(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add.insert(name.into(), value.into());
        self
    }

    /// Removes `name`.
    pub fn delete(mut self, name: impl Into<String>) -> Self {
        self.delete.insert(name.into(), None);
        self
    }

    /// Deletes the elements of `value` from the set `name`.
    pub fn delete_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.delete.insert(name.into(), Some(value.into()));
        self
    }

    /// Parses `{"$PUT": {..}, "$DELETE": {..}, "$ADD": {..}}`; any other object is a `$PUT`.
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        let Value::Object(mut document) = Value::from(json) else {
            return Err(Error::model("Update must be an object"));
        };
        let is_operations = ["$PUT", "$DELETE", "$ADD"]
            .iter()
            .any(|operation| document.contains_key(*operation));
        if !is_operations {
            return Ok(Self {
                put: document,
                ..Default::default()
            });
        }
        let mut section = |operation: &str| -> Result<Document> {
            match document.shift_remove(operation) {
                Some(Value::Object(section)) => Ok(section),
                Some(Value::Null) | None => Ok(Document::new()),
                Some(_) => Err(Error::model(format!("{operation} must be an object"))),
            }
        };
        let put = section("$PUT")?;
        let add = section("$ADD")?;
        let delete = section("$DELETE")?
            .into_iter()
            .map(|(name, value)| (name, (!value.is_empty()).then_some(value)))
            .collect();
        Ok(Self { put, delete, add })
    }
}

/// Options of an update.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateOptions {
    /// Fills required attributes left untouched with their defaults when the item is created.
    pub create_required: bool,
    /// Refreshes the timestamp attributes of the schema.
    pub update_timestamps: bool,
    /// Stores empty arrays instead of removing the attribute.
    pub allow_empty_array: bool,
    /// Caller condition.
    #[serde(flatten)]
    pub condition: ConditionOptions,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            create_required: false,
            update_timestamps: true,
            allow_empty_array: false,
            condition: ConditionOptions::default(),
        }
    }
}

/// update item operation
#[derive(Clone, Debug, Default, PartialEq)]
struct UpdateItemInput {
    key: Item,
    update_expression: Option<String>,
    write_operation: WriteInput,
}

/// Update item operation, returning the stored item after the update.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_odm::schema::Schema;
/// use dynamodb_odm::write::update_item::{UpdateItem, UpdateRequest};
///
/// # async fn example(client: &Client, schema: &Schema) -> dynamodb_odm::error::Result<()> {
/// let request = UpdateRequest::default().add("count", 5);
/// let updated = UpdateItem::new(schema, "counters", "page-1", request)
///     .send(client)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct UpdateItem<'a> {
    /// Primary key of the item.
    pub key: Key,
    /// Requested changes.
    pub request: UpdateRequest,
    /// Update options.
    pub options: UpdateOptions,
    schema: &'a Schema,
    table_name: String,
}

impl<'a> UpdateItem<'a> {
    /// Update of the item under `key`.
    pub fn new(
        schema: &'a Schema,
        table_name: impl Into<String>,
        key: impl Into<Key>,
        request: UpdateRequest,
    ) -> Self {
        Self {
            key: key.into(),
            request,
            options: UpdateOptions::default(),
            schema,
            table_name: table_name.into(),
        }
    }

    /// Replaces the update options.
    pub fn options(mut self, options: UpdateOptions) -> Self {
        self.options = options;
        self
    }

    fn operations(&self) -> Result<UpdateOperations> {
        let schema = self.schema;
        let mut operations = UpdateOperations::default();
        for (name, value) in &self.request.put {
            let Some(attribute) = schema.attribute(name) else {
                #[cfg(feature = "tracing")]
                tracing::debug!(attribute = %name, "ignoring undeclared attribute in $PUT");
                continue;
            };
            let empty_array = !self.options.allow_empty_array
                && value.as_array().is_some_and(Vec::is_empty);
            if value.is_empty() || empty_array {
                operations.remove(name, None);
                continue;
            }
            match attribute.to_wire(Some(value), false)? {
                Some(value) => operations.set(name, value),
                None => operations.remove(name, None),
            }
        }
        for (name, value) in &self.request.delete {
            let Some(attribute) = schema.attribute(name) else {
                #[cfg(feature = "tracing")]
                tracing::debug!(attribute = %name, "ignoring undeclared attribute in $DELETE");
                continue;
            };
            operations.claim(name)?;
            let value = match value {
                Some(value) => attribute.to_wire(Some(value), false)?,
                None => None,
            };
            operations.remove(name, value);
        }
        for (name, value) in &self.request.add {
            let Some(attribute) = schema.attribute(name) else {
                #[cfg(feature = "tracing")]
                tracing::debug!(attribute = %name, "ignoring undeclared attribute in $ADD");
                continue;
            };
            operations.claim(name)?;
            if let Some(value) = attribute.to_wire(Some(value), false)? {
                operations.add(name, value);
            }
        }
        let timestamps = schema.timestamps();
        if self.options.update_timestamps
            && let Some(timestamps) = timestamps
        {
            let timestamps = [(&timestamps.created_at, true), (&timestamps.updated_at, false)];
            for (name, if_not_exists) in timestamps {
                let Some(attribute) = schema.attribute(name) else {
                    continue;
                };
                if operations.touches(name) {
                    continue;
                }
                let now = attribute.default_value();
                let Some(value) = attribute.to_wire(now.as_ref(), false)? else {
                    continue;
                };
                if if_not_exists {
                    operations.if_not_exists_set(name.clone(), value);
                } else {
                    operations.set(name.clone(), value);
                }
            }
        }
        if self.options.create_required {
            let range_key = schema.range_key().map(|range_key| range_key.name());
            for (name, attribute) in schema.attributes() {
                let is_key = name == schema.hash_key().name() || Some(name.as_str()) == range_key;
                let is_timestamp = timestamps.is_some_and(|timestamps| {
                    *name == timestamps.created_at || *name == timestamps.updated_at
                });
                if !attribute.is_required() || is_key || is_timestamp || operations.touches(name) {
                    continue;
                }
                let default = attribute.default_value().ok_or_else(|| {
                    Error::validation(format!(
                        "Required attribute \"{name}\" does not have a default."
                    ))
                })?;
                if let Some(value) = attribute.to_wire(Some(&default), false)? {
                    operations.if_not_exists_set(name.clone(), value);
                }
            }
        }
        Ok(operations)
    }
}

impl TryFrom<UpdateItem<'_>> for UpdateItemInput {
    type Error = Error;

    fn try_from(update_item: UpdateItem<'_>) -> Result<Self> {
        let key = update_item.key.to_item(update_item.schema)?;
        let operations = update_item.operations()?;
        let mut write_operation = WriteInput::new(
            &update_item.table_name,
            update_item.schema,
            ExpressionInput::default(),
            &update_item.options.condition,
        )?;
        write_operation.return_values = Some(types::ReturnValue::AllNew);
        let update_expression = write_operation.merge_expression(operations.render());
        let operation = Self {
            key,
            update_expression,
            write_operation,
        };
        Ok(operation)
    }
}

impl UpdateItem<'_> {
    /// Execute the update item operation.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_odm.update_item", skip_all, err)
    )]
    pub async fn send(self, client: &Client) -> Result<Option<Document>> {
        let schema = self.schema;
        let update_item: UpdateItemInput = self.try_into()?;
        let builder = client
            .update_item()
            .set_key(Some(update_item.key))
            .set_update_expression(update_item.update_expression);
        let output = crate::apply_write_operation!(builder, update_item.write_operation)
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        output.attributes.map(|item| schema.from_wire(&item)).transpose()
    }
}
