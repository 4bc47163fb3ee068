use crate::common::ExpressionInput;
use crate::error::{Error, Result};
use crate::schema::{Item, Schema};
use crate::value::Value;

use aws_sdk_dynamodb::types;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections;

/// Caller-supplied condition of a write.
///
/// Names are referenced as `#name` and values as `:name` in the expression; each
/// value is encoded through the schema attribute of the same name.
///
/// ```rust
/// use dynamodb_odm::write::common::ConditionOptions;
/// use dynamodb_odm::value::Value;
///
/// let condition = ConditionOptions::new("#count < :count")
///     .name("count", "count")
///     .value("count", Value::from(10));
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ConditionOptions {
    /// Condition expression.
    pub condition: Option<String>,
    /// Placeholder `#k` to attribute name.
    pub condition_names: IndexMap<String, String>,
    /// Placeholder `:k` to value of attribute `k`.
    pub condition_values: IndexMap<String, Value>,
}

impl ConditionOptions {
    /// Condition with no placeholders yet.
    pub fn new(condition: impl Into<String>) -> Self {
        Self {
            condition: Some(condition.into()),
            ..Default::default()
        }
    }

    /// Adds the name placeholder `#placeholder`.
    pub fn name(mut self, placeholder: impl Into<String>, attribute: impl Into<String>) -> Self {
        self.condition_names.insert(placeholder.into(), attribute.into());
        self
    }

    /// Adds the value placeholder `:attribute`.
    pub fn value(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.condition_values.insert(attribute.into(), value.into());
        self
    }

    /// Renders the condition, empty when no expression is set.
    pub(crate) fn to_expression(&self, schema: &Schema) -> Result<ExpressionInput> {
        let Some(condition) = &self.condition else {
            return Ok(ExpressionInput::default());
        };
        let expression_attribute_names = self
            .condition_names
            .iter()
            .map(|(placeholder, name)| (format!("#{placeholder}"), name.clone()))
            .collect();
        let mut expression_attribute_values = Item::with_capacity(self.condition_values.len());
        for (name, value) in &self.condition_values {
            let attribute = schema.attribute(name).ok_or_else(|| {
                Error::model(format!(
                    "Invalid condition value: {name}. The name must be declared in the schema."
                ))
            })?;
            if let Some(value) = attribute.to_wire(Some(value), false)? {
                expression_attribute_values.insert(format!(":{name}"), value);
            }
        }
        Ok(ExpressionInput {
            expression: condition.clone(),
            expression_attribute_names,
            expression_attribute_values,
        })
    }
}

/// Resolved fields shared by put, update and delete.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct WriteInput {
    pub(crate) condition_expression: Option<String>,
    pub(crate) expression_attribute_names: Option<collections::HashMap<String, String>>,
    pub(crate) expression_attribute_values: Option<Item>,
    pub(crate) return_values: Option<types::ReturnValue>,
    pub(crate) table_name: String,
}

impl WriteInput {
    /// Write guarded by `guard` and the caller's condition, combined as `(guard) and (condition)`.
    pub(crate) fn new(
        table_name: &str,
        schema: &Schema,
        guard: ExpressionInput,
        condition: &ConditionOptions,
    ) -> Result<Self> {
        let mut input = Self {
            table_name: table_name.to_string(),
            ..Default::default()
        };
        let expression = guard.and(condition.to_expression(schema)?);
        input.condition_expression = input.merge_expression(expression);
        Ok(input)
    }

    /// Merges the placeholder maps of an expression into this write.
    pub(crate) fn merge_expression(&mut self, expression: ExpressionInput) -> Option<String> {
        expression.merge_into(
            &mut self.expression_attribute_names,
            &mut self.expression_attribute_values,
        )
    }
}

/// `attribute_exists(<hash>)` or `attribute_not_exists(<hash>)`.
pub(crate) fn hash_key_guard(schema: &Schema, exists: bool) -> ExpressionInput {
    let function = if exists {
        "attribute_exists"
    } else {
        "attribute_not_exists"
    };
    ExpressionInput {
        expression: format!("{function}({})", schema.hash_key().name()),
        ..Default::default()
    }
}

/// apply common write operation settings to a builder
#[macro_export]
macro_rules! apply_write_operation {
    ($builder:expr, $write_operation:expr) => {
        $builder
            .set_condition_expression($write_operation.condition_expression)
            .set_expression_attribute_names($write_operation.expression_attribute_names)
            .set_expression_attribute_values($write_operation.expression_attribute_values)
            .set_return_values($write_operation.return_values)
            .table_name($write_operation.table_name)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::schema::SchemaOptions;
    use rstest::rstest;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::from_json(
            json!({
                "id": {
                    "type": "string",
                    "hashKey": true,
                },
                "count": "number",
            }),
            SchemaOptions::default(),
        )
        .unwrap()
    }

    #[rstest]
    #[case::no_condition(
        ExpressionInput::default(),
        ConditionOptions::default(),
        WriteInput {
            table_name: "a".to_string(),
            ..Default::default()
        }
    )]
    #[case::guard_only(
        hash_key_guard(&schema(), false),
        ConditionOptions::default(),
        WriteInput {
            condition_expression: Some(
                "attribute_not_exists(id)".to_string()
            ),
            table_name: "a".to_string(),
            ..Default::default()
        }
    )]
    #[case::guard_and_condition(
        hash_key_guard(&schema(), true),
        ConditionOptions::new("#c < :count")
            .name("c", "count")
            .value("count", 10),
        WriteInput {
            condition_expression: Some(
                "(attribute_exists(id)) and (#c < :count)".to_string()
            ),
            expression_attribute_names: Some(
                collections::HashMap::from(
                    [(
                        "#c".to_string(),
                        "count".to_string(),
                    )]
                )
            ),
            expression_attribute_values: Some(
                Item::from(
                    [(
                        ":count".to_string(),
                        types::AttributeValue::N(
                            "10".to_string()
                        ),
                    )]
                )
            ),
            table_name: "a".to_string(),
            ..Default::default()
        }
    )]
    fn test_write_input(
        #[case] guard: ExpressionInput,
        #[case] condition: ConditionOptions,
        #[case] expected: WriteInput,
    ) {
        let actual = WriteInput::new("a", &schema(), guard, &condition).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_condition_value_must_be_declared() {
        let condition = ConditionOptions::new("#x = :x").value("x", 1);
        assert!(matches!(
            condition.to_expression(&schema()),
            Err(Error::Model(_))
        ));
    }

    #[test]
    fn test_condition_options_from_json() {
        let options: ConditionOptions = serde_json::from_value(json!({
            "condition": "#c > :count",
            "conditionNames": {"c": "count"},
            "conditionValues": {"count": 1},
        }))
        .unwrap();
        assert_eq!(
            options,
            ConditionOptions::new("#c > :count")
                .name("c", "count")
                .value("count", 1)
        );
    }
}
