//! Common utilities for DynamoDB operations.
//!
//! Key handling and expression merging shared by the read and write operations.

/// Primary keys of items.
pub mod key;

use crate::schema::Item;

use std::collections;

/// Expression with its placeholder maps.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct ExpressionInput {
    pub(crate) expression: String,
    pub(crate) expression_attribute_names: collections::HashMap<String, String>,
    pub(crate) expression_attribute_values: Item,
}

impl ExpressionInput {
    /// Conjunction of two conditions, rendered as `(a) and (b)`.
    pub(crate) fn and(self, other: Self) -> Self {
        let expression = match (self.expression.is_empty(), other.expression.is_empty()) {
            (true, _) => other.expression,
            (_, true) => self.expression,
            _ => format!("({}) and ({})", self.expression, other.expression),
        };
        let mut expression_attribute_names = self.expression_attribute_names;
        expression_attribute_names.extend(other.expression_attribute_names);
        let mut expression_attribute_values = self.expression_attribute_values;
        expression_attribute_values.extend(other.expression_attribute_values);
        Self {
            expression,
            expression_attribute_names,
            expression_attribute_values,
        }
    }

    /// Moves the placeholder maps into request fields, leaving empty maps unset.
    /// Returns the expression, `None` when empty.
    pub(crate) fn merge_into(
        self,
        names: &mut Option<collections::HashMap<String, String>>,
        values: &mut Option<Item>,
    ) -> Option<String> {
        if !self.expression_attribute_names.is_empty() {
            names
                .get_or_insert_with(collections::HashMap::new)
                .extend(self.expression_attribute_names);
        }
        if !self.expression_attribute_values.is_empty() {
            values
                .get_or_insert_with(Item::new)
                .extend(self.expression_attribute_values);
        }
        (!self.expression.is_empty()).then_some(self.expression)
    }
}
