use crate::error::{Error, Result};
use crate::schema::{Item, Schema};
use crate::value::{Document, Value};

use aws_sdk_dynamodb::types;
use indexmap::IndexMap;
use std::{collections, fmt, str};

/// Comparison operator of a key condition or filter.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Comparison {
    /// `EQ`
    Eq,
    /// `NE`
    Ne,
    /// `LT`
    Lt,
    /// `LE`
    Le,
    /// `GT`
    Gt,
    /// `GE`
    Ge,
    /// `CONTAINS`
    Contains,
    /// `NOT_CONTAINS`
    NotContains,
    /// `BEGINS_WITH`
    BeginsWith,
    /// `IN`
    In,
    /// `BETWEEN`
    Between,
    /// `NULL`
    Null,
    /// `NOT_NULL`
    NotNull,
}

impl Comparison {
    /// Operators accepted on a range key condition.
    pub const RANGE_KEY: [Self; 7] = [
        Self::Eq,
        Self::Le,
        Self::Lt,
        Self::Ge,
        Self::Gt,
        Self::BeginsWith,
        Self::Between,
    ];

    /// Operator this comparison turns into after `not()`, if it has one.
    pub fn negated(self) -> Option<Self> {
        match self {
            Self::Eq => Some(Self::Ne),
            Self::Ne => Some(Self::Eq),
            Self::Lt => Some(Self::Ge),
            Self::Ge => Some(Self::Lt),
            Self::Le => Some(Self::Gt),
            Self::Gt => Some(Self::Le),
            Self::Contains => Some(Self::NotContains),
            Self::NotContains => Some(Self::Contains),
            Self::Null => Some(Self::NotNull),
            Self::NotNull => Some(Self::Null),
            Self::BeginsWith | Self::In | Self::Between => None,
        }
    }

    /// Wire operator.
    pub fn operator(self) -> types::ComparisonOperator {
        match self {
            Self::Eq => types::ComparisonOperator::Eq,
            Self::Ne => types::ComparisonOperator::Ne,
            Self::Lt => types::ComparisonOperator::Lt,
            Self::Le => types::ComparisonOperator::Le,
            Self::Gt => types::ComparisonOperator::Gt,
            Self::Ge => types::ComparisonOperator::Ge,
            Self::Contains => types::ComparisonOperator::Contains,
            Self::NotContains => types::ComparisonOperator::NotContains,
            Self::BeginsWith => types::ComparisonOperator::BeginsWith,
            Self::In => types::ComparisonOperator::In,
            Self::Between => types::ComparisonOperator::Between,
            Self::Null => types::ComparisonOperator::Null,
            Self::NotNull => types::ComparisonOperator::NotNull,
        }
    }

    /// Wire operator name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "EQ",
            Self::Ne => "NE",
            Self::Lt => "LT",
            Self::Le => "LE",
            Self::Gt => "GT",
            Self::Ge => "GE",
            Self::Contains => "CONTAINS",
            Self::NotContains => "NOT_CONTAINS",
            Self::BeginsWith => "BEGINS_WITH",
            Self::In => "IN",
            Self::Between => "BETWEEN",
            Self::Null => "NULL",
            Self::NotNull => "NOT_NULL",
        }
    }

    /// Values a comparison of a declared document takes: an array for `in` and
    /// `between`, nothing for the null checks, the value itself otherwise.
    pub(crate) fn values_from_json(self, json: &serde_json::Value) -> Vec<Value> {
        match (self, json) {
            (Self::Null | Self::NotNull, _) => Vec::new(),
            (Self::In | Self::Between, serde_json::Value::Array(values)) => {
                values.iter().cloned().map(Value::from).collect()
            }
            (_, value) => vec![Value::from(value.clone())],
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl str::FromStr for Comparison {
    type Err = Error;

    /// Accepts the wire names and their camel-case spellings, ignoring case.
    fn from_str(name: &str) -> Result<Self> {
        let normalized = name.replace('_', "").to_ascii_lowercase();
        let comparison = match normalized.as_str() {
            "eq" => Self::Eq,
            "ne" => Self::Ne,
            "lt" => Self::Lt,
            "le" => Self::Le,
            "gt" => Self::Gt,
            "ge" => Self::Ge,
            "contains" => Self::Contains,
            "notcontains" => Self::NotContains,
            "beginswith" => Self::BeginsWith,
            "in" => Self::In,
            "between" => Self::Between,
            "null" => Self::Null,
            "notnull" => Self::NotNull,
            _ => return Err(Error::Query(format!("Invalid comparison: {name}"))),
        };
        Ok(comparison)
    }
}

/// What the next comparison applies to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Target {
    HashKey,
    RangeKey(String),
    Filter(String),
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) enum BuildState {
    #[default]
    Idle,
    AwaitingOperator(Target),
}

/// A recorded comparison against one attribute.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Predicate {
    pub(crate) name: String,
    pub(crate) comparison: Comparison,
    pub(crate) values: Vec<Value>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ChainKind {
    Query,
    Scan,
}

impl ChainKind {
    fn error(self, message: String) -> Error {
        match self {
            Self::Query => Error::Query(message),
            Self::Scan => Error::Scan(message),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Scan => "scan",
        }
    }
}

/// Fluent condition state shared by query and scan builders.
///
/// Misuse is recorded, first error wins, and every later call is a no-op until
/// [`ConditionChain::finish`] reports it.
#[derive(Debug)]
pub(crate) struct ConditionChain {
    kind: ChainKind,
    state: BuildState,
    negated: bool,
    error: Option<Error>,
    pub(crate) hash: Option<Predicate>,
    pub(crate) range: Option<Predicate>,
    pub(crate) filters: IndexMap<String, Predicate>,
}

impl ConditionChain {
    pub(crate) fn new(kind: ChainKind) -> Self {
        Self {
            kind,
            state: BuildState::Idle,
            negated: false,
            error: None,
            hash: None,
            range: None,
            filters: IndexMap::new(),
        }
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(self.kind.error(message.into()));
        }
    }

    pub(crate) fn select(&mut self, target: Target) {
        if self.error.is_some() {
            return;
        }
        let kind = self.kind.name();
        if let BuildState::AwaitingOperator(_) = self.state {
            return self.fail(format!(
                "Invalid {kind} state; where() must follow comparison"
            ));
        }
        match &target {
            Target::Filter(name) if self.filters.contains_key(name) => {
                return self.fail(format!(
                    "Invalid {kind} state; {name} filter can only be used once"
                ));
            }
            Target::RangeKey(name) if self.range.is_some() => {
                return self.fail(format!(
                    "Invalid {kind} state; range key {name} given after another range key"
                ));
            }
            _ => {}
        }
        self.state = BuildState::AwaitingOperator(target);
    }

    /// Names the hash key and waits for its comparison.
    pub(crate) fn hash_key(&mut self, name: String) {
        self.hash = Some(Predicate {
            name,
            comparison: Comparison::Eq,
            values: Vec::new(),
        });
        self.select(Target::HashKey);
    }

    pub(crate) fn not(&mut self) {
        self.negated = true;
    }

    pub(crate) fn compare(&mut self, comparison: Comparison, values: Vec<Value>) {
        if self.error.is_some() {
            return;
        }
        let kind = self.kind.name();
        let comparison = if self.negated {
            match comparison.negated() {
                Some(negated) => negated,
                None => {
                    return self.fail(format!(
                        "Invalid {kind} state: {comparison} cannot follow not()"
                    ));
                }
            }
        } else {
            comparison
        };
        let target = match std::mem::take(&mut self.state) {
            BuildState::AwaitingOperator(target) => target,
            BuildState::Idle => {
                return self.fail(format!(
                    "Invalid {kind} state; {comparison} must follow {kind}(), where() or filter()"
                ));
            }
        };
        match target {
            Target::HashKey => {
                if comparison != Comparison::Eq {
                    return self.fail(format!("Invalid {kind} state; eq must follow query()"));
                }
                if let Some(hash) = &mut self.hash {
                    hash.values = values;
                }
            }
            Target::RangeKey(name) => {
                if !Comparison::RANGE_KEY.contains(&comparison) {
                    return self.fail(format!(
                        "Invalid {kind} state; {comparison} is not a valid range key comparison"
                    ));
                }
                self.range = Some(Predicate {
                    name,
                    comparison,
                    values,
                });
            }
            Target::Filter(name) => {
                self.filters.insert(
                    name.clone(),
                    Predicate {
                        name,
                        comparison,
                        values,
                    },
                );
            }
        }
        self.negated = false;
    }

    /// Recorded error, or an error for a chain left waiting on a comparison.
    pub(crate) fn finish(&mut self) -> Result<()> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        if let BuildState::AwaitingOperator(target) = &self.state {
            let kind = self.kind.name();
            let subject = match target {
                Target::HashKey => "hash key".to_string(),
                Target::RangeKey(name) | Target::Filter(name) => name.clone(),
            };
            return Err(self.kind.error(format!(
                "Invalid {kind} state; {subject} is missing a comparison"
            )));
        }
        Ok(())
    }

    /// Encodes a predicate's values through the schema.
    pub(crate) fn condition(
        &self,
        schema: &Schema,
        predicate: &Predicate,
    ) -> Result<types::Condition> {
        let attribute_value_list = match predicate.comparison {
            Comparison::Null | Comparison::NotNull => Vec::new(),
            _ => predicate
                .values
                .iter()
                .map(|value| {
                    schema.encode(&predicate.name, value, true)?.ok_or_else(|| {
                        self.kind.error(format!(
                            "Invalid {} value for {}",
                            predicate.comparison, predicate.name
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
        };
        let condition = types::Condition::builder()
            .set_attribute_value_list(Some(attribute_value_list))
            .comparison_operator(predicate.comparison.operator())
            .build()?;
        Ok(condition)
    }

    pub(crate) fn filter_conditions(
        &self,
        schema: &Schema,
    ) -> Result<Option<collections::HashMap<String, types::Condition>>> {
        if self.filters.is_empty() {
            return Ok(None);
        }
        let conditions = self
            .filters
            .values()
            .map(|predicate| Ok((predicate.name.clone(), self.condition(schema, predicate)?)))
            .collect::<Result<_>>()?;
        Ok(Some(conditions))
    }
}

/// Shape of the result a read resolves to.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ReadMode {
    /// Decoded documents with counts and the continuation key.
    #[default]
    Documents,
    /// The first document, if any.
    One,
    /// Only the matching count.
    Count,
    /// Matching and scanned counts.
    Counts,
}

/// Options shared by query and scan.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct ReadOptions {
    pub(crate) attributes: Option<Vec<String>>,
    pub(crate) conditional_operator: Option<types::ConditionalOperator>,
    pub(crate) consistent: bool,
    pub(crate) limit: Option<i32>,
    pub(crate) mode: ReadMode,
    pub(crate) start_key: Option<Item>,
}

/// Request fields shared by query and scan.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReadInput {
    /// `AttributesToGet`
    pub attributes_to_get: Option<Vec<String>>,
    /// `ConditionalOperator`
    pub conditional_operator: Option<types::ConditionalOperator>,
    /// `ConsistentRead`
    pub consistent_read: Option<bool>,
    /// `ExclusiveStartKey`
    pub exclusive_start_key: Option<Item>,
    /// `Limit`
    pub limit: Option<i32>,
    /// `Select`
    pub select: Option<types::Select>,
    /// `TableName`
    pub table_name: String,
}

impl ReadInput {
    pub(crate) fn new(table_name: &str, options: ReadOptions) -> Self {
        let limit = match options.mode {
            ReadMode::One => Some(1),
            _ => options.limit,
        };
        let select = match options.mode {
            ReadMode::Count | ReadMode::Counts => Some(types::Select::Count),
            _ => None,
        };
        Self {
            attributes_to_get: options.attributes,
            conditional_operator: options.conditional_operator,
            consistent_read: options.consistent.then_some(true),
            exclusive_start_key: options.start_key,
            limit,
            select,
            table_name: table_name.to_string(),
        }
    }
}

/// apply common read input settings to a builder
#[macro_export]
macro_rules! apply_read_input {
    ($builder:expr, $read_input:expr) => {
        $builder
            .set_attributes_to_get($read_input.attributes_to_get)
            .set_conditional_operator($read_input.conditional_operator)
            .set_consistent_read($read_input.consistent_read)
            .set_exclusive_start_key($read_input.exclusive_start_key)
            .set_limit($read_input.limit)
            .set_select($read_input.select)
            .table_name($read_input.table_name)
    };
}

/// Decoded page of a query or scan.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Documents {
    /// Decoded items.
    pub items: Vec<Document>,
    /// Number of matching items.
    pub count: i32,
    /// Number of items evaluated before filtering.
    pub scanned_count: i32,
    /// Continuation key to pass to `start_at` for the next page.
    pub last_key: Option<Item>,
}

/// Result of a query or scan, shaped by its [`ReadMode`].
#[derive(Clone, Debug, PartialEq)]
pub enum ReadResult {
    /// Decoded documents.
    Documents(Documents),
    /// The first document, if any.
    One(Option<Document>),
    /// Matching count.
    Count(i32),
    /// Matching and scanned counts.
    Counts {
        /// Number of matching items.
        count: i32,
        /// Number of items evaluated before filtering.
        scanned_count: i32,
    },
}

impl ReadResult {
    pub(crate) fn materialize(
        schema: &Schema,
        mode: ReadMode,
        items: Option<Vec<Item>>,
        count: i32,
        scanned_count: i32,
        last_key: Option<Item>,
    ) -> Result<Self> {
        let result = match mode {
            ReadMode::Count => Self::Count(count),
            ReadMode::Counts => Self::Counts {
                count,
                scanned_count,
            },
            ReadMode::One => match items.unwrap_or_default().first() {
                Some(item) => Self::One(Some(schema.from_wire(item)?)),
                None => Self::One(None),
            },
            ReadMode::Documents => {
                let items = items
                    .unwrap_or_default()
                    .iter()
                    .map(|item| schema.from_wire(item))
                    .collect::<Result<_>>()?;
                Self::Documents(Documents {
                    items,
                    count,
                    scanned_count,
                    last_key,
                })
            }
        };
        Ok(result)
    }

    /// Decoded documents, whatever the mode. Counts yield none.
    pub fn into_documents(self) -> Vec<Document> {
        match self {
            Self::Documents(documents) => documents.items,
            Self::One(document) => document.into_iter().collect(),
            Self::Count(_) | Self::Counts { .. } => Vec::new(),
        }
    }
}

pub(crate) fn aggregate_capacity(
    capacities: Vec<types::ConsumedCapacity>,
) -> types::ConsumedCapacity {
    let (cap, read, write, table) = capacities.into_iter().fold(
        (0.0, 0.0, 0.0, None),
        |(cap, read, write, table), capacity| {
            (
                cap + capacity.capacity_units.unwrap_or(0.0),
                read + capacity.read_capacity_units.unwrap_or(0.0),
                write + capacity.write_capacity_units.unwrap_or(0.0),
                table.or(capacity.table_name),
            )
        },
    );
    types::ConsumedCapacity::builder()
        .set_table_name(table)
        .set_capacity_units(Some(cap))
        .set_read_capacity_units(Some(read))
        .set_write_capacity_units(Some(write))
        .build()
}
