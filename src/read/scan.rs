use crate::error::{Error, Result};
use crate::read::common::{
    ChainKind, Comparison, ConditionChain, ReadInput, ReadMode, ReadOptions, ReadResult, Target,
};
use crate::schema::{Item, Schema};
use crate::table::Table;
use crate::value::Value;

use aws_sdk_dynamodb::{Client, types};
use std::collections;

/// Rendered scan request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanInput {
    /// `ScanFilter`
    pub scan_filter: Option<collections::HashMap<String, types::Condition>>,
    /// `Segment`
    pub segment: Option<i32>,
    /// `TotalSegments`
    pub total_segments: Option<i32>,
    /// Fields shared with query.
    pub read: ReadInput,
}

/// Fluent scan with attribute filters.
///
/// ```rust,no_run
/// use dynamodb_odm::read::scan::Scan;
/// # fn example(schema: &dynamodb_odm::schema::Schema) -> dynamodb_odm::error::Result<()> {
/// let input = Scan::with_filter(schema, "users", "age")
///     .gt(18)
///     .filter("name")
///     .not()
///     .null()
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Scan<'a> {
    schema: &'a Schema,
    table_name: String,
    table: Option<&'a Table>,
    chain: ConditionChain,
    options: ReadOptions,
    group_operator: Option<types::ConditionalOperator>,
    segment: Option<(i32, i32)>,
}

impl<'a> Scan<'a> {
    /// Unfiltered scan.
    pub fn new(schema: &'a Schema, table_name: impl Into<String>) -> Self {
        Self {
            schema,
            table_name: table_name.into(),
            table: None,
            chain: ConditionChain::new(ChainKind::Scan),
            options: ReadOptions::default(),
            group_operator: None,
            segment: None,
        }
    }

    /// Scan bound to a table, sent through [`Scan::exec`].
    pub fn on(table: &'a Table) -> Self {
        let mut scan = Self::new(table.schema(), table.name());
        scan.table = Some(table);
        scan
    }

    /// Scan waiting for a comparison on `name`.
    pub fn with_filter(
        schema: &'a Schema,
        table_name: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::new(schema, table_name).filter(name)
    }

    /// Scan from a filter document, see [`Scan::parse_filter_object`].
    pub fn from_document(
        schema: &'a Schema,
        table_name: impl Into<String>,
        document: &serde_json::Value,
    ) -> Self {
        Self::new(schema, table_name).parse_filter_object(document)
    }

    /// Adds the filters of a document such as
    /// `{"or": [{"name": {"beginsWith": "A"}}, {"age": {"between": [18, 30]}}]}`.
    ///
    /// A bare value is an equality; `{"null": false}` is `NOT_NULL`. Nested `and`/`or`
    /// groups flatten onto one conditional operator, and mixing both is an error.
    pub fn parse_filter_object(mut self, document: &serde_json::Value) -> Self {
        let Some(document) = document.as_object() else {
            self.chain.fail("Invalid scan state; filter document must be an object");
            return self;
        };
        for (name, condition) in document {
            let operator = match name.as_str() {
                "and" => Some(types::ConditionalOperator::And),
                "or" => Some(types::ConditionalOperator::Or),
                _ => None,
            };
            if let Some(operator) = operator {
                if self.group_operator.as_ref().is_some_and(|group| *group != operator) {
                    self.chain.fail("Invalid scan state; and() and or() groups cannot be mixed");
                    return self;
                }
                self.group_operator = Some(operator.clone());
                self.options.conditional_operator = Some(operator);
                self = match condition {
                    serde_json::Value::Array(conditions) => conditions
                        .iter()
                        .fold(self, |scan, condition| scan.parse_filter_object(condition)),
                    condition => self.parse_filter_object(condition),
                };
                continue;
            }
            self.chain.select(Target::Filter(name.clone()));
            match condition {
                serde_json::Value::Object(comparison) if comparison.len() == 1 => {
                    let Some((operator, values)) = comparison.iter().next() else {
                        continue;
                    };
                    match operator.parse::<Comparison>() {
                        Ok(Comparison::Null)
                            if matches!(
                                values,
                                serde_json::Value::Null | serde_json::Value::Bool(false)
                            ) =>
                        {
                            self.chain.compare(Comparison::NotNull, Vec::new());
                        }
                        Ok(comparison) => {
                            let values = comparison.values_from_json(values);
                            self.chain.compare(comparison, values);
                        }
                        Err(_) => self
                            .chain
                            .fail(format!("Invalid scan state; unknown comparison {operator}")),
                    }
                }
                value => self.chain.compare(Comparison::Eq, vec![Value::from(value.clone())]),
            }
        }
        self
    }

    /// Selects a filter attribute.
    pub fn where_(mut self, name: impl Into<String>) -> Self {
        self.chain.select(Target::Filter(name.into()));
        self
    }

    /// Alias of [`Scan::where_`].
    pub fn filter(self, name: impl Into<String>) -> Self {
        self.where_(name)
    }

    /// Negates the next comparison.
    pub fn not(mut self) -> Self {
        self.chain.not();
        self
    }

    fn compare(mut self, comparison: Comparison, values: Vec<Value>) -> Self {
        self.chain.compare(comparison, values);
        self
    }

    /// `EQ`
    pub fn eq(self, value: impl Into<Value>) -> Self {
        self.compare(Comparison::Eq, vec![value.into()])
    }

    /// `NE`
    pub fn ne(self, value: impl Into<Value>) -> Self {
        self.compare(Comparison::Ne, vec![value.into()])
    }

    /// `LT`
    pub fn lt(self, value: impl Into<Value>) -> Self {
        self.compare(Comparison::Lt, vec![value.into()])
    }

    /// `LE`
    pub fn le(self, value: impl Into<Value>) -> Self {
        self.compare(Comparison::Le, vec![value.into()])
    }

    /// `GE`
    pub fn ge(self, value: impl Into<Value>) -> Self {
        self.compare(Comparison::Ge, vec![value.into()])
    }

    /// `GT`
    pub fn gt(self, value: impl Into<Value>) -> Self {
        self.compare(Comparison::Gt, vec![value.into()])
    }

    /// `CONTAINS`
    pub fn contains(self, value: impl Into<Value>) -> Self {
        self.compare(Comparison::Contains, vec![value.into()])
    }

    /// `BEGINS_WITH`
    pub fn begins_with(self, value: impl Into<Value>) -> Self {
        self.compare(Comparison::BeginsWith, vec![value.into()])
    }

    /// `IN`
    pub fn in_<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.compare(Comparison::In, values)
    }

    /// `BETWEEN`, bounds inclusive.
    pub fn between(self, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.compare(Comparison::Between, vec![low.into(), high.into()])
    }

    /// `NULL`, or `NOT_NULL` after [`Scan::not`].
    pub fn null(self) -> Self {
        self.compare(Comparison::Null, Vec::new())
    }

    /// Filters must all match.
    pub fn and(mut self) -> Self {
        self.options.conditional_operator = Some(types::ConditionalOperator::And);
        self
    }

    /// Any filter may match.
    pub fn or(mut self) -> Self {
        self.options.conditional_operator = Some(types::ConditionalOperator::Or);
        self
    }

    /// Maximum number of items evaluated.
    pub fn limit(mut self, limit: i32) -> Self {
        self.options.limit = Some(limit);
        self
    }

    /// Strongly consistent read.
    pub fn consistent(mut self) -> Self {
        self.options.consistent = true;
        self
    }

    /// Continues from the `last_key` of a previous page.
    pub fn start_at(mut self, key: Item) -> Self {
        self.options.start_key = Some(key);
        self
    }

    /// Attributes to fetch.
    pub fn attributes<S: Into<String>>(mut self, attributes: impl IntoIterator<Item = S>) -> Self {
        self.options.attributes = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    /// Resolves to the matching count only.
    pub fn count(mut self) -> Self {
        self.options.mode = ReadMode::Count;
        self
    }

    /// Resolves to the matching and scanned counts.
    pub fn counts(mut self) -> Self {
        self.options.mode = ReadMode::Counts;
        self
    }

    /// Reads one segment of a parallel scan.
    pub fn segment(mut self, segment: i32, total_segments: i32) -> Self {
        self.segment = Some((segment, total_segments));
        self
    }

    /// Renders the request, reporting any error recorded by the chain.
    pub fn build(mut self) -> Result<ScanInput> {
        self.chain.finish()?;
        if let Some((segment, total_segments)) = self.segment
            && (total_segments < 1 || !(0..total_segments).contains(&segment))
        {
            return Err(Error::Scan(format!(
                "Invalid scan state; segment {segment} out of {total_segments} segments"
            )));
        }
        let scan_filter = self.chain.filter_conditions(self.schema)?;
        Ok(ScanInput {
            scan_filter,
            segment: self.segment.map(|(segment, _)| segment),
            total_segments: self.segment.map(|(_, total_segments)| total_segments),
            read: ReadInput::new(&self.table_name, self.options),
        })
    }

    /// Sends the scan as a single page.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_odm.scan", skip_all, err)
    )]
    pub async fn send(self, client: &Client) -> Result<ReadResult> {
        let schema = self.schema;
        let mode = self.options.mode;
        let scan = self.build()?;
        Self::send_input(schema, mode, scan, client).await
    }

    /// Reports a broken chain, then waits for the bound table and sends the scan.
    pub async fn exec(self) -> Result<ReadResult> {
        let table = self
            .table
            .ok_or_else(|| Error::Scan("Scan is not bound to a table".to_string()))?;
        let schema = self.schema;
        let mode = self.options.mode;
        let scan = self.build()?;
        table.ready().await?;
        Self::send_input(schema, mode, scan, table.client()).await
    }

    async fn send_input(
        schema: &Schema,
        mode: ReadMode,
        scan: ScanInput,
        client: &Client,
    ) -> Result<ReadResult> {
        let builder = client
            .scan()
            .set_scan_filter(scan.scan_filter)
            .set_segment(scan.segment)
            .set_total_segments(scan.total_segments);
        let output = crate::apply_read_input!(builder, scan.read)
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        ReadResult::materialize(
            schema,
            mode,
            output.items,
            output.count,
            output.scanned_count,
            output.last_evaluated_key,
        )
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
                "id": "string",
                "name": "string",
                "age": "number",
                "tags": ["string"],
            }),
            SchemaOptions::default(),
        )
        .unwrap()
    });

    fn condition(
        operator: types::ComparisonOperator,
        values: Vec<types::AttributeValue>,
    ) -> types::Condition {
        types::Condition::builder()
            .set_attribute_value_list(Some(values))
            .comparison_operator(operator)
            .build()
            .unwrap()
    }

    fn s(value: &str) -> types::AttributeValue {
        types::AttributeValue::S(value.to_string())
    }

    fn n(value: &str) -> types::AttributeValue {
        types::AttributeValue::N(value.to_string())
    }

    #[rstest]
    #[case::unfiltered(Scan::new(&SCHEMA, "users"), None)]
    #[case::chained(
        Scan::with_filter(&SCHEMA, "users", "age").gt(18).filter("name").not().null(),
        Some(
            collections::HashMap::from([
                (
                    "age".to_string(),
                    condition(
                        types::ComparisonOperator::Gt,
                        vec![n("18")]
                    ),
                ),
                (
                    "name".to_string(),
                    condition(
                        types::ComparisonOperator::NotNull,
                        Vec::new()
                    ),
                ),
            ])
        )
    )]
    #[case::negated_contains(
        Scan::new(&SCHEMA, "users").where_("tags").not().contains("x"),
        Some(
            collections::HashMap::from([(
                "tags".to_string(),
                condition(
                    types::ComparisonOperator::NotContains,
                    vec![s("x")]
                ),
            )])
        )
    )]
    #[case::in_(
        Scan::new(&SCHEMA, "users").filter("name").in_(["a", "b"]),
        Some(
            collections::HashMap::from([(
                "name".to_string(),
                condition(
                    types::ComparisonOperator::In,
                    vec![s("a"), s("b")]
                ),
            )])
        )
    )]
    fn test_scan_filter(
        #[case] scan: Scan<'_>,
        #[case] expected: Option<collections::HashMap<String, types::Condition>>,
    ) {
        assert_eq!(scan.build().unwrap().scan_filter, expected);
    }

    #[test]
    fn test_parse_filter_object() {
        let input = Scan::from_document(
            &SCHEMA,
            "users",
            &json!({
                "or": [
                    {"name": {"beginsWith": "A"}},
                    {"and": [{"age": {"between": [18, 30]}}]},
                ],
                "id": "x",
                "tags": {"null": false},
            }),
        )
        .build();
        assert!(matches!(input, Err(Error::Scan(_))));

        let input = Scan::from_document(
            &SCHEMA,
            "users",
            &json!({
                "or": [
                    {"name": {"beginsWith": "A"}},
                    {"age": {"between": [18, 30]}},
                ],
                "id": "x",
                "tags": {"null": false},
            }),
        )
        .build()
        .unwrap();
        assert_eq!(
            input.read.conditional_operator,
            Some(types::ConditionalOperator::Or)
        );
        assert_eq!(
            input.scan_filter,
            Some(collections::HashMap::from([
                (
                    "name".to_string(),
                    condition(types::ComparisonOperator::BeginsWith, vec![s("A")]),
                ),
                (
                    "age".to_string(),
                    condition(types::ComparisonOperator::Between, vec![n("18"), n("30")]),
                ),
                (
                    "id".to_string(),
                    condition(types::ComparisonOperator::Eq, vec![s("x")]),
                ),
                (
                    "tags".to_string(),
                    condition(types::ComparisonOperator::NotNull, Vec::new()),
                ),
            ]))
        );
    }

    #[rstest]
    #[case::comparison_first(Scan::new(&SCHEMA, "users").eq(1))]
    #[case::filter_twice(Scan::new(&SCHEMA, "users").filter("age").gt(1).filter("age").lt(9))]
    #[case::not_in(Scan::new(&SCHEMA, "users").filter("name").not().in_(["a"]))]
    #[case::dangling(Scan::with_filter(&SCHEMA, "users", "age"))]
    #[case::selector_twice(Scan::new(&SCHEMA, "users").filter("age").filter("name"))]
    #[case::unknown_comparison(Scan::from_document(&SCHEMA, "users", &json!({"age": {"near": 1}})))]
    #[case::not_an_object(Scan::from_document(&SCHEMA, "users", &json!(["age"])))]
    #[case::bad_segment(Scan::new(&SCHEMA, "users").segment(4, 4))]
    fn test_invalid_scan(#[case] scan: Scan<'_>) {
        assert!(matches!(scan.build(), Err(Error::Scan(_))));
    }

    #[test]
    fn test_options() {
        let key = Item::from([("id".to_string(), s("a"))]);
        let input = Scan::new(&SCHEMA, "users")
            .segment(1, 4)
            .limit(10)
            .counts()
            .start_at(key.clone())
            .build()
            .unwrap();
        assert_eq!(
            input,
            ScanInput {
                segment: Some(1),
                total_segments: Some(4),
                read: ReadInput {
                    exclusive_start_key: Some(key),
                    limit: Some(10),
                    select: Some(types::Select::Count),
                    table_name: "users".to_string(),
                    ..Default::default()
                },
                ..Default::default()
            }
        );
    }

    fn unreachable_table(schema: Schema) -> Table {
        let config = aws_sdk_dynamodb::Config::builder()
            .behavior_version(aws_sdk_dynamodb::config::BehaviorVersion::latest())
            .region(aws_sdk_dynamodb::config::Region::new("us-east-1"))
            .credentials_provider(aws_sdk_dynamodb::config::Credentials::new(
                "key", "secret", None, None, "static",
            ))
            .endpoint_url("http://127.0.0.1:9")
            .build();
        Table::new(
            "users",
            sync::Arc::new(schema),
            Client::from_conf(config),
            crate::model::ModelOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_exec_reports_chain_error_before_contacting_table() {
        let schema = Schema::from_json(json!({"id": "string"}), SchemaOptions::default()).unwrap();
        let table = unreachable_table(schema);
        let result = Scan::on(&table).where_("x").and().exec().await;
        assert!(matches!(result, Err(Error::Scan(_))));
    }
}
