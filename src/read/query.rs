use crate::error::{Error, Result};
use crate::read::common::{
    ChainKind, Comparison, ConditionChain, ReadInput, ReadMode, ReadOptions, ReadResult, Target,
};
use crate::schema::{Item, Schema};
use crate::table::Table;
use crate::value::Value;

use aws_sdk_dynamodb::{Client, types};
use std::collections;

/// Rendered query request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryInput {
    /// `KeyConditions`
    pub key_conditions: collections::HashMap<String, types::Condition>,
    /// `QueryFilter`
    pub query_filter: Option<collections::HashMap<String, types::Condition>>,
    /// `IndexName`
    pub index_name: Option<String>,
    /// `ScanIndexForward`
    pub scan_index_forward: Option<bool>,
    /// Fields shared with scan.
    pub read: ReadInput,
}

/// Fluent query on the hash key, with an optional range condition and filters.
///
/// Misuse of the chain is recorded and reported by [`Query::build`], so a chain
/// can always be written out in full.
///
/// ```rust,no_run
/// use dynamodb_odm::read::query::Query;
/// use dynamodb_odm::schema::{Schema, SchemaOptions};
/// use serde_json::json;
///
/// # fn example() -> dynamodb_odm::error::Result<()> {
/// let schema = Schema::from_json(
///     json!({
///         "owner": {"type": "string", "hashKey": true},
///         "at": {"type": "number", "rangeKey": true},
///     }),
///     SchemaOptions::default(),
/// )?;
/// let input = Query::new(&schema, "events", "owner")
///     .eq("ada")
///     .where_("at")
///     .between(1, 10)
///     .descending()
///     .limit(5)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Query<'a> {
    schema: &'a Schema,
    table_name: String,
    table: Option<&'a Table>,
    chain: ConditionChain,
    options: ReadOptions,
    scan_index_forward: Option<bool>,
}

impl<'a> Query<'a> {
    fn empty(schema: &'a Schema, table_name: impl Into<String>) -> Self {
        Self {
            schema,
            table_name: table_name.into(),
            table: None,
            chain: ConditionChain::new(ChainKind::Query),
            options: ReadOptions::default(),
            scan_index_forward: None,
        }
    }

    /// Query waiting for a comparison on `hash_name`.
    pub fn new(
        schema: &'a Schema,
        table_name: impl Into<String>,
        hash_name: impl Into<String>,
    ) -> Self {
        let mut query = Self::empty(schema, table_name);
        query.chain.hash_key(hash_name.into());
        query
    }

    /// Query bound to a table, sent through [`Query::exec`].
    pub fn on(table: &'a Table, hash_name: impl Into<String>) -> Self {
        let mut query = Self::new(table.schema(), table.name(), hash_name);
        query.table = Some(table);
        query
    }

    /// Query from a key document: `{"hash": {"id": {"eq": v}}, "range": {"at": {"gt": v}}}`,
    /// or a bare hash condition `{"id": v}` / `{"id": {"eq": v}}`.
    pub fn from_document(
        schema: &'a Schema,
        table_name: impl Into<String>,
        document: &serde_json::Value,
    ) -> Self {
        let mut query = Self::empty(schema, table_name);
        let (hash, range) = match document.get("hash") {
            Some(hash) => (hash, document.get("range")),
            None => (document, None),
        };
        let Some((name, value)) = hash.as_object().and_then(|hash| hash.iter().next()) else {
            query.chain.fail("Invalid query state; hash key condition missing");
            return query;
        };
        let value = match value {
            serde_json::Value::Object(condition) if condition.len() == 1 => {
                condition.get("eq").unwrap_or(value)
            }
            value => value,
        };
        query.chain.hash_key(name.clone());
        query = query.eq(Value::from(value.clone()));
        if let Some((name, condition)) = range
            .and_then(|range| range.as_object())
            .and_then(|range| range.iter().next())
        {
            query = query.where_(name.clone());
            match condition.as_object().and_then(|condition| condition.iter().next()) {
                Some((operator, values)) => match operator.parse::<Comparison>() {
                    Ok(comparison) => {
                        let values = comparison.values_from_json(values);
                        query.chain.compare(comparison, values);
                    }
                    Err(_) => query
                        .chain
                        .fail(format!("Invalid query state; unknown comparison {operator}")),
                },
                None => query = query.eq(Value::from(condition.clone())),
            }
        }
        query
    }

    /// Selects the range key condition.
    pub fn where_(mut self, name: impl Into<String>) -> Self {
        self.chain.select(Target::RangeKey(name.into()));
        self
    }

    /// Selects a filter on a non-key attribute.
    pub fn filter(mut self, name: impl Into<String>) -> Self {
        self.chain.select(Target::Filter(name.into()));
        self
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

    /// `CONTAINS`, filters only.
    pub fn contains(self, value: impl Into<Value>) -> Self {
        self.compare(Comparison::Contains, vec![value.into()])
    }

    /// `BEGINS_WITH`
    pub fn begins_with(self, value: impl Into<Value>) -> Self {
        self.compare(Comparison::BeginsWith, vec![value.into()])
    }

    /// `IN`, filters only.
    pub fn in_<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.compare(Comparison::In, values)
    }

    /// `BETWEEN`, bounds inclusive.
    pub fn between(self, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.compare(Comparison::Between, vec![low.into(), high.into()])
    }

    /// `NULL`, or `NOT_NULL` after [`Query::not`].
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

    /// Resolves to the first matching document.
    pub fn one(mut self) -> Self {
        self.options.mode = ReadMode::One;
        self
    }

    /// Strongly consistent read.
    pub fn consistent(mut self) -> Self {
        self.options.consistent = true;
        self
    }

    /// Range key order, highest first.
    pub fn descending(mut self) -> Self {
        self.scan_index_forward = Some(false);
        self
    }

    /// Range key order, lowest first.
    pub fn ascending(mut self) -> Self {
        self.scan_index_forward = Some(true);
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

    /// First global index on the queried hash attribute, else the first local index
    /// on a range attribute that is not the primary range key.
    fn index_name(schema: &Schema, hash_name: &str, range_name: Option<&str>) -> Option<String> {
        let find = |indexes: &indexmap::IndexMap<String, String>, attribute: &str| {
            indexes
                .iter()
                .find(|(_, indexed)| indexed.as_str() == attribute)
                .map(|(index, _)| index.clone())
        };
        let global = (schema.hash_key().name() != hash_name)
            .then(|| find(schema.global_indexes(), hash_name))
            .flatten();
        global.or_else(|| {
            let range_name = range_name?;
            if schema.range_key().is_some_and(|range_key| range_key.name() == range_name) {
                return None;
            }
            find(schema.local_indexes(), range_name)
        })
    }

    /// Renders the request, reporting any error recorded by the chain.
    pub fn build(mut self) -> Result<QueryInput> {
        self.chain.finish()?;
        let schema = self.schema;
        let hash = self
            .chain
            .hash
            .as_ref()
            .filter(|hash| !hash.values.is_empty())
            .ok_or_else(|| {
                Error::Query("Invalid query state; hash key value missing".to_string())
            })?;
        let mut key_conditions = collections::HashMap::with_capacity(2);
        key_conditions.insert(hash.name.clone(), self.chain.condition(schema, hash)?);
        if let Some(range) = &self.chain.range {
            key_conditions.insert(range.name.clone(), self.chain.condition(schema, range)?);
        }
        let index_name = Self::index_name(
            schema,
            &hash.name,
            self.chain.range.as_ref().map(|range| range.name.as_str()),
        );
        let query_filter = self.chain.filter_conditions(schema)?;
        Ok(QueryInput {
            key_conditions,
            query_filter,
            index_name,
            scan_index_forward: self.scan_index_forward,
            read: ReadInput::new(&self.table_name, self.options),
        })
    }

    /// Sends the query as a single page.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_odm.query", skip_all, err)
    )]
    pub async fn send(self, client: &Client) -> Result<ReadResult> {
        let schema = self.schema;
        let mode = self.options.mode;
        let query = self.build()?;
        Self::send_input(schema, mode, query, client).await
    }

    /// Reports a broken chain, then waits for the bound table and sends the query.
    pub async fn exec(self) -> Result<ReadResult> {
        let table = self
            .table
            .ok_or_else(|| Error::Query("Query is not bound to a table".to_string()))?;
        let schema = self.schema;
        let mode = self.options.mode;
        let query = self.build()?;
        table.ready().await?;
        Self::send_input(schema, mode, query, table.client()).await
    }

    async fn send_input(
        schema: &Schema,
        mode: ReadMode,
        query: QueryInput,
        client: &Client,
    ) -> Result<ReadResult> {
        let builder = client
            .query()
            .set_key_conditions(Some(query.key_conditions))
            .set_query_filter(query.query_filter)
            .set_index_name(query.index_name)
            .set_scan_index_forward(query.scan_index_forward);
        let output = crate::apply_read_input!(builder, query.read)
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

    static SCHEMA: sync::LazyLock<Schema> = sync::LazyLock::new(schema);

    fn schema() -> Schema {
        Schema::from_json(
            json!({
                "owner": {
                    "type": "string",
                    "hashKey": true,
                },
                "at": {
                    "type": "number",
                    "rangeKey": true,
                },
                "email": {
                    "type": "string",
                    "index": {"global": true, "name": "EmailIndex"},
                },
                "score": {
                    "type": "number",
                    "index": {"name": "ScoreIndex"},
                },
                "tags": ["string"],
                "title": "string",
            }),
            SchemaOptions::default(),
        )
        .unwrap()
    }

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

    #[test]
    fn test_range_between() {
        let schema = schema();
        let input = Query::new(&schema, "events", "owner")
            .eq("ada")
            .where_("at")
            .between(1, 10)
            .build()
            .unwrap();
        assert_eq!(
            input,
            QueryInput {
                key_conditions: collections::HashMap::from([
                    (
                        "owner".to_string(),
                        condition(
                            types::ComparisonOperator::Eq,
                            vec![s("ada")]
                        ),
                    ),
                    (
                        "at".to_string(),
                        condition(
                            types::ComparisonOperator::Between,
                            vec![n("1"), n("10")]
                        ),
                    ),
                ]),
                read: ReadInput {
                    table_name: "events".to_string(),
                    ..Default::default()
                },
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_filters_and_options() {
        let schema = schema();
        let input = Query::new(&schema, "events", "owner")
            .eq("ada")
            .filter("title")
            .not()
            .eq("draft")
            .filter("tags")
            .contains("rust")
            .or()
            .descending()
            .consistent()
            .attributes(["title"])
            .one()
            .build()
            .unwrap();
        assert_eq!(
            input.query_filter,
            Some(collections::HashMap::from([
                (
                    "title".to_string(),
                    condition(types::ComparisonOperator::Ne, vec![s("draft")]),
                ),
                (
                    "tags".to_string(),
                    condition(types::ComparisonOperator::Contains, vec![s("rust")]),
                ),
            ]))
        );
        assert_eq!(input.scan_index_forward, Some(false));
        assert_eq!(
            input.read,
            ReadInput {
                attributes_to_get: Some(vec!["title".to_string()]),
                conditional_operator: Some(types::ConditionalOperator::Or),
                consistent_read: Some(true),
                limit: Some(1),
                table_name: "events".to_string(),
                ..Default::default()
            }
        );
    }

    #[rstest]
    #[case::count(Query::new(&SCHEMA, "t", "owner").eq("a").count(), Some(types::Select::Count))]
    #[case::counts(Query::new(&SCHEMA, "t", "owner").eq("a").counts(), Some(types::Select::Count))]
    #[case::documents(Query::new(&SCHEMA, "t", "owner").eq("a"), None)]
    fn test_select(#[case] query: Query<'_>, #[case] expected: Option<types::Select>) {
        assert_eq!(query.build().unwrap().read.select, expected);
    }

    #[rstest]
    #[case::primary_hash(Query::new(&SCHEMA, "t", "owner").eq("a"), None)]
    #[case::primary_range(
        Query::new(&SCHEMA, "t", "owner").eq("a").where_("at").gt(1),
        None
    )]
    #[case::global(
        Query::new(&SCHEMA, "t", "email").eq("a@b.c"),
        Some("EmailIndex")
    )]
    #[case::local(
        Query::new(&SCHEMA, "t", "owner").eq("a").where_("score").ge(5),
        Some("ScoreIndex")
    )]
    #[case::unindexed_hash(Query::new(&SCHEMA, "t", "title").eq("x"), None)]
    fn test_index_resolution(#[case] query: Query<'_>, #[case] expected: Option<&str>) {
        assert_eq!(query.build().unwrap().index_name.as_deref(), expected);
    }

    #[rstest]
    #[case::comparison_before_selector(
        Query::new(&SCHEMA, "t", "owner").eq("a").gt(1)
    )]
    #[case::hash_not_eq(Query::new(&SCHEMA, "t", "owner").gt("a"))]
    #[case::where_before_hash(Query::new(&SCHEMA, "t", "owner").where_("at"))]
    #[case::filter_twice(
        Query::new(&SCHEMA, "t", "owner").eq("a").filter("title").eq("x").filter("title").eq("y")
    )]
    #[case::not_begins_with(
        Query::new(&SCHEMA, "t", "owner").eq("a").filter("title").not().begins_with("x")
    )]
    #[case::not_between(
        Query::new(&SCHEMA, "t", "owner").eq("a").where_("at").not().between(1, 2)
    )]
    #[case::range_contains(
        Query::new(&SCHEMA, "t", "owner").eq("a").where_("at").contains(1)
    )]
    #[case::second_range(
        Query::new(&SCHEMA, "t", "owner").eq("a").where_("at").gt(1).where_("score").lt(2)
    )]
    #[case::dangling_filter(Query::new(&SCHEMA, "t", "owner").eq("a").filter("title"))]
    #[case::empty_value(Query::new(&SCHEMA, "t", "owner").eq(""))]
    fn test_invalid_chain(#[case] query: Query<'_>) {
        assert!(matches!(query.build(), Err(Error::Query(_))));
    }

    #[test]
    fn test_not_eq_is_ne() {
        let schema = schema();
        let negated = Query::new(&schema, "t", "owner")
            .eq("a")
            .filter("title")
            .not()
            .eq("x")
            .build()
            .unwrap();
        let plain = Query::new(&schema, "t", "owner")
            .eq("a")
            .filter("title")
            .compare(Comparison::Ne, vec![Value::from("x")])
            .build()
            .unwrap();
        assert_eq!(negated, plain);
    }

    #[test]
    fn test_null_has_no_values() {
        let schema = schema();
        let input = Query::new(&schema, "t", "owner")
            .eq("a")
            .filter("title")
            .not()
            .null()
            .build()
            .unwrap();
        assert_eq!(
            input.query_filter.unwrap()["title"],
            condition(types::ComparisonOperator::NotNull, Vec::new())
        );
    }

    #[rstest]
    #[case::bare(json!({"owner": "a"}))]
    #[case::eq(json!({"owner": {"eq": "a"}}))]
    #[case::hash_and_range(
        json!({"hash": {"owner": {"eq": "a"}}, "range": {"at": {"between": [1, 10]}}})
    )]
    fn test_from_document(#[case] document: serde_json::Value) {
        let schema = schema();
        let input = Query::from_document(&schema, "t", &document).build().unwrap();
        assert_eq!(
            input.key_conditions["owner"],
            condition(types::ComparisonOperator::Eq, vec![s("a")])
        );
        if let Some(range) = input.key_conditions.get("at") {
            assert_eq!(
                range,
                &condition(types::ComparisonOperator::Between, vec![n("1"), n("10")])
            );
        }
    }

    #[test]
    fn test_from_document_invalid() {
        let schema = schema();
        let document = json!({"hash": {"owner": "a"}, "range": {"at": {"near": 1}}});
        let query = Query::from_document(&schema, "t", &document);
        assert!(matches!(query.build(), Err(Error::Query(_))));
    }

    #[test]
    fn test_start_at() {
        let schema = schema();
        let key = Item::from([("owner".to_string(), s("a")), ("at".to_string(), n("3"))]);
        let input = Query::new(&schema, "t", "owner")
            .eq("a")
            .start_at(key.clone())
            .limit(10)
            .build()
            .unwrap();
        assert_eq!(input.read.exclusive_start_key, Some(key));
        assert_eq!(input.read.limit, Some(10));
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
            "t",
            sync::Arc::new(schema),
            Client::from_conf(config),
            crate::model::ModelOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_exec_reports_chain_error_before_contacting_table() {
        let table = unreachable_table(schema());
        let result = Query::on(&table, "owner").exec().await;
        assert!(matches!(result, Err(Error::Query(_))));
        let result = Query::on(&table, "owner").eq("a").where_("at").exec().await;
        assert!(matches!(result, Err(Error::Query(_))));
    }
}
