//! Catalog of models sharing one client.

use crate::model::{Model, ModelOptions};
use crate::schema::Schema;

use aws_sdk_dynamodb::Client;
use indexmap::IndexMap;
use serde::Deserialize;
use std::{sync, time};

/// Model options left unset fall back to the registry defaults.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PartialModelOptions {
    /// See [`ModelOptions::create`].
    pub create: Option<bool>,
    /// See [`ModelOptions::update`].
    pub update: Option<bool>,
    /// See [`ModelOptions::wait_for_active`].
    pub wait_for_active: Option<bool>,
    /// See [`ModelOptions::wait_for_active_timeout`], in milliseconds.
    pub wait_for_active_timeout: Option<u64>,
    /// See [`ModelOptions::prefix`].
    pub prefix: Option<String>,
}

impl PartialModelOptions {
    /// Fills every unset option from `defaults`.
    pub fn merge(self, defaults: &ModelOptions) -> ModelOptions {
        ModelOptions {
            create: self.create.unwrap_or(defaults.create),
            update: self.update.unwrap_or(defaults.update),
            wait_for_active: self.wait_for_active.unwrap_or(defaults.wait_for_active),
            wait_for_active_timeout: self
                .wait_for_active_timeout
                .map(time::Duration::from_millis)
                .unwrap_or(defaults.wait_for_active_timeout),
            prefix: self.prefix.unwrap_or_else(|| defaults.prefix.clone()),
        }
    }
}

/// Models registered by prefixed name.
///
/// Registering a name twice returns the first model.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_odm::registry::{PartialModelOptions, Registry};
/// use dynamodb_odm::schema::{Schema, SchemaOptions};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// # async fn example(client: Client) -> dynamodb_odm::error::Result<()> {
/// let schema = Arc::new(Schema::from_json(
///     json!({"id": {"type": "string", "hashKey": true}}),
///     SchemaOptions::default(),
/// )?);
/// let registry = Registry::new(client);
/// let users = registry.model("users", schema.clone(), PartialModelOptions::default());
/// let again = registry.model("users", schema, PartialModelOptions::default());
/// assert!(Arc::ptr_eq(&users, &again));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Registry {
    client: Client,
    defaults: ModelOptions,
    models: sync::Mutex<IndexMap<String, sync::Arc<Model>>>,
}

impl Registry {
    /// Empty registry using `client` for every model.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            defaults: ModelOptions::default(),
            models: sync::Mutex::new(IndexMap::new()),
        }
    }

    /// Shared client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Options applied to models registered from now on.
    pub fn defaults(&self) -> &ModelOptions {
        &self.defaults
    }

    /// Replaces the defaults; unset options keep their current default.
    pub fn set_defaults(&mut self, defaults: PartialModelOptions) {
        self.defaults = defaults.merge(&self.defaults);
    }

    /// Registers `schema` under `name`, or returns the model already registered under
    /// the prefixed name.
    pub fn model(
        &self,
        name: &str,
        schema: sync::Arc<Schema>,
        options: PartialModelOptions,
    ) -> sync::Arc<Model> {
        let options = options.merge(&self.defaults);
        let key = format!("{}{name}", options.prefix);
        let mut models = self.models.lock().unwrap_or_else(sync::PoisonError::into_inner);
        models
            .entry(key)
            .or_insert_with(|| {
                sync::Arc::new(Model::new(name, schema, self.client.clone(), options))
            })
            .clone()
    }

    /// Model registered under the prefixed `name`.
    pub fn get(&self, name: &str) -> Option<sync::Arc<Model>> {
        self.models
            .lock()
            .unwrap_or_else(sync::PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::schema::SchemaOptions;
    use rstest::rstest;
    use serde_json::json;

    fn registry() -> Registry {
        let config = aws_sdk_dynamodb::Config::builder()
            .behavior_version(aws_sdk_dynamodb::config::BehaviorVersion::latest())
            .build();
        Registry::new(Client::from_conf(config))
    }

    fn schema() -> sync::Arc<Schema> {
        sync::Arc::new(
            Schema::from_json(
                json!({
                    "id": {
                        "type": "string",
                        "hashKey": true,
                    },
                }),
                SchemaOptions::default(),
            )
            .unwrap(),
        )
    }

    #[rstest]
    #[case::nothing_set(PartialModelOptions::default(), ModelOptions::default())]
    #[case::some_set(
        PartialModelOptions {
            update: Some(true),
            wait_for_active_timeout: Some(10),
            ..Default::default()
        },
        ModelOptions {
            update: true,
            wait_for_active_timeout: time::Duration::from_millis(10),
            ..Default::default()
        }
    )]
    fn test_merge(#[case] options: PartialModelOptions, #[case] expected: ModelOptions) {
        assert_eq!(options.merge(&ModelOptions::default()), expected);
    }

    #[test]
    fn test_model_is_registered_once() {
        let registry = registry();
        let first = registry.model("users", schema(), PartialModelOptions::default());
        let second = registry.model("users", schema(), PartialModelOptions::default());
        assert!(sync::Arc::ptr_eq(&first, &second));
        assert!(registry.get("users").is_some());
    }

    #[test]
    fn test_defaults_prefix() {
        let mut registry = registry();
        registry.set_defaults(PartialModelOptions {
            prefix: Some("dev-".to_string()),
            ..Default::default()
        });
        assert!(registry.defaults().create);
        let model = registry.model("users", schema(), PartialModelOptions::default());
        assert_eq!(model.table().name(), "dev-users");
        assert!(registry.get("users").is_none());
        assert!(registry.get("dev-users").is_some());
    }
}
