//! Table lifecycle.
//!
//! A [`Table`] binds a schema to a table name and a client. The first operation on it
//! runs [`Table::ready`], which creates the table or reconciles its global indexes
//! according to the model options, then waits for the table to become active.

/// Create-table request derivation and index comparison.
pub mod definition;

use crate::error::{Error, Result};
use crate::model::ModelOptions;
use crate::schema::Schema;
use definition::{IndexDiff, TableDefinition};

use aws_sdk_dynamodb::{Client, error::SdkError, types};
use std::{sync, time};
use tokio::sync::OnceCell;

const POLL_INTERVAL: time::Duration = time::Duration::from_millis(500);

/// A schema bound to a table name and a client.
#[derive(Debug)]
pub struct Table {
    name: String,
    schema: sync::Arc<Schema>,
    client: Client,
    options: ModelOptions,
    initialized: OnceCell<()>,
}

impl Table {
    /// Table handle. Nothing is sent until the first operation.
    pub fn new(
        name: impl Into<String>,
        schema: sync::Arc<Schema>,
        client: Client,
        options: ModelOptions,
    ) -> Self {
        Self {
            name: name.into(),
            schema,
            client,
            options,
            initialized: OnceCell::new(),
        }
    }

    /// Table name, prefix included.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schema of the stored items.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Client every operation is sent through.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Lifecycle options.
    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    /// Create-table request derived from the schema.
    pub fn definition(&self) -> Result<TableDefinition> {
        TableDefinition::build(&self.name, &self.schema)
    }

    /// Remote description, `None` when the table doesn't exist.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_odm.describe_table", skip_all, err)
    )]
    pub async fn describe(&self) -> Result<Option<types::TableDescription>> {
        match self.client.describe_table().table_name(&self.name).send().await {
            Ok(output) => Ok(output.table),
            Err(SdkError::ServiceError(error)) if error.err().is_resource_not_found_exception() => {
                Ok(None)
            }
            Err(error) => Err(aws_sdk_dynamodb::Error::from(error).into()),
        }
    }

    /// Creates the table with every declared index.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_odm.create_table", skip_all, err)
    )]
    pub async fn create(&self) -> Result<Option<types::TableDescription>> {
        let definition = self.definition()?;
        let local_secondary_indexes = definition.local_secondary_indexes;
        let global_secondary_indexes = definition.global_secondary_indexes;
        let output = self
            .client
            .create_table()
            .table_name(definition.table_name)
            .set_attribute_definitions(Some(definition.attribute_definitions))
            .set_key_schema(Some(definition.key_schema))
            .provisioned_throughput(definition.provisioned_throughput)
            .set_local_secondary_indexes(
                (!local_secondary_indexes.is_empty()).then_some(local_secondary_indexes),
            )
            .set_global_secondary_indexes(
                (!global_secondary_indexes.is_empty()).then_some(global_secondary_indexes),
            )
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        Ok(output.table_description)
    }

    /// Deletes the table.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_odm.delete_table", skip_all, err)
    )]
    pub async fn delete(&self) -> Result<Option<types::TableDescription>> {
        let output = self
            .client
            .delete_table()
            .table_name(&self.name)
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        Ok(output.table_description)
    }

    /// Runs the initialization once; concurrent callers await the same run.
    pub async fn ready(&self) -> Result<()> {
        self.initialized.get_or_try_init(|| self.init()).await?;
        Ok(())
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_odm.init_table", skip_all, err)
    )]
    async fn init(&self) -> Result<()> {
        if !self.options.create {
            if self.options.wait_for_active {
                self.wait_for_active(self.options.wait_for_active_timeout).await?;
            }
            return Ok(());
        }
        let definition = self.definition()?;
        let diff = self
            .describe()
            .await?
            .map(|description| definition::diff(&definition, &description));
        match plan(&self.options, diff)? {
            Plan::CreateTable => {
                #[cfg(feature = "tracing")]
                tracing::debug!(table = %self.name, "table does not exist, creating");
                self.create().await?;
                if !self.options.wait_for_active {
                    return Ok(());
                }
            }
            Plan::UpdateIndexes(diff) => self.update_indexes(&definition, diff).await?,
            Plan::Nothing => {}
        }
        self.wait_for_active(self.options.wait_for_active_timeout).await
    }

    /// Deletes stale indexes, recreates changed ones and creates missing ones, one
    /// change at a time.
    async fn update_indexes(&self, definition: &TableDefinition, diff: IndexDiff) -> Result<()> {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            table = %self.name,
            create = diff.create.len(),
            delete = diff.delete.len(),
            recreate = diff.both.len(),
            "updating indexes"
        );
        for index_name in &diff.delete {
            self.delete_index(index_name).await?;
        }
        for index in &diff.both {
            self.delete_index(&index.index_name).await?;
            self.create_index(definition, index).await?;
        }
        for index in &diff.create {
            self.create_index(definition, index).await?;
        }
        Ok(())
    }

    async fn delete_index(&self, index_name: &str) -> Result<()> {
        let update = types::GlobalSecondaryIndexUpdate::builder()
            .delete(
                types::DeleteGlobalSecondaryIndexAction::builder()
                    .index_name(index_name)
                    .build()?,
            )
            .build();
        self.client
            .update_table()
            .table_name(&self.name)
            .global_secondary_index_updates(update)
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        self.wait_for_active(self.options.wait_for_active_timeout).await
    }

    async fn create_index(
        &self,
        definition: &TableDefinition,
        index: &types::GlobalSecondaryIndex,
    ) -> Result<()> {
        let update = types::GlobalSecondaryIndexUpdate::builder()
            .create(
                types::CreateGlobalSecondaryIndexAction::builder()
                    .index_name(&index.index_name)
                    .set_key_schema(Some(index.key_schema.clone()))
                    .set_projection(index.projection.clone())
                    .set_provisioned_throughput(index.provisioned_throughput.clone())
                    .build()?,
            )
            .build();
        self.client
            .update_table()
            .table_name(&self.name)
            .set_attribute_definitions(Some(definition.attribute_definitions.clone()))
            .global_secondary_index_updates(update)
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        self.wait_for_active(self.options.wait_for_active_timeout).await
    }

    /// Polls until the table and every global index are `ACTIVE`.
    ///
    /// A missing table is polled again; the wait fails once `timeout` elapses.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_odm.wait_for_active", skip_all, err)
    )]
    pub async fn wait_for_active(&self, timeout: time::Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.poll_active())
            .await
            .map_err(|_| {
                Error::Table(format!(
                    "Wait for Active timed out after {} ms.",
                    timeout.as_millis()
                ))
            })?
    }

    async fn poll_active(&self) -> Result<()> {
        loop {
            if self.describe().await?.as_ref().is_some_and(is_active) {
                return Ok(());
            }
            #[cfg(feature = "tracing")]
            tracing::debug!(table = %self.name, "waiting for active");
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

/// Work left for initialization once the table has been described.
#[derive(Debug, PartialEq)]
enum Plan {
    CreateTable,
    UpdateIndexes(IndexDiff),
    Nothing,
}

/// Chooses the initialization work from the options and the index diff, `None` when the
/// table doesn't exist.
fn plan(options: &ModelOptions, diff: Option<IndexDiff>) -> Result<Plan> {
    let Some(diff) = diff else {
        return Ok(Plan::CreateTable);
    };
    if diff.is_empty() {
        return Ok(Plan::Nothing);
    }
    if options.update {
        return Ok(Plan::UpdateIndexes(diff));
    }
    if !diff.create.is_empty() || !diff.delete.is_empty() {
        return Err(Error::Table(
            "indexes are not synchronized and update flag is set to false".to_string(),
        ));
    }
    Ok(Plan::Nothing)
}

/// Whether the table and all of its global indexes are `ACTIVE`.
fn is_active(description: &types::TableDescription) -> bool {
    description.table_status == Some(types::TableStatus::Active)
        && description
            .global_secondary_indexes
            .as_deref()
            .unwrap_or_default()
            .iter()
            .all(|index| index.index_status == Some(types::IndexStatus::Active))
}
