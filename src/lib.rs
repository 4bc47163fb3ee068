#![deny(missing_docs)]

//! # DynamoDB ODM
//!
//! A schema-driven object-document mapper for Amazon DynamoDB.
//!
//! ## Overview
//!
//! Documents are declared once as a [`schema::Schema`] and every operation goes through it:
//! - Documents are encoded to wire items with defaults, setters, validators and required
//!   checks applied
//! - Items read back are decoded into ordered documents of native values
//! - Fluent query and scan builders render key conditions and filters, resolving secondary indexes
//! - Partial updates render `SET`/`ADD`/`DELETE`/`REMOVE` expressions with generated placeholders
//! - The table, with its secondary indexes, is derived from the schema and created on first use
//!
//! ## Quick Example
//!
//! ```no_run
//! use aws_sdk_dynamodb::Client;
//! use dynamodb_odm::registry::{PartialModelOptions, Registry};
//! use dynamodb_odm::schema::{Schema, SchemaOptions};
//! use dynamodb_odm::write::update_item::{UpdateOptions, UpdateRequest};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example(client: Client) -> dynamodb_odm::error::Result<()> {
//! let schema = Schema::from_json(
//!     json!({
//!         "ownerId": {"type": "number", "hashKey": true},
//!         "name": {"type": "string", "rangeKey": true},
//!         "breed": {"type": "string", "index": {"global": true}},
//!         "visits": {"type": "number", "default": 0},
//!     }),
//!     SchemaOptions::default(),
//! )?;
//! let registry = Registry::new(client);
//! let dogs = registry.model("dogs", Arc::new(schema), PartialModelOptions::default());
//!
//! dogs.create(dogs.new_document(json!({"ownerId": 4, "name": "Odie", "breed": "Beagle"}))?)
//!     .await?;
//! // Renders "ADD #_n0 :_p0"
//! dogs.update(
//!     Some((4, "Odie").into()),
//!     UpdateRequest::default().add("visits", 1),
//!     UpdateOptions::default(),
//! )
//! .await?;
//! // Resolves the breedGlobalIndex index
//! let beagles = dogs.query("breed").eq("Beagle").exec().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`mod@schema`] - Attribute declarations and the document codec
//! - [`mod@read`] - Read operations (GetItem, Query, Scan, BatchGetItem)
//! - [`mod@write`] - Write operations (PutItem, UpdateItem, DeleteItem, BatchWriteItem)
//! - [`mod@table`] - Table definition, creation and index reconciliation
//! - [`mod@model`] and [`mod@registry`] - Models bound to tables and their catalog

/// Primary keys and expression merging.
pub mod common;

/// Error and result types.
pub mod error;

/// Schema-bound document operations.
pub mod model;

/// Read operations for retrieving documents.
///
/// This module provides operations for:
/// - Getting individual items by key
/// - Querying items with key conditions
/// - Scanning entire tables
/// - Batch retrieving multiple items
pub mod read;

/// Model catalog.
pub mod registry;

/// Declared attribute shapes and the wire codec.
pub mod schema;

/// Table lifecycle.
pub mod table;

/// Native document values.
pub mod value;

/// Write operations for modifying documents.
///
/// This module provides operations for:
/// - Putting new items or replacing existing ones
/// - Updating items with set, add, delete and remove clauses
/// - Deleting items by key
/// - Batch writing multiple items
pub mod write;
