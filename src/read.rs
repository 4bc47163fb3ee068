//! Read operations.
//!
//! Single and batch gets by primary key, and the fluent query and scan builders
//! sent through the legacy `KeyConditions`/`QueryFilter`/`ScanFilter` parameters.

/// Batch get of items by primary key.
pub mod batch_get_item;

/// Comparisons, condition chain state and read results shared by query and scan.
pub mod common;

/// Get of a single item by primary key.
pub mod get_item;

/// Query builder.
pub mod query;

/// Scan builder.
pub mod scan;
