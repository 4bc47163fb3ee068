//! Write operations.
//!
//! Puts, expression-based updates, deletes and chunked batch writes. Every
//! single-item write accepts a caller condition merged with its own guard.

/// Batch put and delete of items.
pub mod batch_write_item;

/// Condition options and fields shared by write operations.
pub mod common;

/// Delete of a single item.
pub mod delete_item;

/// Put of a single item.
pub mod put_item;

/// Update expressions and the update operation.
pub mod update_item;
