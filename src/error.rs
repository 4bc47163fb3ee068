//! Error types for schema construction, encoding and DynamoDB operations.

use aws_sdk_dynamodb::error;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by the mapper.
#[derive(Debug, Error)]
pub enum Error {
    /// The declared schema is malformed.
    #[error("schema error: {0}")]
    Schema(String),

    /// A value does not satisfy a declared constraint.
    #[error("validation error: {0}")]
    Validation(String),

    /// The model was called with invalid arguments.
    #[error("model error: {0}")]
    Model(String),

    /// The fluent query chain is in an invalid state.
    #[error("query error: {0}")]
    Query(String),

    /// The fluent scan chain is in an invalid state.
    #[error("scan error: {0}")]
    Scan(String),

    /// The table could not be brought into the expected state.
    #[error("table error: {0}")]
    Table(String),

    /// A DynamoDB request could not be assembled.
    #[error(transparent)]
    Build(#[from] error::BuildError),

    /// A value could not be converted to or from its wire representation.
    #[error(transparent)]
    Serialization(#[from] serde_dynamo::Error),

    /// DynamoDB rejected the request.
    #[error(transparent)]
    Dynamo(#[from] aws_sdk_dynamodb::Error),
}

impl Error {
    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn model(message: impl Into<String>) -> Self {
        Self::Model(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case::schema(
        Error::schema("Duplicate attribute: id"),
        "schema error: Duplicate attribute: id"
    )]
    #[case::validation(
        Error::validation("Required value missing: name"),
        "validation error: Required value missing: name"
    )]
    #[case::query(
        Error::Query("Invalid query state".to_string()),
        "query error: Invalid query state"
    )]
    fn test_error_display(#[case] error: Error, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }
}
