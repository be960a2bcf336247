//! Execution error types

use crate::store::StoreError;
use thiserror::Error;

/// Errors that can occur while executing a `HealthQuery`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The query selects nothing
    #[error("Query has no selections")]
    NoSelections,

    /// GROUP BY without any aggregate selection
    #[error("GROUP BY requires at least one aggregate selection")]
    GroupByRequiresAggregate,

    /// The store cannot serve health data
    #[error("Health data store is unavailable")]
    StoreUnavailable,

    /// The store failed while serving the query
    #[error("Store error: {0}")]
    Store(String),
}

impl From<StoreError> for QueryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable => QueryError::StoreUnavailable,
            other => QueryError::Store(other.to_string()),
        }
    }
}

/// Result type alias for query execution
pub type ExecutionResult<T> = Result<T, QueryError>;
