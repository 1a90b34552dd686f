//! Warehouse error types

use thiserror::Error;

/// Errors from parsing a connection descriptor or talking to the warehouse
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("Invalid connection URL: {0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Unexpected warehouse response: {0}")]
    Protocol(String),
}
