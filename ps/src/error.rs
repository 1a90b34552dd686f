//! Store error types

use thiserror::Error;

/// Errors raised by a task store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt record {task_id}: {message}")]
    Corrupt { task_id: String, message: String },
}
