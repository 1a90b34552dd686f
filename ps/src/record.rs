//! Stored task record shape

use serde::{Deserialize, Serialize};

/// Status reported for a record whose `status` field was never written
pub const DEFAULT_STATUS: &str = "RUNNING";

/// A field of a task record that can be upserted on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Status,
    Error,
    Result,
    Job,
}

impl Field {
    /// Column name in the SQLite table
    pub(crate) fn column(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Error => "error",
            Self::Result => "result_json",
            Self::Job => "job_id",
        }
    }
}

/// Raw task record as persisted
///
/// Fields are plain strings; typing them is the caller's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub status: String,
    pub error: Option<String>,
    /// Serialized plan JSON
    pub result: Option<String>,
    /// Worker correlation handle
    pub job: Option<String>,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl TaskRecord {
    /// Empty record for `task_id`, as created by its first upsert
    pub fn new(task_id: impl Into<String>, now: i64) -> Self {
        Self {
            task_id: task_id.into(),
            status: DEFAULT_STATUS.to_string(),
            error: None,
            result: None,
            job: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply one field change in place
    pub fn apply(&mut self, field: Field, value: Option<&str>, now: i64) {
        let value = value.map(str::to_string);
        match field {
            Field::Status => self.status = value.unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            Field::Error => self.error = value,
            Field::Result => self.result = value,
            Field::Job => self.job = value,
        }
        self.updated_at = now;
    }
}
