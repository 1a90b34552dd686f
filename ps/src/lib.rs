//! PlanStore - task record persistence for lakeplan
//!
//! One record per task id with independent string fields (`status`, `error`,
//! `result`, `job`). Writes are field-level upserts: touching one field never
//! rewrites another, and writing to an unknown id creates the record.
//!
//! Two backends implement [`TaskStore`]:
//!
//! - [`SqliteStore`] - durable, one `tasks.db` file inside the store directory
//! - [`MemoryStore`] - process-local, used by tests and `storage.backend: memory`
//!
//! Stores are synchronous and expect a single owner; lakeplan wraps one in an
//! actor task to share it between request handlers.

mod error;
mod memory;
mod record;
mod sqlite;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use record::{DEFAULT_STATUS, Field, TaskRecord};
pub use sqlite::SqliteStore;

/// Persistent map of task id to [`TaskRecord`]
pub trait TaskStore: Send {
    /// Fetch a record, `None` when no field was ever written for this id
    fn get(&self, task_id: &str) -> Result<Option<TaskRecord>, StoreError>;

    /// Upsert the given fields of one record
    ///
    /// A `None` value clears the field. Fields not listed keep their value.
    fn upsert(&mut self, task_id: &str, changes: &[(Field, Option<&str>)]) -> Result<(), StoreError>;

    /// Number of records in the store
    fn count(&self) -> Result<usize, StoreError>;

    fn put_status(&mut self, task_id: &str, status: &str) -> Result<(), StoreError> {
        self.upsert(task_id, &[(Field::Status, Some(status))])
    }

    fn put_error(&mut self, task_id: &str, error: &str) -> Result<(), StoreError> {
        self.upsert(task_id, &[(Field::Error, Some(error))])
    }

    fn put_result(&mut self, task_id: &str, result_json: &str) -> Result<(), StoreError> {
        self.upsert(task_id, &[(Field::Result, Some(result_json))])
    }

    fn put_job(&mut self, task_id: &str, job: &str) -> Result<(), StoreError> {
        self.upsert(task_id, &[(Field::Job, Some(job))])
    }
}

/// Current time in Unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
