//! In-memory task store

use std::collections::HashMap;

use tracing::debug;

use crate::{Field, StoreError, TaskRecord, TaskStore, now_ms};

/// HashMap-backed store, lost on restart
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: HashMap<String, TaskRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskStore for MemoryStore {
    fn get(&self, task_id: &str) -> Result<Option<TaskRecord>, StoreError> {
        debug!(%task_id, "MemoryStore::get: called");
        Ok(self.records.get(task_id).cloned())
    }

    fn upsert(&mut self, task_id: &str, changes: &[(Field, Option<&str>)]) -> Result<(), StoreError> {
        debug!(%task_id, change_count = changes.len(), "MemoryStore::upsert: called");
        let now = now_ms();
        let record = self
            .records
            .entry(task_id.to_string())
            .or_insert_with(|| TaskRecord::new(task_id, now));
        for (field, value) in changes {
            record.apply(*field, *value, now);
        }
        Ok(())
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.records.len())
    }
}
