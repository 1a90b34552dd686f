//! SQLite-backed task store

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use crate::{DEFAULT_STATUS, Field, StoreError, TaskRecord, TaskStore, now_ms};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tasks (
    task_id     TEXT PRIMARY KEY,
    status      TEXT NOT NULL DEFAULT 'RUNNING',
    error       TEXT,
    result_json TEXT,
    job_id      TEXT,
    created_at  INTEGER NOT NULL,
    updated_at  INTEGER NOT NULL
);
";

/// Task store persisted in `<dir>/tasks.db`
pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open or create the store inside `dir`
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        debug!(dir = %dir.display(), "SqliteStore::open: called");
        fs::create_dir_all(dir)?;
        let path = dir.join("tasks.db");
        let conn = Connection::open(&path)?;
        conn.execute_batch(SCHEMA)?;
        info!(path = %path.display(), "Opened task store");
        Ok(Self { conn, path: Some(path) })
    }

    /// Open a throwaway store that lives only in memory
    pub fn open_in_memory() -> Result<Self, StoreError> {
        debug!("SqliteStore::open_in_memory: called");
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn, path: None })
    }

    /// Path of the database file, if file-backed
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl TaskStore for SqliteStore {
    fn get(&self, task_id: &str) -> Result<Option<TaskRecord>, StoreError> {
        debug!(%task_id, "SqliteStore::get: called");
        let record = self
            .conn
            .query_row(
                "SELECT task_id, status, error, result_json, job_id, created_at, updated_at
                 FROM tasks WHERE task_id = ?1",
                params![task_id],
                |row| {
                    Ok(TaskRecord {
                        task_id: row.get(0)?,
                        status: row.get(1)?,
                        error: row.get(2)?,
                        result: row.get(3)?,
                        job: row.get(4)?,
                        created_at: row.get(5)?,
                        updated_at: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    fn upsert(&mut self, task_id: &str, changes: &[(Field, Option<&str>)]) -> Result<(), StoreError> {
        debug!(%task_id, change_count = changes.len(), "SqliteStore::upsert: called");
        let now = now_ms();
        let tx = self.conn.transaction()?;
        for (field, value) in changes {
            let column = field.column();
            let value = match field {
                Field::Status => Some(value.unwrap_or(DEFAULT_STATUS)),
                _ => *value,
            };
            let sql = format!(
                "INSERT INTO tasks (task_id, {column}, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT(task_id) DO UPDATE SET {column} = excluded.{column}, updated_at = excluded.updated_at"
            );
            tx.execute(&sql, params![task_id, value, now])?;
        }
        tx.commit()?;
        Ok(())
    }

    fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_db_file() {
        let temp = tempdir().unwrap();
        let store = SqliteStore::open(temp.path().join("nested")).unwrap();
        assert!(store.path().unwrap().exists());
    }

    #[test]
    fn test_upsert_and_get() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.upsert("t1", &[(Field::Status, Some("RUNNING"))]).unwrap();

        let rec = store.get("t1").unwrap().unwrap();
        assert_eq!(rec.task_id, "t1");
        assert_eq!(rec.status, "RUNNING");
        assert!(rec.result.is_none());
    }

    #[test]
    fn test_field_upserts_are_independent() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.upsert("t1", &[(Field::Status, Some("RUNNING"))]).unwrap();
        store.upsert("t1", &[(Field::Job, Some("job-7"))]).unwrap();
        store
            .upsert("t1", &[(Field::Status, Some("DONE")), (Field::Result, Some(r#"{"ddl":[]}"#))])
            .unwrap();

        let rec = store.get("t1").unwrap().unwrap();
        assert_eq!(rec.status, "DONE");
        assert_eq!(rec.job.as_deref(), Some("job-7"));
        assert_eq!(rec.result.as_deref(), Some(r#"{"ddl":[]}"#));
        assert!(rec.error.is_none());
    }

    #[test]
    fn test_field_upsert_on_unknown_id_uses_default_status() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.upsert("t9", &[(Field::Error, Some("boom"))]).unwrap();

        let rec = store.get("t9").unwrap().unwrap();
        assert_eq!(rec.status, DEFAULT_STATUS);
        assert_eq!(rec.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_records_survive_reopen() {
        let temp = tempdir().unwrap();
        {
            let mut store = SqliteStore::open(temp.path()).unwrap();
            store.upsert("t1", &[(Field::Status, Some("FAILED")), (Field::Error, Some("x"))]).unwrap();
        }
        let store = SqliteStore::open(temp.path()).unwrap();
        let rec = store.get("t1").unwrap().unwrap();
        assert_eq!(rec.status, "FAILED");
        assert_eq!(rec.error.as_deref(), Some("x"));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_get_missing_is_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.get("missing").unwrap().is_none());
        assert_eq!(store.count().unwrap(), 0);
    }
}
