//! StateManager - actor that owns the TaskStore
//!
//! Processes commands via channels so every write to a task record is
//! serialized, which is what makes terminal transitions happen exactly once.

use planstore::{Field, MemoryStore, SqliteStore, TaskRecord, TaskStore};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::{StorageBackend, StorageConfig};
use crate::domain::{Plan, Task, TaskStatus};

use super::messages::{StateCommand, StateError, StateResponse, TaskOutcome};

/// Handle to send commands to the StateManager
#[derive(Clone)]
pub struct StateManager {
    tx: mpsc::Sender<StateCommand>,
}

impl StateManager {
    /// Spawn the actor around an opened store
    pub fn spawn(store: Box<dyn TaskStore>) -> Self {
        debug!("spawn: called");
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(actor_loop(store, rx));
        info!("StateManager spawned");
        Self { tx }
    }

    /// Open the configured backend and spawn the actor
    pub fn open(config: &StorageConfig) -> eyre::Result<Self> {
        let store: Box<dyn TaskStore> = match config.backend {
            StorageBackend::Sqlite => {
                let dir = config.store_dir();
                debug!(dir = %dir.display(), "open: sqlite backend");
                Box::new(SqliteStore::open(&dir)?)
            }
            StorageBackend::Memory => {
                debug!("open: memory backend");
                Box::new(MemoryStore::new())
            }
        };
        Ok(Self::spawn(store))
    }

    /// Persist a new RUNNING task
    pub async fn create_task(&self, id: &str) -> StateResponse<()> {
        debug!(%id, "create_task: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StateCommand::CreateTask {
                id: id.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    /// Get a task by ID
    pub async fn get_task(&self, id: &str) -> StateResponse<Option<Task>> {
        debug!(%id, "get_task: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StateCommand::GetTask {
                id: id.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    /// Get a task, NotFound if missing
    pub async fn get_task_required(&self, id: &str) -> Result<Task, StateError> {
        self.get_task(id)
            .await?
            .ok_or_else(|| StateError::NotFound(id.to_string()))
    }

    /// Record the worker job handling a task
    pub async fn set_job(&self, id: &str, job: &str) -> StateResponse<()> {
        debug!(%id, %job, "set_job: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StateCommand::SetJob {
                id: id.to_string(),
                job: job.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    /// Move a RUNNING task to DONE or FAILED
    ///
    /// Returns `false` when the task was already terminal; the stored outcome
    /// is left untouched in that case.
    pub async fn finish_task(&self, id: &str, outcome: TaskOutcome) -> StateResponse<bool> {
        debug!(%id, ?outcome, "finish_task: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StateCommand::FinishTask {
                id: id.to_string(),
                outcome,
                reply: reply_tx,
            })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    pub async fn complete_task(&self, id: &str, plan: &Plan) -> StateResponse<bool> {
        let json = plan
            .to_json()
            .map_err(|e| StateError::StoreError(format!("failed to serialize plan: {}", e)))?;
        self.finish_task(id, TaskOutcome::Done(json)).await
    }

    pub async fn fail_task(&self, id: &str, error: impl Into<String>) -> StateResponse<bool> {
        self.finish_task(id, TaskOutcome::Failed(error.into())).await
    }

    /// Number of task records
    pub async fn count(&self) -> StateResponse<usize> {
        debug!("count: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StateCommand::Count { reply: reply_tx })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    /// Shutdown the StateManager
    pub async fn shutdown(&self) -> Result<(), StateError> {
        debug!("shutdown: called");
        self.tx
            .send(StateCommand::Shutdown)
            .await
            .map_err(|_| StateError::ChannelError)
    }
}

/// Typed view of a stored record
fn to_task(record: TaskRecord) -> StateResponse<Task> {
    let status: TaskStatus = record.status.parse().map_err(StateError::DeserializationError)?;
    let result = record
        .result
        .as_deref()
        .map(Plan::from_json)
        .transpose()
        .map_err(|e| StateError::DeserializationError(format!("task {}: {}", record.task_id, e)))?;
    Ok(Task {
        id: record.task_id,
        status,
        error: record.error,
        result,
        job: record.job,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

fn store_err(e: planstore::StoreError) -> StateError {
    StateError::StoreError(e.to_string())
}

fn finish(store: &mut dyn TaskStore, id: &str, outcome: &TaskOutcome) -> StateResponse<bool> {
    let record = store
        .get(id)
        .map_err(store_err)?
        .ok_or_else(|| StateError::NotFound(id.to_string()))?;
    let current: TaskStatus = record.status.parse().map_err(StateError::DeserializationError)?;
    if current.is_terminal() {
        debug!(%id, %current, "finish: already terminal, ignoring");
        return Ok(false);
    }

    match outcome {
        TaskOutcome::Done(json) => {
            let changes = [
                (Field::Result, Some(json.as_str())),
                (Field::Error, None),
                (Field::Status, Some(TaskStatus::Done.as_str())),
            ];
            store.upsert(id, &changes).map_err(store_err)?;
        }
        TaskOutcome::Failed(message) => {
            // status last: a FAILED record always carries its error
            store.put_error(id, message).map_err(store_err)?;
            store.put_status(id, TaskStatus::Failed.as_str()).map_err(store_err)?;
        }
    }
    Ok(true)
}

/// The actor loop that owns the store and processes commands
async fn actor_loop(mut store: Box<dyn TaskStore>, mut rx: mpsc::Receiver<StateCommand>) {
    debug!("StateManager actor started");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            StateCommand::CreateTask { id, reply } => {
                debug!(%id, "actor_loop: CreateTask command");
                let result = store.put_status(&id, TaskStatus::Running.as_str()).map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::GetTask { id, reply } => {
                debug!(%id, "actor_loop: GetTask command");
                let result = store
                    .get(&id)
                    .map_err(store_err)
                    .and_then(|record| record.map(to_task).transpose());
                let _ = reply.send(result);
            }

            StateCommand::SetJob { id, job, reply } => {
                debug!(%id, %job, "actor_loop: SetJob command");
                let result = store.put_job(&id, &job).map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::FinishTask { id, outcome, reply } => {
                debug!(%id, "actor_loop: FinishTask command");
                let result = finish(store.as_mut(), &id, &outcome);
                if let Err(ref e) = result {
                    warn!(%id, error = %e, "actor_loop: FinishTask failed");
                }
                let _ = reply.send(result);
            }

            StateCommand::Count { reply } => {
                debug!("actor_loop: Count command");
                let _ = reply.send(store.count().map_err(store_err));
            }

            StateCommand::Shutdown => {
                debug!("actor_loop: Shutdown command");
                info!("StateManager shutting down");
                break;
            }
        }
    }

    debug!("StateManager actor stopped");
}
