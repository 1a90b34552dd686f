//! State manager messages
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::Task;

/// Errors from state operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Channel error")]
    ChannelError,
}

/// Response from state operations
pub type StateResponse<T> = Result<T, StateError>;

/// Terminal outcome of a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Serialized plan JSON
    Done(String),
    /// Failure message
    Failed(String),
}

/// Commands sent to the StateManager actor
#[derive(Debug)]
pub enum StateCommand {
    CreateTask {
        id: String,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    GetTask {
        id: String,
        reply: oneshot::Sender<StateResponse<Option<Task>>>,
    },
    SetJob {
        id: String,
        job: String,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    /// Replies `true` when this command made the transition
    FinishTask {
        id: String,
        outcome: TaskOutcome,
        reply: oneshot::Sender<StateResponse<bool>>,
    },
    Count {
        reply: oneshot::Sender<StateResponse<usize>>,
    },

    // Shutdown
    Shutdown,
}
