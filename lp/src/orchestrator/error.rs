//! Orchestrator error types

use thiserror::Error;

use crate::domain::TaskStatus;
use crate::state::StateError;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Task {task_id} has no result (status {status})")]
    Conflict { task_id: String, status: TaskStatus },

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("State error: {0}")]
    State(StateError),

    #[error("Dispatch failed: {0}")]
    Dispatch(String),
}

impl From<StateError> for OrchestratorError {
    fn from(e: StateError) -> Self {
        match e {
            StateError::NotFound(id) => Self::NotFound(id),
            other => Self::State(other),
        }
    }
}
