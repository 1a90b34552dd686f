//! Task orchestration
//!
//! Wraps a planning run in a persisted task: created RUNNING, moved to DONE or
//! FAILED exactly once, observable through bounded long-poll status calls.

mod error;
mod tasks;

pub use error::OrchestratorError;
pub use tasks::{OrchestratorConfig, TaskOrchestrator};
