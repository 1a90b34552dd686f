//! Planning worker pool
//!
//! Runs planning requests on tokio tasks, bounded by a semaphore, and keeps
//! each job's outcome until the orchestrator has persisted it.

mod pool;

pub use pool::{JobState, WorkerPool};
