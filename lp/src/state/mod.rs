//! State management with actor pattern
//!
//! StateManager owns the TaskStore and processes messages via channels,
//! providing serialized access to task records.

mod manager;
mod messages;

pub use manager::StateManager;
pub use messages::{StateCommand, StateError, StateResponse, TaskOutcome};
