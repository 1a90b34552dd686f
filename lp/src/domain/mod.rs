//! Domain types shared by the planner, the orchestrator and the HTTP surface

mod plan;
mod request;
mod task;

pub use plan::{Plan, QueryOut, SqlStatement};
pub use request::{DdlItem, PlanningRequest, WorkloadQuery};
pub use task::{Task, TaskStatus};
