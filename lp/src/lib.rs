//! lakeplan - lakehouse schema and workload optimization planner
//!
//! Takes legacy `CREATE TABLE` statements plus a recorded query workload and
//! produces an optimization plan: a target Iceberg schema, migrations that
//! populate it, and the workload rewritten against it.
//!
//! # Core Concepts
//!
//! - **Deterministic first**: a rule-based plan always exists and is the fallback
//! - **Untrusted advice**: an LLM candidate is used only when every section validates
//! - **One schema per run**: a fresh `opt_xxxxxxxx` schema name and name mapping per plan
//! - **Pollable tasks**: planning runs as a persisted task with long-poll status
//!
//! # Modules
//!
//! - [`planner`] - identifier parsing, name mapping, rewriting, plan synthesis, advisor
//! - [`orchestrator`] - task lifecycle over the [`state`] actor and the [`worker`] pool
//! - [`http`] - axum routes for the task API
//! - [`llm`] - LLM client trait with Ollama and OpenAI implementations
//! - [`warehouse`] - connection descriptors and the Trino REST client
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod http;
pub mod llm;
pub mod orchestrator;
pub mod planner;
pub mod prompts;
pub mod state;
pub mod warehouse;
pub mod worker;

// Re-export commonly used types
pub use config::{Config, LlmConfig};
pub use domain::{DdlItem, Plan, PlanningRequest, QueryOut, SqlStatement, Task, TaskStatus, WorkloadQuery};
pub use llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, create_client};
pub use orchestrator::{OrchestratorConfig, OrchestratorError, TaskOrchestrator};
pub use planner::{Analysis, Analyzer, PlanError, Planner, PlanningService};
pub use state::{StateError, StateManager};
pub use warehouse::{ConnectionDescriptor, WarehouseClient, WarehouseError};
pub use worker::{JobState, WorkerPool};
