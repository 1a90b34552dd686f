//! Planning engine
//!
//! Leaf first: [`ddl`] parses source tables, [`mapping`] names the target
//! schema and maps every source spelling onto it, [`rewriter`] retargets
//! workload queries, [`deterministic`] composes a complete plan, and
//! [`advisor`] plus [`candidate`] try to improve on it with an LLM. The
//! [`analyzer`] ties one run together.

pub mod advisor;
pub mod analyzer;
pub mod candidate;
pub mod ddl;
pub mod deterministic;
pub mod mapping;
pub mod properties;
pub mod rewriter;

pub use advisor::{Advisor, AdvisorInput};
pub use analyzer::{Analysis, Analyzer, PlanError, Planner, PlanningService, workload_baseline};
pub use candidate::{CandidatePlan, CandidateQuery, MergeOutcome, merge_with_fallback};
pub use ddl::{TableIdentifier, parse_tables};
pub use deterministic::DeterministicPlanner;
pub use mapping::{NameMapping, TargetSchema};
pub use rewriter::rewrite;
