//! One planning run, and the service that runs them

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::advisor::{Advisor, AdvisorInput};
use super::candidate::merge_with_fallback;
use super::ddl::{TableIdentifier, parse_tables};
use super::deterministic::DeterministicPlanner;
use super::mapping::{NameMapping, TargetSchema};
use crate::config::Config;
use crate::domain::{Plan, PlanningRequest, WorkloadQuery};
use crate::llm::create_client;
use crate::prompts::PromptLoader;
use crate::warehouse::{ConnectionDescriptor, TableStats, WarehouseClient, WarehouseError};

/// Errors that stop a planning run
#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Descriptor(#[from] WarehouseError),

    #[error("Planning failed: {0}")]
    Failed(String),
}

/// Something that turns a request into a plan
///
/// The worker pool only knows this trait.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, request: PlanningRequest) -> Result<Plan, PlanError>;
}

/// Weighted run frequency of a workload
pub fn workload_baseline(queries: &[WorkloadQuery]) -> u64 {
    queries.iter().fold(0u64, |acc, q| acc.saturating_add(q.run_quantity))
}

/// What a run produced
#[derive(Debug, Clone)]
pub struct Analysis {
    pub target: TargetSchema,
    pub plan: Plan,
    /// True when the advisor's candidate replaced the deterministic plan
    pub adopted: bool,
    pub baseline: u64,
}

/// State of a single planning run
///
/// The target schema name and the name mapping are fixed when the analyzer
/// is created and shared by every step of the run.
pub struct Analyzer<'r> {
    request: &'r PlanningRequest,
    tables: Vec<TableIdentifier>,
    target: TargetSchema,
    mapping: NameMapping,
}

impl<'r> Analyzer<'r> {
    pub fn new(request: &'r PlanningRequest) -> Self {
        let tables = parse_tables(&request.ddl);
        let target = TargetSchema::for_tables(&tables);
        let mapping = NameMapping::build(&tables, &target);
        debug!(
            table_count = tables.len(),
            mapping_len = mapping.len(),
            schema = %target.schema,
            "Analyzer::new: called"
        );
        Self {
            request,
            tables,
            target,
            mapping,
        }
    }

    pub fn tables(&self) -> &[TableIdentifier] {
        &self.tables
    }

    pub fn target(&self) -> &TargetSchema {
        &self.target
    }

    pub fn mapping(&self) -> &NameMapping {
        &self.mapping
    }

    pub fn fallback_plan(&self) -> Plan {
        DeterministicPlanner::new(&self.tables, &self.target, &self.mapping).plan(&self.request.queries)
    }

    /// Deterministic plan, then the advisor's candidate if it validates
    pub async fn run(&self, advisor: Option<&Advisor>, stats: &[TableStats]) -> Analysis {
        let baseline = workload_baseline(&self.request.queries);
        info!(
            schema = %self.target.schema,
            query_count = self.request.queries.len(),
            baseline,
            "Analyzer::run: workload baseline"
        );

        let fallback = self.fallback_plan();
        let candidate = match advisor {
            Some(advisor) => {
                let input = AdvisorInput {
                    target: &self.target,
                    tables: &self.tables,
                    stats,
                    queries: &self.request.queries,
                };
                advisor.suggest(&input).await
            }
            None => None,
        };

        let (plan, adopted) = match candidate {
            Some(candidate) => {
                let outcome = merge_with_fallback(&candidate, &fallback, &self.target, &self.mapping);
                let adopted = outcome.adopted();
                (outcome.plan, adopted)
            }
            None => (fallback, false),
        };
        info!(schema = %self.target.schema, adopted, "Analyzer::run: complete");

        Analysis {
            target: self.target.clone(),
            plan,
            adopted,
            baseline,
        }
    }
}

/// Planner backed by the analyzer, the optional advisor and optional sampling
pub struct PlanningService {
    advisor: Option<Advisor>,
    sampling_timeout: Option<Duration>,
}

impl PlanningService {
    pub fn new(advisor: Option<Advisor>) -> Self {
        Self {
            advisor,
            sampling_timeout: None,
        }
    }

    /// Count source rows through the warehouse before asking the advisor
    pub fn with_sampling(mut self, timeout: Duration) -> Self {
        self.sampling_timeout = Some(timeout);
        self
    }

    pub fn from_config(config: &Config, use_advisor: bool) -> eyre::Result<Self> {
        let advisor = if use_advisor {
            let llm = create_client(&config.llm)?;
            let prompts = Arc::new(PromptLoader::new(config.prompts.dir.as_deref()));
            Some(Advisor::new(llm, prompts, config.llm.max_tokens))
        } else {
            None
        };
        let service = Self::new(advisor);
        Ok(if config.warehouse.sample_row_counts {
            service.with_sampling(Duration::from_millis(config.warehouse.timeout_ms))
        } else {
            service
        })
    }

    pub async fn analyze(&self, request: &PlanningRequest) -> Result<Analysis, PlanError> {
        debug!(ddl_count = request.ddl.len(), "PlanningService::analyze: called");
        let descriptor = ConnectionDescriptor::parse(&request.url)?;
        let analyzer = Analyzer::new(request);

        let stats = match self.sampling_timeout {
            Some(timeout) => sample_tables(descriptor, timeout, analyzer.tables()).await,
            None => Vec::new(),
        };
        Ok(analyzer.run(self.advisor.as_ref(), &stats).await)
    }
}

#[async_trait]
impl Planner for PlanningService {
    async fn plan(&self, request: PlanningRequest) -> Result<Plan, PlanError> {
        self.analyze(&request).await.map(|analysis| analysis.plan)
    }
}

async fn sample_tables(descriptor: ConnectionDescriptor, timeout: Duration, tables: &[TableIdentifier]) -> Vec<TableStats> {
    let client = match WarehouseClient::new(descriptor, timeout) {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "sample_tables: warehouse client unavailable");
            return Vec::new();
        }
    };
    let mut stats = Vec::with_capacity(tables.len());
    for table in tables {
        stats.push(client.sample_stats(&table.qualified()).await);
    }
    stats
}
