//! TaskOrchestrator - create, observe and read planning tasks

use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::OrchestratorError;
use crate::config::ServerConfig;
use crate::domain::{Plan, PlanningRequest, TaskStatus};
use crate::state::StateManager;
use crate::warehouse::ConnectionDescriptor;
use crate::worker::{JobState, WorkerPool};

pub const LOST_JOB_ERROR: &str = "worker job lost";

/// Long-poll timing
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Upper bound for one long-poll status call
    pub max_wait: Duration,
    /// Interval between worker checks while waiting
    pub poll_interval: Duration,
}

impl OrchestratorConfig {
    pub fn from_server(config: &ServerConfig) -> Self {
        Self {
            max_wait: config.max_longpoll(),
            poll_interval: config.poll_interval(),
        }
    }
}

pub struct TaskOrchestrator {
    state: StateManager,
    pool: WorkerPool,
    config: OrchestratorConfig,
}

impl TaskOrchestrator {
    pub fn new(state: StateManager, pool: WorkerPool, config: OrchestratorConfig) -> Self {
        debug!(?config, "TaskOrchestrator::new: called");
        Self { state, pool, config }
    }

    /// Validate the request, persist a RUNNING task and hand it to the pool
    pub async fn create(&self, request: PlanningRequest) -> Result<String, OrchestratorError> {
        debug!(ddl_count = request.ddl.len(), query_count = request.queries.len(), "create: called");
        ConnectionDescriptor::parse(&request.url).map_err(|e| OrchestratorError::Validation(e.to_string()))?;

        let task_id = Uuid::new_v4().to_string();
        self.state.create_task(&task_id).await?;

        let job = self.pool.dispatch(request).await;
        if let Err(e) = self.state.set_job(&task_id, &job).await {
            warn!(%task_id, %job, error = %e, "create: failed to record job");
            let _ = self.state.fail_task(&task_id, format!("failed to record job: {}", e)).await;
            return Err(OrchestratorError::Dispatch(e.to_string()));
        }

        info!(%task_id, %job, "Task created");
        Ok(task_id)
    }

    /// Current status, waiting up to the configured budget when `longpoll` is set
    pub async fn status(&self, task_id: &str, longpoll: bool) -> Result<TaskStatus, OrchestratorError> {
        debug!(%task_id, longpoll, "status: called");
        if !longpoll {
            return self.observe(task_id).await;
        }
        match timeout(self.config.max_wait, self.wait_terminal(task_id)).await {
            Ok(result) => result,
            Err(_) => {
                debug!(%task_id, "status: long-poll budget expired");
                Ok(self.state.get_task_required(task_id).await?.status)
            }
        }
    }

    /// The persisted plan of a DONE task
    pub async fn result(&self, task_id: &str) -> Result<Plan, OrchestratorError> {
        debug!(%task_id, "result: called");
        let task = self.state.get_task_required(task_id).await?;
        match (task.status, task.result) {
            (TaskStatus::Done, Some(plan)) => Ok(plan),
            (status, _) => Err(OrchestratorError::Conflict {
                task_id: task_id.to_string(),
                status,
            }),
        }
    }

    async fn wait_terminal(&self, task_id: &str) -> Result<TaskStatus, OrchestratorError> {
        loop {
            let finished = self.pool.notified();
            tokio::pin!(finished);
            finished.as_mut().enable();

            let status = self.observe(task_id).await?;
            if status.is_terminal() {
                return Ok(status);
            }

            tokio::select! {
                _ = &mut finished => debug!(%task_id, "wait_terminal: woken by job completion"),
                _ = sleep(self.config.poll_interval) => {}
            }
        }
    }

    /// One completion check; persists the worker outcome if there is one
    async fn observe(&self, task_id: &str) -> Result<TaskStatus, OrchestratorError> {
        let task = self.state.get_task_required(task_id).await?;
        if task.status.is_terminal() {
            // an earlier observer may have been cancelled between persisting and forgetting
            if let Some(job) = &task.job {
                self.pool.forget(job).await;
            }
            return Ok(task.status);
        }
        let Some(job) = task.job else {
            // created, job id not recorded yet
            return Ok(task.status);
        };

        match self.pool.poll(&job).await {
            Some(JobState::Pending) => Ok(TaskStatus::Running),
            Some(JobState::Succeeded(plan)) => {
                if self.state.complete_task(task_id, &plan).await? {
                    info!(%task_id, "Task done");
                }
                self.pool.forget(&job).await;
                self.current(task_id).await
            }
            Some(JobState::Failed(message)) => {
                if self.state.fail_task(task_id, &message).await? {
                    warn!(%task_id, error = %message, "Task failed");
                }
                self.pool.forget(&job).await;
                self.current(task_id).await
            }
            None => {
                // forgotten after a concurrent observer persisted it, or lost
                let status = self.current(task_id).await?;
                if status.is_terminal() {
                    return Ok(status);
                }
                warn!(%task_id, %job, "observe: job unknown to the worker pool");
                self.state.fail_task(task_id, LOST_JOB_ERROR).await?;
                self.current(task_id).await
            }
        }
    }

    async fn current(&self, task_id: &str) -> Result<TaskStatus, OrchestratorError> {
        Ok(self.state.get_task_required(task_id).await?.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SqlStatement;
    use crate::planner::{PlanError, Planner};
    use async_trait::async_trait;
    use planstore::MemoryStore;
    use std::sync::Arc;
    use tokio::sync::Semaphore;

    const URL: &str = "jdbc://h:8080/c/s?user=u";

    /// Blocks every plan until the test releases a permit
    struct GatedPlanner {
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl Planner for GatedPlanner {
        async fn plan(&self, request: PlanningRequest) -> Result<Plan, PlanError> {
            let _permit = self.gate.acquire().await.map_err(|e| PlanError::Failed(e.to_string()))?;
            if request.queries.is_empty() {
                return Err(PlanError::Failed("empty workload".to_string()));
            }
            Ok(Plan {
                ddl: vec![SqlStatement::new("CREATE SCHEMA c.opt_1")],
                ..Plan::default()
            })
        }
    }

    fn orchestrator(max_wait: Duration) -> (TaskOrchestrator, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let pool = WorkerPool::new(Arc::new(GatedPlanner { gate: gate.clone() }), 4);
        let state = StateManager::spawn(Box::new(MemoryStore::new()));
        let config = OrchestratorConfig {
            max_wait,
            poll_interval: Duration::from_millis(20),
        };
        (TaskOrchestrator::new(state, pool, config), gate)
    }

    fn request(with_queries: bool) -> PlanningRequest {
        let queries = if with_queries {
            vec![crate::domain::WorkloadQuery::new("q1", "SELECT 1", 1)]
        } else {
            Vec::new()
        };
        PlanningRequest {
            url: URL.to_string(),
            ddl: Vec::new(),
            queries,
        }
    }

    #[tokio::test]
    async fn test_create_rejects_bad_descriptor() {
        let (orch, _gate) = orchestrator(Duration::from_millis(100));
        let mut bad = request(true);
        bad.url = "jdbc://h:8080/c".to_string();
        assert!(matches!(orch.create(bad).await, Err(OrchestratorError::Validation(_))));
    }

    #[tokio::test]
    async fn test_running_then_done() {
        let (orch, gate) = orchestrator(Duration::from_millis(100));
        let id = orch.create(request(true)).await.unwrap();

        assert_eq!(orch.status(&id, false).await.unwrap(), TaskStatus::Running);
        assert!(matches!(
            orch.result(&id).await,
            Err(OrchestratorError::Conflict {
                status: TaskStatus::Running,
                ..
            })
        ));
        // budget expires while the gate is closed
        assert_eq!(orch.status(&id, true).await.unwrap(), TaskStatus::Running);

        gate.add_permits(1);
        let mut status = orch.status(&id, true).await.unwrap();
        for _ in 0..20 {
            if status.is_terminal() {
                break;
            }
            status = orch.status(&id, true).await.unwrap();
        }
        assert_eq!(status, TaskStatus::Done);
        let plan = orch.result(&id).await.unwrap();
        assert_eq!(plan.ddl[0].statement, "CREATE SCHEMA c.opt_1");
    }

    #[tokio::test]
    async fn test_failed_task() {
        let (orch, gate) = orchestrator(Duration::from_secs(5));
        gate.add_permits(1);
        let id = orch.create(request(false)).await.unwrap();

        assert_eq!(orch.status(&id, true).await.unwrap(), TaskStatus::Failed);
        assert!(matches!(
            orch.result(&id).await,
            Err(OrchestratorError::Conflict {
                status: TaskStatus::Failed,
                ..
            })
        ));
        let task = orch.state.get_task_required(&id).await.unwrap();
        assert!(task.error.unwrap().contains("empty workload"));
    }

    #[tokio::test]
    async fn test_unknown_task() {
        let (orch, _gate) = orchestrator(Duration::from_millis(50));
        assert!(matches!(orch.status("nope", true).await, Err(OrchestratorError::NotFound(_))));
        assert!(matches!(orch.result("nope").await, Err(OrchestratorError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_lost_job_fails_task() {
        let (orch, _gate) = orchestrator(Duration::from_millis(50));
        orch.state.create_task("orphan").await.unwrap();
        orch.state.set_job("orphan", "job-from-previous-process").await.unwrap();

        assert_eq!(orch.status("orphan", false).await.unwrap(), TaskStatus::Failed);
        let task = orch.state.get_task_required("orphan").await.unwrap();
        assert_eq!(task.error.as_deref(), Some(LOST_JOB_ERROR));
    }

    #[tokio::test]
    async fn test_terminal_task_releases_finished_job() {
        let (orch, gate) = orchestrator(Duration::from_millis(50));
        let id = orch.create(request(true)).await.unwrap();
        let job = orch.state.get_task_required(&id).await.unwrap().job.unwrap();

        gate.add_permits(1);
        let plan = timeout(Duration::from_secs(5), async {
            loop {
                if let Some(JobState::Succeeded(plan)) = orch.pool.poll(&job).await {
                    break plan;
                }
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        // outcome persisted by an observer that never got to release the job
        assert!(orch.state.complete_task(&id, &plan).await.unwrap());
        assert!(orch.pool.poll(&job).await.is_some());

        assert_eq!(orch.status(&id, false).await.unwrap(), TaskStatus::Done);
        assert!(orch.pool.poll(&job).await.is_none());
        assert_eq!(orch.result(&id).await.unwrap(), plan);
    }

    #[tokio::test]
    async fn test_concurrent_status_calls_agree() {
        let (orch, gate) = orchestrator(Duration::from_secs(5));
        let orch = Arc::new(orch);
        let id = orch.create(request(true)).await.unwrap();

        let mut waiters = Vec::new();
        for _ in 0..8 {
            let orch = orch.clone();
            let id = id.clone();
            waiters.push(tokio::spawn(async move { orch.status(&id, true).await.unwrap() }));
        }
        tokio::time::sleep(Duration::from_millis(30)).await;
        gate.add_permits(1);

        for waiter in waiters {
            assert_eq!(waiter.await.unwrap(), TaskStatus::Done);
        }
        assert_eq!(orch.status(&id, false).await.unwrap(), TaskStatus::Done);
        assert!(orch.result(&id).await.is_ok());
    }
}
