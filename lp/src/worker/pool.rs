//! WorkerPool - bounded execution of planning jobs

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::futures::Notified;
use tokio::sync::{Mutex, Notify, Semaphore};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::domain::{Plan, PlanningRequest};
use crate::planner::Planner;

/// What the pool knows about a job
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    /// Queued or running
    Pending,
    Succeeded(Plan),
    Failed(String),
}

impl JobState {
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Runs planning jobs with at most `max_concurrent` in flight
pub struct WorkerPool {
    planner: Arc<dyn Planner>,

    /// Concurrency limiter
    semaphore: Arc<Semaphore>,

    /// Job states by job id; finished entries stay until forgotten
    jobs: Arc<Mutex<HashMap<String, JobState>>>,

    /// Signalled whenever any job finishes
    finished: Arc<Notify>,
}

impl WorkerPool {
    pub fn new(planner: Arc<dyn Planner>, max_concurrent: usize) -> Self {
        debug!(max_concurrent, "WorkerPool::new: called");
        Self {
            planner,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            jobs: Arc::new(Mutex::new(HashMap::new())),
            finished: Arc::new(Notify::new()),
        }
    }

    /// Queue a request and return its job id
    pub async fn dispatch(&self, request: PlanningRequest) -> String {
        let job_id = Uuid::now_v7().to_string();
        debug!(%job_id, "WorkerPool::dispatch: called");
        self.jobs.lock().await.insert(job_id.clone(), JobState::Pending);

        let planner = self.planner.clone();
        let semaphore = self.semaphore.clone();
        let worker = tokio::spawn(async move {
            // the semaphore is never closed
            let _permit = semaphore.acquire_owned().await.ok();
            planner.plan(request).await
        });

        // Supervises the worker so a panic still produces an outcome
        let jobs = self.jobs.clone();
        let finished = self.finished.clone();
        let id = job_id.clone();
        tokio::spawn(async move {
            let state = match worker.await {
                Ok(Ok(plan)) => {
                    info!(job_id = %id, "Planning job succeeded");
                    JobState::Succeeded(plan)
                }
                Ok(Err(e)) => {
                    error!(job_id = %id, error = %e, "Planning job failed");
                    JobState::Failed(e.to_string())
                }
                Err(e) => {
                    error!(job_id = %id, error = %e, "Planning job panicked");
                    JobState::Failed(format!("planning task panicked: {}", e))
                }
            };
            jobs.lock().await.insert(id, state);
            finished.notify_waiters();
        });

        job_id
    }

    /// Current state of a job, `None` for unknown or forgotten jobs
    pub async fn poll(&self, job_id: &str) -> Option<JobState> {
        self.jobs.lock().await.get(job_id).cloned()
    }

    /// Drop a finished job's outcome
    pub async fn forget(&self, job_id: &str) {
        debug!(%job_id, "WorkerPool::forget: called");
        let mut jobs = self.jobs.lock().await;
        if jobs.get(job_id).is_some_and(JobState::is_finished) {
            jobs.remove(job_id);
        }
    }

    /// Resolves the next time any job finishes
    ///
    /// Call `enable()` on the pinned future before checking job state so a
    /// completion between the check and the wait is not missed.
    pub fn notified(&self) -> Notified<'_> {
        self.finished.notified()
    }

    /// Jobs not yet finished
    pub async fn pending(&self) -> usize {
        self.jobs.lock().await.values().filter(|s| !s.is_finished()).count()
    }
}
