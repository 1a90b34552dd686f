//! Service wiring and the listen loop

use std::sync::Arc;

use eyre::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::{AppState, router};
use crate::config::Config;
use crate::orchestrator::{OrchestratorConfig, TaskOrchestrator};
use crate::planner::PlanningService;
use crate::state::StateManager;
use crate::worker::WorkerPool;

/// Build the service from `config` and serve until Ctrl-C
pub async fn serve(config: Arc<Config>, bind: Option<String>) -> Result<()> {
    config.validate()?;
    let api_token = config.server.resolve_api_token()?;

    let state = StateManager::open(&config.storage).context("Failed to open task store")?;
    let stored = state.count().await.context("Failed to read task store")?;
    info!(backend = ?config.storage.backend, stored, "Task store ready");
    let planner = PlanningService::from_config(&config, true).context("Failed to set up planner")?;
    let pool = WorkerPool::new(Arc::new(planner), config.worker.max_concurrent);
    let orchestrator = TaskOrchestrator::new(state.clone(), pool, OrchestratorConfig::from_server(&config.server));
    let app = router(AppState::new(Arc::new(orchestrator), api_token));

    let addr = bind.unwrap_or_else(|| config.server.bind.clone());
    let listener = TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind {}", addr))?;
    info!(%addr, provider = %config.llm.provider, "lakeplan listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("lakeplan shutting down");
    if let Err(e) = state.shutdown().await {
        warn!(error = %e, "Failed to stop state manager");
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
