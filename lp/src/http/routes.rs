//! Routes and handlers

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ApiError;
use crate::domain::{Plan, PlanningRequest, TaskStatus};
use crate::orchestrator::TaskOrchestrator;

/// Header carrying the shared API token
pub const TOKEN_HEADER: &str = "x-api-token";

/// State shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<TaskOrchestrator>,
    pub api_token: Arc<str>,
}

impl AppState {
    pub fn new(orchestrator: Arc<TaskOrchestrator>, api_token: impl Into<Arc<str>>) -> Self {
        Self {
            orchestrator,
            api_token: api_token.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewTaskResponse {
    pub taskid: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: TaskStatus,
}

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub task_id: String,
    #[serde(default = "default_longpoll")]
    pub longpoll: bool,
}

fn default_longpoll() -> bool {
    true
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/new", post(create_task))
        .route("/status", get(task_status))
        .route("/getresult", get(task_result))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .with_state(state)
}

async fn require_token(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, ApiError> {
    let presented = request.headers().get(TOKEN_HEADER).and_then(|v| v.to_str().ok());
    if presented != Some(&*state.api_token) {
        debug!(path = %request.uri().path(), "require_token: rejected");
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(request).await)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn create_task(
    State(state): State<AppState>,
    body: Result<Json<PlanningRequest>, JsonRejection>,
) -> Result<Json<NewTaskResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    let taskid = state.orchestrator.create(request).await?;
    Ok(Json(NewTaskResponse { taskid }))
}

async fn task_status(
    State(state): State<AppState>,
    query: Result<Query<TaskQuery>, QueryRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::Validation(e.body_text()))?;
    let status = state.orchestrator.status(&query.task_id, query.longpoll).await?;
    Ok(Json(StatusResponse { status }))
}

async fn task_result(
    State(state): State<AppState>,
    query: Result<Query<TaskQuery>, QueryRejection>,
) -> Result<Json<Plan>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::Validation(e.body_text()))?;
    Ok(Json(state.orchestrator.result(&query.task_id).await?))
}
