//! HTTP error mapping

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::orchestrator::OrchestratorError;

/// Errors returned by handlers, rendered as `{"detail": ...}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid API token")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::NotFound(_) => ApiError::NotFound("Task not found".to_string()),
            e @ OrchestratorError::Conflict { .. } => ApiError::Conflict(e.to_string()),
            OrchestratorError::Validation(msg) => ApiError::Validation(msg),
            e @ (OrchestratorError::State(_) | OrchestratorError::Dispatch(_)) => ApiError::Internal(e.to_string()),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(ErrorBody { detail: self.to_string() })).into_response()
    }
}
