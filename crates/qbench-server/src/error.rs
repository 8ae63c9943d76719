//! Error types for the qbench API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use qbench_sched::{RunId, SchedError};
use serde::Serialize;

/// API error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("All {attempted} tasks failed to dispatch")]
    DispatchFailed {
        attempted: usize,
        failures: Vec<(Option<RunId>, String)>,
    },

    #[error("Broker error: {0}")]
    BrokerError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failures: Vec<FailureEntry>,
}

#[derive(Serialize)]
struct FailureEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    run_id: Option<RunId>,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::DispatchFailed { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "dispatch_failed")
            }
            ApiError::BrokerError(_) => (StatusCode::BAD_GATEWAY, "broker_error"),
            ApiError::DatabaseError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let message = self.to_string();
        let failures = match self {
            ApiError::DispatchFailed { failures, .. } => failures
                .into_iter()
                .map(|(run_id, error)| FailureEntry { run_id, error })
                .collect(),
            _ => Vec::new(),
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            failures,
        });

        (status, body).into_response()
    }
}

impl From<SchedError> for ApiError {
    fn from(e: SchedError) -> Self {
        match e {
            SchedError::RunNotFound(_)
            | SchedError::EncodingNotFound(_)
            | SchedError::ResourceNotFound { .. } => ApiError::NotFound(e.to_string()),
            SchedError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            SchedError::AllTasksFailed {
                attempted,
                failures,
            } => ApiError::DispatchFailed {
                attempted,
                failures,
            },
            SchedError::PersistenceError(_)
            | SchedError::DatabaseError(_)
            | SchedError::JsonError(_) => ApiError::DatabaseError(e.to_string()),
            other if other.is_broker_error() => ApiError::BrokerError(other.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
