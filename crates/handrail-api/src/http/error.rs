//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use handrail_types::error::EngineError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Workflow engine errors that escape the conversation layer.
    Engine(EngineError),
    /// Validation error.
    Validation(String),
}

impl From<EngineError> for AppError {
    fn from(e: EngineError) -> Self {
        AppError::Engine(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Engine(EngineError::NotFound) => (
                StatusCode::NOT_FOUND,
                "WORKFLOW_NOT_FOUND",
                "No workflow state found for this session".to_string(),
            ),
            AppError::Engine(EngineError::NoActiveWorkflow) => (
                StatusCode::CONFLICT,
                "NO_ACTIVE_WORKFLOW",
                "No workflow is awaiting input for this session".to_string(),
            ),
            AppError::Engine(EngineError::AlreadyActive) => (
                StatusCode::CONFLICT,
                "WORKFLOW_ALREADY_ACTIVE",
                "A workflow is already active for this session".to_string(),
            ),
            AppError::Engine(EngineError::Persistence(e)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "PERSISTENCE_ERROR",
                e.to_string(),
            ),
            AppError::Engine(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "ENGINE_ERROR",
                e.to_string(),
            ),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
        };

        let body = json!({
            "data": null,
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
