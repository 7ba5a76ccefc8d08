//! Session and workflow inspection endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::http::error::AppError;
use crate::state::AppState;

/// Sessions returned per page by default.
const DEFAULT_SESSION_LIMIT: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Maximum turns to return (most recent first window, ascending order).
    pub limit: Option<u32>,
}

/// GET /api/v1/sessions -- recent sessions, newest first.
pub async fn list_sessions(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let sessions = state.chat.list_sessions(DEFAULT_SESSION_LIMIT).await?;
    Ok(Json(json!({ "sessions": sessions })))
}

/// GET /api/v1/sessions/{id}/history -- conversation turns.
pub async fn get_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, AppError> {
    let limit = query.limit.or(Some(state.config.history_limit));
    let turns = state.chat.history(&session_id, limit).await?;
    Ok(Json(json!({ "turns": turns })))
}

/// GET /api/v1/sessions/{id}/workflow -- read-only instance snapshot.
pub async fn get_workflow(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let instance = state.chat.workflow_status(&session_id).await?;
    Ok(Json(json!({ "workflow": instance })))
}

/// POST /api/v1/sessions/{id}/workflow/cancel -- abandon the open workflow.
pub async fn cancel_workflow(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let reply = state.chat.cancel_workflow(&session_id).await?;
    state.clear_pending(&session_id);
    Ok(Json(json!({ "cancelled": true, "message": reply.text })))
}
