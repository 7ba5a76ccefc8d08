//! SSE streaming chat endpoint.
//!
//! POST /api/v1/chat/stream
//!
//! Delivers one inbound message to the chat service and streams the outcome
//! as Server-Sent Events. Before routing, an unanswered pending request
//! older than the configured TTL is cancelled so a stale prompt can't
//! hijack a new conversation.
//!
//! SSE event types:
//! - `session` -- initial event with `{ "session_id": "..." }`
//! - `text` -- the assistant's rendered reply: `{ "text": "..." }`
//! - `pending` -- a human decision is awaited:
//!   `{ "step_name", "rendered_output", "prompt_text" }`
//! - `done` -- stream complete: `{}`
//! - `error` -- error occurred: `{ "message": "..." }`

use std::convert::Infallible;
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::Stream;
use serde::Deserialize;
use uuid::Uuid;

use handrail_core::chat::service::ReplyKind;

use crate::http::error::AppError;
use crate::state::AppState;

/// Request body for the streaming chat endpoint.
#[derive(Debug, Deserialize)]
pub struct StreamChatRequest {
    /// Existing session ID to continue; if absent, a new session is created.
    pub session_id: Option<String>,
    /// The user message to deliver.
    pub message: String,
}

/// POST /api/v1/chat/stream -- SSE streaming chat.
pub async fn stream_chat(
    State(state): State<AppState>,
    Json(body): Json<StreamChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    if body.message.trim().is_empty() {
        return Err(AppError::Validation("message must not be empty".to_string()));
    }

    let session_id = body
        .session_id
        .clone()
        .unwrap_or_else(|| Uuid::now_v7().to_string());
    let message = body.message.clone();

    let sse_stream = async_stream::stream! {
        let session_json = serde_json::json!({ "session_id": session_id });
        yield Ok::<_, Infallible>(
            Event::default().event("session").data(session_json.to_string()),
        );

        // Expire a stale pending request so the old prompt doesn't hijack
        // this conversation; the engine treats it as a cancellation.
        if state.pending_expired(&session_id) {
            match state.chat.cancel_workflow(&session_id).await {
                Ok(reply) => {
                    state.clear_pending(&session_id);
                    let data = serde_json::json!({
                        "text": format!("The previous request timed out. {}", reply.text),
                    });
                    yield Ok(Event::default().event("text").data(data.to_string()));
                }
                Err(err) => {
                    // Nothing left to cancel; clear the marker and move on.
                    tracing::debug!(session_id = session_id.as_str(), error = %err,
                        "pending expiry found no active workflow");
                    state.clear_pending(&session_id);
                }
            }
        }

        match state.chat.handle_message(&session_id, &message).await {
            Ok(reply) => {
                let data = serde_json::json!({ "text": reply.text });
                yield Ok(Event::default().event("text").data(data.to_string()));

                match reply.kind {
                    ReplyKind::WorkflowPending => {
                        if let Some(pending) = &reply.pending {
                            let data = serde_json::to_string(pending).unwrap_or_default();
                            yield Ok(Event::default().event("pending").data(data));
                        }
                        state.mark_pending(&session_id);
                    }
                    ReplyKind::WorkflowCompleted | ReplyKind::WorkflowAbandoned => {
                        state.clear_pending(&session_id);
                    }
                    ReplyKind::Direct => {}
                }
            }
            Err(err) => {
                tracing::error!(session_id = session_id.as_str(), error = %err, "chat turn failed");
                let data = serde_json::json!({ "message": err.to_string() });
                yield Ok(Event::default().event("error").data(data.to_string()));
            }
        }

        yield Ok(Event::default().event("done").data("{}"));
    };

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
