//! Per-turn orchestration: append the user turn, route, drive the engine or
//! a specialist handler, keep the active-workflow reference in sync, append
//! the assistant turn.
//!
//! This is the seam the transport calls. Engine errors that are part of the
//! conversation (handler failure, unrecognized reply) become user-visible
//! text here; only caller mistakes and persistence failures propagate as
//! errors.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use handrail_types::error::EngineError;
use handrail_types::session::{SessionRecord, Turn, TurnRole};
use handrail_types::workflow::{PendingRequest, WorkflowInstance, WorkflowStatus};

use crate::repository::checkpoint::CheckpointRepository;
use crate::repository::session::SessionRepository;
use crate::router::{MessageRouter, RouteAction};
use crate::workflow::engine::WorkflowEngine;
use crate::workflow::registry::HandlerRegistry;

/// Clarification shown when no specialist handler is registered for a key.
const FALLBACK_CLARIFICATION: &str =
    "I can help with hiring: describing a role, matching candidates, and drafting \
     outreach. What role are you looking to fill?";

// ---------------------------------------------------------------------------
// Reply shape
// ---------------------------------------------------------------------------

/// What kind of turn the assistant is sending back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// A workflow step ran; a human decision is awaited.
    WorkflowPending,
    /// The final step ran; the workflow is complete.
    WorkflowCompleted,
    /// The workflow ended without completing (cancel or handler failure).
    WorkflowAbandoned,
    /// A standalone specialist handler answered.
    Direct,
}

/// The assistant's reply for one inbound message.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub kind: ReplyKind,
    /// Rendered text for the transport to display.
    pub text: String,
    /// The pending request, present while a workflow awaits input.
    pub pending: Option<PendingRequest>,
}

impl ChatReply {
    fn direct(text: impl Into<String>) -> Self {
        Self {
            kind: ReplyKind::Direct,
            text: text.into(),
            pending: None,
        }
    }

    fn pending(text: String, pending: PendingRequest) -> Self {
        Self {
            kind: ReplyKind::WorkflowPending,
            text,
            pending: Some(pending),
        }
    }
}

/// Render a pending request as displayable text.
fn render_pending(pending: &PendingRequest) -> String {
    format!("{}\n\n{}", pending.rendered_output, pending.prompt_text)
}

// ---------------------------------------------------------------------------
// ChatService
// ---------------------------------------------------------------------------

/// Conversation service handling inbound turns end-to-end.
///
/// Generic over the checkpoint and session repositories so the same wiring
/// runs on SQLite or on the in-memory fallback.
pub struct ChatService<C: CheckpointRepository, S: SessionRepository> {
    engine: WorkflowEngine<C>,
    sessions: Arc<S>,
    router: MessageRouter,
    replies: HandlerRegistry,
    /// Serializes whole turns per session so messages apply in arrival
    /// order; distinct sessions proceed in parallel.
    turn_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<C: CheckpointRepository, S: SessionRepository> ChatService<C, S> {
    pub fn new(
        engine: WorkflowEngine<C>,
        sessions: Arc<S>,
        router: MessageRouter,
        replies: HandlerRegistry,
    ) -> Self {
        Self {
            engine,
            sessions,
            router,
            replies,
            turn_locks: DashMap::new(),
        }
    }

    fn turn_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.turn_locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Handle one inbound message for a session.
    ///
    /// Both the user turn and the assistant turn are appended to history;
    /// the session title derives from the first user message.
    pub async fn handle_message(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<ChatReply, EngineError> {
        let lock = self.turn_lock(session_id);
        let _guard = lock.lock().await;

        self.append_turn(session_id, TurnRole::User, message).await?;

        let active = self.sessions.get_active_workflow(session_id).await?;
        let action = self.router.route(active, message);
        tracing::debug!(session_id, ?action, "routed inbound message");

        let reply = match action {
            RouteAction::ResumeWorkflow => self.resume_workflow(session_id, message).await?,
            RouteAction::StartWorkflow { definition_key } => {
                self.start_workflow(session_id, &definition_key, message)
                    .await?
            }
            RouteAction::DirectReply { handler_key } => {
                self.direct_reply(&handler_key, message).await
            }
        };

        self.append_turn(session_id, TurnRole::Assistant, &reply.text)
            .await?;
        Ok(reply)
    }

    /// Abandon the session's open workflow (transport cancel path / TTL).
    pub async fn cancel_workflow(&self, session_id: &str) -> Result<ChatReply, EngineError> {
        let instance = self.engine.cancel(session_id).await?;
        self.sessions.set_active_workflow(session_id, None).await?;
        Ok(self.abandoned_reply(&instance))
    }

    /// Read-only snapshot of the session's workflow instance.
    pub async fn workflow_status(&self, session_id: &str) -> Result<WorkflowInstance, EngineError> {
        self.engine.status(session_id).await
    }

    /// Conversation history for a session.
    pub async fn history(
        &self,
        session_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Turn>, EngineError> {
        Ok(self.sessions.get_history(session_id, limit).await?)
    }

    /// Recent sessions, newest first.
    pub async fn list_sessions(
        &self,
        limit: u32,
    ) -> Result<Vec<SessionRecord>, EngineError> {
        Ok(self.sessions.list_sessions(limit).await?)
    }

    /// Startup sweep: restore active-workflow references for every
    /// checkpoint left `awaiting_input` by a previous process.
    ///
    /// Returns the sessions and their pending requests so the caller can
    /// log or re-emit them. Idempotent; no step handlers run.
    pub async fn recover_open_workflows(
        &self,
    ) -> Result<Vec<(String, PendingRequest)>, EngineError> {
        let awaiting = self.engine.list_awaiting().await?;
        let mut recovered = Vec::with_capacity(awaiting.len());

        for instance in awaiting {
            self.sessions
                .set_active_workflow(&instance.session_id, Some(instance.instance_id))
                .await?;
            if let Some(pending) = instance.pending_request {
                recovered.push((instance.session_id, pending));
            }
        }

        if !recovered.is_empty() {
            tracing::info!(count = recovered.len(), "recovered suspended workflows");
        }
        Ok(recovered)
    }

    // -----------------------------------------------------------------------
    // Route targets
    // -----------------------------------------------------------------------

    async fn start_workflow(
        &self,
        session_id: &str,
        definition_key: &str,
        message: &str,
    ) -> Result<ChatReply, EngineError> {
        match self.engine.start(session_id, definition_key, message).await {
            Ok(instance) => self.after_transition(session_id, instance).await,
            Err(EngineError::AlreadyActive) => {
                // The session reference was lost (e.g. crash between
                // checkpoint save and reference update). Re-attach and
                // re-emit the stored prompt instead of failing the turn.
                let instance = self.engine.recover(session_id).await?;
                self.sessions
                    .set_active_workflow(session_id, Some(instance.instance_id))
                    .await?;
                match instance.pending_request {
                    Some(pending) => Ok(ChatReply::pending(render_pending(&pending), pending)),
                    None => Err(EngineError::AlreadyActive),
                }
            }
            Err(EngineError::StepHandler { step_name, detail }) => {
                Ok(self.failure_reply(&step_name, &detail))
            }
            Err(err) => Err(err),
        }
    }

    async fn resume_workflow(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<ChatReply, EngineError> {
        match self.engine.resume(session_id, message).await {
            Ok(instance) => self.after_transition(session_id, instance).await,
            Err(EngineError::UnrecognizedResponse { pending }) => {
                let text = format!(
                    "I didn't catch an approval or a cancellation.\n\n{}",
                    render_pending(&pending)
                );
                Ok(ChatReply::pending(text, pending))
            }
            Err(EngineError::StepHandler { step_name, detail }) => {
                self.sessions.set_active_workflow(session_id, None).await?;
                Ok(self.failure_reply(&step_name, &detail))
            }
            Err(EngineError::NoActiveWorkflow) => {
                // Stale reference: the checkpoint is gone or terminal.
                // Clear it so the next message classifies normally.
                self.sessions.set_active_workflow(session_id, None).await?;
                Ok(ChatReply::direct(FALLBACK_CLARIFICATION))
            }
            Err(err) => Err(err),
        }
    }

    async fn direct_reply(&self, handler_key: &str, message: &str) -> ChatReply {
        let Some(handler) = self.replies.get(handler_key) else {
            tracing::warn!(handler_key, "no direct-reply handler registered");
            return ChatReply::direct(FALLBACK_CLARIFICATION);
        };

        match handler.invoke(message).await {
            Ok(text) => ChatReply::direct(text),
            Err(err) => {
                tracing::warn!(handler_key, error = %err, "direct-reply handler failed");
                ChatReply::direct(format!(
                    "That request couldn't be completed right now: {err}"
                ))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Reply shaping
    // -----------------------------------------------------------------------

    /// Sync the active-workflow reference and shape the reply after a
    /// successful engine transition.
    async fn after_transition(
        &self,
        session_id: &str,
        instance: WorkflowInstance,
    ) -> Result<ChatReply, EngineError> {
        match instance.status {
            WorkflowStatus::AwaitingInput => {
                self.sessions
                    .set_active_workflow(session_id, Some(instance.instance_id))
                    .await?;
                let pending = instance
                    .pending_request
                    .clone()
                    .ok_or(EngineError::NoActiveWorkflow)?;
                Ok(ChatReply::pending(render_pending(&pending), pending))
            }
            WorkflowStatus::Completed => {
                self.sessions.set_active_workflow(session_id, None).await?;
                let text = format!(
                    "{}\n\nAll {} steps are complete.",
                    instance.last_output().unwrap_or_default(),
                    instance.step_outputs.len()
                );
                Ok(ChatReply {
                    kind: ReplyKind::WorkflowCompleted,
                    text,
                    pending: None,
                })
            }
            WorkflowStatus::Abandoned => {
                self.sessions.set_active_workflow(session_id, None).await?;
                Ok(self.abandoned_reply(&instance))
            }
            WorkflowStatus::Running => {
                // Engine operations never return a running snapshot.
                Err(EngineError::NoActiveWorkflow)
            }
        }
    }

    fn abandoned_reply(&self, instance: &WorkflowInstance) -> ChatReply {
        ChatReply {
            kind: ReplyKind::WorkflowAbandoned,
            text: format!(
                "Workflow cancelled after {} completed step(s). Start a new request \
                 whenever you're ready.",
                instance.step_outputs.len()
            ),
            pending: None,
        }
    }

    fn failure_reply(&self, step_name: &str, detail: &str) -> ChatReply {
        ChatReply {
            kind: ReplyKind::WorkflowAbandoned,
            text: format!(
                "Step '{step_name}' failed: {detail}. The workflow was abandoned -- \
                 please start it again."
            ),
            pending: None,
        }
    }

    async fn append_turn(
        &self,
        session_id: &str,
        role: TurnRole,
        content: &str,
    ) -> Result<(), EngineError> {
        let turn = Turn::new(session_id, role, content);
        self.sessions.append_turn(&turn).await?;
        Ok(())
    }
}
