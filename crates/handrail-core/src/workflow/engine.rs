//! The human-in-the-loop workflow state machine.
//!
//! An instance advances `running -> awaiting_input -> running -> ... ->
//! completed`, with `abandoned` reachable on cancellation or handler
//! failure. There is no language-level suspension: "pause" means the
//! operation checkpoints and returns, and a later independent `resume` call
//! picks up from the snapshot.
//!
//! # Execution flow
//!
//! 1. `start` runs step 0 on the initial payload, checkpoints, suspends.
//! 2. Each `resume` interprets the human reply: approval advances one step
//!    (optionally amending the payload per the edit), cancellation abandons.
//! 3. The checkpoint is flushed before `awaiting_input` is reported, so a
//!    crash between "step executed" and "response sent" recovers via
//!    `recover` without re-running the step.
//!
//! Operations on one session are serialized through a per-session mutex;
//! different sessions proceed fully in parallel.

use std::sync::Arc;

use dashmap::DashMap;
use handrail_types::error::EngineError;
use handrail_types::workflow::{PendingRequest, WorkflowInstance, WorkflowStatus};
use tokio::sync::Mutex;

use crate::repository::checkpoint::CheckpointRepository;

use super::checkpoint::CheckpointManager;
use super::registry::{DefinitionRegistry, WorkflowDefinition};
use super::respond::{ResumeDirective, interpret};

/// The workflow engine: `start`/`resume`/`recover`/`status` entry points.
///
/// Generic over `R: CheckpointRepository` for storage flexibility. The
/// definition registry is shared read-only; all mutable state lives in the
/// checkpoint store.
pub struct WorkflowEngine<R: CheckpointRepository> {
    definitions: Arc<DefinitionRegistry>,
    checkpoints: CheckpointManager<R>,
    /// Per-session mutual exclusion. A second operation for the same
    /// session waits here instead of racing.
    session_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<R: CheckpointRepository> WorkflowEngine<R> {
    /// Create an engine over the given definitions and checkpoint backend.
    pub fn new(definitions: Arc<DefinitionRegistry>, repo: R) -> Self {
        Self {
            definitions,
            checkpoints: CheckpointManager::new(repo),
            session_locks: DashMap::new(),
        }
    }

    fn lock_for(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.session_locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn definition(&self, key: &str) -> Result<Arc<WorkflowDefinition>, EngineError> {
        self.definitions
            .get(key)
            .ok_or_else(|| EngineError::UnknownDefinition(key.to_string()))
    }

    // -----------------------------------------------------------------------
    // Entry points
    // -----------------------------------------------------------------------

    /// Start a new instance for a session.
    ///
    /// Runs step 0 on `initial_payload`, checkpoints, and suspends awaiting
    /// confirmation. Fails with `AlreadyActive` if an instance for this
    /// session is running or awaiting input.
    pub async fn start(
        &self,
        session_id: &str,
        definition_key: &str,
        initial_payload: &str,
    ) -> Result<WorkflowInstance, EngineError> {
        let lock = self.lock_for(session_id);
        let _guard = lock.lock().await;

        if let Some(existing) = self.checkpoints.load(session_id).await? {
            if existing.is_active() {
                return Err(EngineError::AlreadyActive);
            }
        }

        let definition = self.definition(definition_key)?;
        let mut instance = WorkflowInstance::new(session_id, definition_key);

        tracing::info!(
            session_id,
            definition_key,
            instance_id = %instance.instance_id,
            "starting workflow instance"
        );

        self.run_step(&definition, &mut instance, initial_payload)
            .await?;
        Ok(instance)
    }

    /// Deliver a human reply to the suspended instance for a session.
    ///
    /// Approval advances one step; cancellation abandons; anything else
    /// leaves the instance untouched and returns `UnrecognizedResponse`
    /// carrying the unchanged pending request.
    pub async fn resume(
        &self,
        session_id: &str,
        human_response: &str,
    ) -> Result<WorkflowInstance, EngineError> {
        let lock = self.lock_for(session_id);
        let _guard = lock.lock().await;

        let mut instance = self
            .checkpoints
            .load(session_id)
            .await?
            .filter(|i| i.status == WorkflowStatus::AwaitingInput)
            .ok_or(EngineError::NoActiveWorkflow)?;

        let pending = instance
            .pending_request
            .clone()
            .ok_or(EngineError::NoActiveWorkflow)?;

        match interpret(human_response) {
            ResumeDirective::Unrecognized => {
                tracing::debug!(session_id, "resume reply not recognized, re-emitting prompt");
                Err(EngineError::UnrecognizedResponse { pending })
            }
            ResumeDirective::Cancel => {
                instance.abandon();
                // Snapshot retained for audit.
                self.checkpoints.save(&instance).await?;
                tracing::info!(
                    session_id,
                    instance_id = %instance.instance_id,
                    "workflow cancelled by user"
                );
                Ok(instance)
            }
            ResumeDirective::Approve => {
                let input = instance.last_output().unwrap_or_default().to_string();
                self.advance(&mut instance, &input).await?;
                Ok(instance)
            }
            ResumeDirective::ApproveWithEdit(edit) => {
                let prior = instance.last_output().unwrap_or_default();
                let input = amend_payload(prior, &edit);
                self.advance(&mut instance, &input).await?;
                Ok(instance)
            }
        }
    }

    /// Abandon the suspended instance for a session without a reply.
    ///
    /// Used by the transport for pending-request TTL expiry; behaves
    /// exactly like an interpreted cancellation.
    pub async fn cancel(&self, session_id: &str) -> Result<WorkflowInstance, EngineError> {
        let lock = self.lock_for(session_id);
        let _guard = lock.lock().await;

        let mut instance = self
            .checkpoints
            .load(session_id)
            .await?
            .filter(|i| i.is_active())
            .ok_or(EngineError::NoActiveWorkflow)?;

        instance.abandon();
        self.checkpoints.save(&instance).await?;
        tracing::info!(
            session_id,
            instance_id = %instance.instance_id,
            "workflow cancelled"
        );
        Ok(instance)
    }

    /// Reconstruct the instance for a session from its checkpoint.
    ///
    /// Idempotent: never re-invokes a step handler. The stored pending
    /// request is returned verbatim for re-emission.
    pub async fn recover(&self, session_id: &str) -> Result<WorkflowInstance, EngineError> {
        let lock = self.lock_for(session_id);
        let _guard = lock.lock().await;

        let instance = self
            .checkpoints
            .load(session_id)
            .await?
            .ok_or(EngineError::NotFound)?;

        tracing::info!(
            session_id,
            instance_id = %instance.instance_id,
            status = %instance.status,
            step_index = instance.current_step_index,
            "recovered workflow instance"
        );
        Ok(instance)
    }

    /// Read-only snapshot of the instance for a session. No side effects.
    pub async fn status(&self, session_id: &str) -> Result<WorkflowInstance, EngineError> {
        self.checkpoints
            .load(session_id)
            .await?
            .ok_or(EngineError::NotFound)
    }

    /// All instances currently awaiting input (startup recovery sweep).
    pub async fn list_awaiting(&self) -> Result<Vec<WorkflowInstance>, EngineError> {
        Ok(self.checkpoints.list_awaiting().await?)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Reopen a suspended instance and run its next step.
    async fn advance(
        &self,
        instance: &mut WorkflowInstance,
        input: &str,
    ) -> Result<(), EngineError> {
        let definition = self.definition(&instance.definition_key)?;
        instance.reopen();
        self.run_step(&definition, instance, input).await
    }

    /// Invoke the handler at `current_step_index` and persist the outcome.
    ///
    /// On success the checkpoint is saved before returning, so a reported
    /// `awaiting_input` is always recoverable. On handler failure the
    /// instance is abandoned; the audit snapshot is saved best-effort and
    /// the failure is surfaced unconditionally.
    async fn run_step(
        &self,
        definition: &WorkflowDefinition,
        instance: &mut WorkflowInstance,
        input: &str,
    ) -> Result<(), EngineError> {
        let index = instance.current_step_index;
        let entry = definition
            .step(index)
            .ok_or_else(|| EngineError::UnknownDefinition(instance.definition_key.clone()))?;

        tracing::info!(
            session_id = instance.session_id.as_str(),
            step = entry.name.as_str(),
            step_index = index,
            "running workflow step"
        );

        match entry.handler.invoke(input).await {
            Ok(output) => {
                if definition.is_last(index) {
                    instance.complete(output);
                } else {
                    let pending = PendingRequest {
                        step_name: entry.name.clone(),
                        rendered_output: output.clone(),
                        prompt_text: entry.prompt_text.clone(),
                    };
                    instance.suspend(output, pending);
                }
                self.checkpoints.save(instance).await?;
                Ok(())
            }
            Err(step_err) => {
                let detail = step_err.to_string();
                tracing::warn!(
                    session_id = instance.session_id.as_str(),
                    step = entry.name.as_str(),
                    error = detail.as_str(),
                    "step handler failed, abandoning workflow"
                );

                instance.abandon();
                if let Err(save_err) = self.checkpoints.save(instance).await {
                    tracing::warn!(
                        session_id = instance.session_id.as_str(),
                        error = %save_err,
                        "failed to persist abandoned snapshot"
                    );
                }

                Err(EngineError::StepHandler {
                    step_name: entry.name.clone(),
                    detail,
                })
            }
        }
    }
}

/// Combine the prior step output with a human edit instruction.
///
/// The engine advances past the confirmed step and hands the next handler
/// the prior output annotated with the requested changes.
fn amend_payload(prior: &str, edit: &str) -> String {
    format!("{prior}\n\n[Requested changes: {edit}]")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
