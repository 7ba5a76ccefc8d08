//! Checkpoint manager wrapping the checkpoint repository.
//!
//! Thin layer over `CheckpointRepository` that adds structured logging on
//! every transition. The engine persists through this manager so that a
//! crash between "step executed" and "response sent" is always recoverable
//! from the last saved snapshot.

use handrail_types::error::RepositoryError;
use handrail_types::workflow::WorkflowInstance;

use crate::repository::checkpoint::CheckpointRepository;

/// Manages durable snapshots of workflow instances.
///
/// Generic over `R: CheckpointRepository` so it works with any storage
/// backend (SQLite, in-memory).
pub struct CheckpointManager<R: CheckpointRepository> {
    repo: R,
}

impl<R: CheckpointRepository> CheckpointManager<R> {
    /// Create a new checkpoint manager backed by the given repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Persist a snapshot, overwriting any prior snapshot for the session.
    pub async fn save(&self, instance: &WorkflowInstance) -> Result<(), RepositoryError> {
        self.repo.save(instance).await?;

        tracing::debug!(
            session_id = instance.session_id.as_str(),
            instance_id = %instance.instance_id,
            step_index = instance.current_step_index,
            status = %instance.status,
            "checkpointed workflow instance"
        );

        Ok(())
    }

    /// Load the snapshot for a session, if one exists.
    pub async fn load(
        &self,
        session_id: &str,
    ) -> Result<Option<WorkflowInstance>, RepositoryError> {
        self.repo.load(session_id).await
    }

    /// Remove the snapshot for a session. Returns `true` if it existed.
    pub async fn delete(&self, session_id: &str) -> Result<bool, RepositoryError> {
        let existed = self.repo.delete(session_id).await?;
        tracing::debug!(session_id, existed, "deleted workflow checkpoint");
        Ok(existed)
    }

    /// List snapshots awaiting human input (used by the startup sweep).
    pub async fn list_awaiting(&self) -> Result<Vec<WorkflowInstance>, RepositoryError> {
        self.repo.list_awaiting().await
    }
}
