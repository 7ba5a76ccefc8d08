//! Checkpoint repository trait definition.
//!
//! A checkpoint is the full snapshot of a workflow instance, keyed by
//! session id. The engine overwrites it on every transition and reads it
//! back at resume/recover; `save` must be flushed before the engine reports
//! `awaiting_input` to the caller.
//!
//! Uses native async fn in traits (RPITIT, Rust 2024 edition).

use handrail_types::error::RepositoryError;
use handrail_types::workflow::WorkflowInstance;

/// Repository trait for durable workflow instance snapshots.
///
/// Implementations live in handrail-infra (`SqliteCheckpointRepository`,
/// `MemoryCheckpointRepository`). `save` for a given session id must be
/// linearizable with respect to other writes for that key.
pub trait CheckpointRepository: Send + Sync {
    /// Persist a full snapshot, overwriting any prior snapshot for the
    /// instance's session.
    fn save(
        &self,
        instance: &WorkflowInstance,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Load the snapshot for a session, if one exists.
    fn load(
        &self,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<WorkflowInstance>, RepositoryError>> + Send;

    /// Remove the snapshot for a session. Returns `true` if it existed.
    ///
    /// Optional cleanup -- terminal snapshots may be retained for audit.
    fn delete(
        &self,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// List all snapshots whose status is `awaiting_input` (startup sweep).
    fn list_awaiting(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<WorkflowInstance>, RepositoryError>> + Send;
}

/// Shared repositories delegate through `Arc`, so one backend can serve the
/// engine, the startup sweep, and the transport at once.
impl<T: CheckpointRepository> CheckpointRepository for std::sync::Arc<T> {
    async fn save(&self, instance: &WorkflowInstance) -> Result<(), RepositoryError> {
        (**self).save(instance).await
    }

    async fn load(&self, session_id: &str) -> Result<Option<WorkflowInstance>, RepositoryError> {
        (**self).load(session_id).await
    }

    async fn delete(&self, session_id: &str) -> Result<bool, RepositoryError> {
        (**self).delete(session_id).await
    }

    async fn list_awaiting(&self) -> Result<Vec<WorkflowInstance>, RepositoryError> {
        (**self).list_awaiting().await
    }
}
