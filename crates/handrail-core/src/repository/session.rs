//! Session repository trait definition.
//!
//! Covers conversation history (ordered turns) and the active-workflow
//! reference per session. Sessions are created implicitly by the first
//! `append_turn` and are never deleted by the engine.

use handrail_types::error::RepositoryError;
use handrail_types::session::{SessionRecord, Turn};
use uuid::Uuid;

/// Repository trait for session and turn persistence.
///
/// Two implementations share this contract: a durable SQLite store and a
/// process-local in-memory store used when the durable store is unreachable
/// at startup. Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait SessionRepository: Send + Sync {
    /// Append a turn, creating the session record if it does not exist.
    ///
    /// The session title is derived from the first user turn.
    fn append_turn(
        &self,
        turn: &Turn,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get turns for a session ordered by `created_at` ASC.
    ///
    /// With a limit, the most recent `limit` turns are returned (still in
    /// ascending order).
    fn get_history(
        &self,
        session_id: &str,
        limit: Option<u32>,
    ) -> impl std::future::Future<Output = Result<Vec<Turn>, RepositoryError>> + Send;

    /// Get a session record by id.
    fn get_session(
        &self,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<SessionRecord>, RepositoryError>> + Send;

    /// List sessions ordered by `updated_at` DESC.
    fn list_sessions(
        &self,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<SessionRecord>, RepositoryError>> + Send;

    /// Set or clear the active workflow instance reference.
    fn set_active_workflow(
        &self,
        session_id: &str,
        instance_id: Option<Uuid>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get the active workflow instance reference, if any.
    fn get_active_workflow(
        &self,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Uuid>, RepositoryError>> + Send;
}

/// Shared repositories delegate through `Arc`.
impl<T: SessionRepository> SessionRepository for std::sync::Arc<T> {
    async fn append_turn(&self, turn: &Turn) -> Result<(), RepositoryError> {
        (**self).append_turn(turn).await
    }

    async fn get_history(
        &self,
        session_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Turn>, RepositoryError> {
        (**self).get_history(session_id, limit).await
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>, RepositoryError> {
        (**self).get_session(session_id).await
    }

    async fn list_sessions(&self, limit: u32) -> Result<Vec<SessionRecord>, RepositoryError> {
        (**self).list_sessions(limit).await
    }

    async fn set_active_workflow(
        &self,
        session_id: &str,
        instance_id: Option<Uuid>,
    ) -> Result<(), RepositoryError> {
        (**self).set_active_workflow(session_id, instance_id).await
    }

    async fn get_active_workflow(&self, session_id: &str) -> Result<Option<Uuid>, RepositoryError> {
        (**self).get_active_workflow(session_id).await
    }
}
