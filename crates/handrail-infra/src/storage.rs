//! One-time durable-or-local storage selection.
//!
//! The backend is chosen exactly once, at initialization: if the SQLite
//! connection fails, the whole process degrades to in-memory storage with a
//! single warning. There is no per-call retry and the decision is never
//! re-evaluated -- a degraded process stays degraded until restart.

use std::sync::Arc;

use handrail_core::repository::checkpoint::CheckpointRepository;
use handrail_core::repository::session::SessionRepository;
use handrail_types::error::RepositoryError;
use handrail_types::session::{SessionRecord, Turn};
use handrail_types::workflow::WorkflowInstance;
use uuid::Uuid;

use crate::memory::{MemoryCheckpointRepository, MemorySessionRepository};
use crate::sqlite::checkpoint::SqliteCheckpointRepository;
use crate::sqlite::pool::DatabasePool;
use crate::sqlite::session::SqliteSessionRepository;

// ---------------------------------------------------------------------------
// Backend enums
// ---------------------------------------------------------------------------

/// Checkpoint store delegating to the backend selected at startup.
pub enum CheckpointStore {
    Durable(SqliteCheckpointRepository),
    Local(MemoryCheckpointRepository),
}

impl CheckpointRepository for CheckpointStore {
    async fn save(&self, instance: &WorkflowInstance) -> Result<(), RepositoryError> {
        match self {
            CheckpointStore::Durable(repo) => repo.save(instance).await,
            CheckpointStore::Local(repo) => repo.save(instance).await,
        }
    }

    async fn load(&self, session_id: &str) -> Result<Option<WorkflowInstance>, RepositoryError> {
        match self {
            CheckpointStore::Durable(repo) => repo.load(session_id).await,
            CheckpointStore::Local(repo) => repo.load(session_id).await,
        }
    }

    async fn delete(&self, session_id: &str) -> Result<bool, RepositoryError> {
        match self {
            CheckpointStore::Durable(repo) => repo.delete(session_id).await,
            CheckpointStore::Local(repo) => repo.delete(session_id).await,
        }
    }

    async fn list_awaiting(&self) -> Result<Vec<WorkflowInstance>, RepositoryError> {
        match self {
            CheckpointStore::Durable(repo) => repo.list_awaiting().await,
            CheckpointStore::Local(repo) => repo.list_awaiting().await,
        }
    }
}

/// Session store delegating to the backend selected at startup.
pub enum SessionStore {
    Durable(SqliteSessionRepository),
    Local(MemorySessionRepository),
}

impl SessionRepository for SessionStore {
    async fn append_turn(&self, turn: &Turn) -> Result<(), RepositoryError> {
        match self {
            SessionStore::Durable(repo) => repo.append_turn(turn).await,
            SessionStore::Local(repo) => repo.append_turn(turn).await,
        }
    }

    async fn get_history(
        &self,
        session_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Turn>, RepositoryError> {
        match self {
            SessionStore::Durable(repo) => repo.get_history(session_id, limit).await,
            SessionStore::Local(repo) => repo.get_history(session_id, limit).await,
        }
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>, RepositoryError> {
        match self {
            SessionStore::Durable(repo) => repo.get_session(session_id).await,
            SessionStore::Local(repo) => repo.get_session(session_id).await,
        }
    }

    async fn list_sessions(&self, limit: u32) -> Result<Vec<SessionRecord>, RepositoryError> {
        match self {
            SessionStore::Durable(repo) => repo.list_sessions(limit).await,
            SessionStore::Local(repo) => repo.list_sessions(limit).await,
        }
    }

    async fn set_active_workflow(
        &self,
        session_id: &str,
        instance_id: Option<Uuid>,
    ) -> Result<(), RepositoryError> {
        match self {
            SessionStore::Durable(repo) => repo.set_active_workflow(session_id, instance_id).await,
            SessionStore::Local(repo) => repo.set_active_workflow(session_id, instance_id).await,
        }
    }

    async fn get_active_workflow(&self, session_id: &str) -> Result<Option<Uuid>, RepositoryError> {
        match self {
            SessionStore::Durable(repo) => repo.get_active_workflow(session_id).await,
            SessionStore::Local(repo) => repo.get_active_workflow(session_id).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Runtime selection
// ---------------------------------------------------------------------------

/// The storage backends the process runs on, selected once at startup.
pub struct StorageRuntime {
    pub checkpoints: Arc<CheckpointStore>,
    pub sessions: Arc<SessionStore>,
    /// Whether the durable backend was reachable at initialization.
    pub durable: bool,
}

impl StorageRuntime {
    /// Connect to the durable store, or degrade the whole process to
    /// in-memory storage with a one-time warning.
    pub async fn connect(database_url: &str) -> Self {
        match DatabasePool::new(database_url).await {
            Ok(pool) => {
                tracing::info!(database_url, "durable storage connected");
                Self {
                    checkpoints: Arc::new(CheckpointStore::Durable(
                        SqliteCheckpointRepository::new(pool.clone()),
                    )),
                    sessions: Arc::new(SessionStore::Durable(SqliteSessionRepository::new(pool))),
                    durable: true,
                }
            }
            Err(err) => {
                tracing::warn!(
                    database_url,
                    error = %err,
                    "durable storage unreachable, using in-memory stores; \
                     workflow state will not survive a restart"
                );
                Self::local()
            }
        }
    }

    /// Build a purely in-memory runtime (tests, local development).
    pub fn local() -> Self {
        Self {
            checkpoints: Arc::new(CheckpointStore::Local(MemoryCheckpointRepository::new())),
            sessions: Arc::new(SessionStore::Local(MemorySessionRepository::new())),
            durable: false,
        }
    }
}
