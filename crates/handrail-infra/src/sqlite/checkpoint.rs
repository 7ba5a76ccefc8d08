//! SQLite checkpoint repository implementation.
//!
//! Implements `CheckpointRepository` from `handrail-core` using sqlx with
//! split read/write pools. One row per session; `save` is an
//! `INSERT OR REPLACE` through the single-connection writer pool, which
//! both overwrites the prior snapshot and keeps writes linearizable.

use handrail_core::repository::checkpoint::CheckpointRepository;
use handrail_types::error::RepositoryError;
use handrail_types::workflow::{PendingRequest, WorkflowInstance, WorkflowStatus};
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `CheckpointRepository`.
pub struct SqliteCheckpointRepository {
    pool: DatabasePool,
}

impl SqliteCheckpointRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct CheckpointRow {
    session_id: String,
    instance_id: String,
    definition_key: String,
    current_step_index: i64,
    step_outputs: String,
    status: String,
    pending_request: Option<String>,
    created_at: String,
    updated_at: String,
}

impl CheckpointRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            session_id: row.try_get("session_id")?,
            instance_id: row.try_get("instance_id")?,
            definition_key: row.try_get("definition_key")?,
            current_step_index: row.try_get("current_step_index")?,
            step_outputs: row.try_get("step_outputs")?,
            status: row.try_get("status")?,
            pending_request: row.try_get("pending_request")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_instance(self) -> Result<WorkflowInstance, RepositoryError> {
        let instance_id = parse_uuid(&self.instance_id)?;
        let status: WorkflowStatus = self
            .status
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        let step_outputs: Vec<String> = serde_json::from_str(&self.step_outputs)
            .map_err(|e| RepositoryError::Query(format!("invalid step_outputs JSON: {e}")))?;

        let pending_request: Option<PendingRequest> = self
            .pending_request
            .as_deref()
            .map(|s| {
                serde_json::from_str(s)
                    .map_err(|e| RepositoryError::Query(format!("invalid pending_request: {e}")))
            })
            .transpose()?;

        Ok(WorkflowInstance {
            instance_id,
            session_id: self.session_id,
            definition_key: self.definition_key,
            current_step_index: self.current_step_index as usize,
            step_outputs,
            status,
            pending_request,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_uuid(s: &str) -> Result<Uuid, RepositoryError> {
    s.parse::<Uuid>()
        .map_err(|e| RepositoryError::Query(format!("invalid UUID: {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// ---------------------------------------------------------------------------
// Trait implementation
// ---------------------------------------------------------------------------

impl CheckpointRepository for SqliteCheckpointRepository {
    async fn save(&self, instance: &WorkflowInstance) -> Result<(), RepositoryError> {
        let step_outputs = serde_json::to_string(&instance.step_outputs)
            .map_err(|e| RepositoryError::Query(format!("serialize step_outputs: {e}")))?;
        let pending_request = instance
            .pending_request
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("serialize pending_request: {e}")))?;

        sqlx::query(
            r#"INSERT OR REPLACE INTO workflow_checkpoints
               (session_id, instance_id, definition_key, current_step_index, step_outputs, status, pending_request, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&instance.session_id)
        .bind(instance.instance_id.to_string())
        .bind(&instance.definition_key)
        .bind(instance.current_step_index as i64)
        .bind(step_outputs)
        .bind(instance.status.to_string())
        .bind(pending_request)
        .bind(format_datetime(&instance.created_at))
        .bind(format_datetime(&instance.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<WorkflowInstance>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM workflow_checkpoints WHERE session_id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.map(|r| {
            CheckpointRow::from_row(&r)
                .map_err(|e| RepositoryError::Query(e.to_string()))?
                .into_instance()
        })
        .transpose()
    }

    async fn delete(&self, session_id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM workflow_checkpoints WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_awaiting(&self) -> Result<Vec<WorkflowInstance>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM workflow_checkpoints WHERE status = 'awaiting_input' ORDER BY updated_at ASC",
        )
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|r| {
                CheckpointRow::from_row(r)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_instance()
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
