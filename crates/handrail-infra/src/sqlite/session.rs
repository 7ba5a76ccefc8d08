//! SQLite session repository implementation.
//!
//! Implements `SessionRepository` from `handrail-core` using sqlx with split
//! read/write pools. Follows the same patterns as the checkpoint repository:
//! raw queries, private Row structs, writer-pool mutation.

use handrail_core::repository::session::SessionRepository;
use handrail_types::error::RepositoryError;
use handrail_types::session::{SessionRecord, Turn, TurnRole, derive_title};
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `SessionRepository`.
pub struct SqliteSessionRepository {
    pool: DatabasePool,
}

impl SqliteSessionRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct SessionRow {
    session_id: String,
    title: Option<String>,
    active_instance_id: Option<String>,
    created_at: String,
    updated_at: String,
}

impl SessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            session_id: row.try_get("session_id")?,
            title: row.try_get("title")?,
            active_instance_id: row.try_get("active_instance_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_record(self) -> Result<SessionRecord, RepositoryError> {
        let active_instance_id = self
            .active_instance_id
            .as_deref()
            .map(parse_uuid)
            .transpose()?;

        Ok(SessionRecord {
            session_id: self.session_id,
            title: self.title,
            active_instance_id,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

struct TurnRow {
    id: String,
    session_id: String,
    role: String,
    content: String,
    created_at: String,
}

impl TurnRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_turn(self) -> Result<Turn, RepositoryError> {
        let role: TurnRole = self
            .role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(Turn {
            id: parse_uuid(&self.id)?,
            session_id: self.session_id,
            role,
            content: self.content,
            created_at: parse_datetime(&self.created_at)?,
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

impl SessionRepository for SqliteSessionRepository {
    async fn append_turn(&self, turn: &Turn) -> Result<(), RepositoryError> {
        let now = format_datetime(&turn.created_at);

        // Title derives from the first user turn; COALESCE keeps the
        // earliest non-null value.
        let title = match turn.role {
            TurnRole::User => Some(derive_title(&turn.content)),
            TurnRole::Assistant => None,
        };

        sqlx::query(
            r#"INSERT INTO sessions (session_id, title, active_instance_id, created_at, updated_at)
               VALUES (?, ?, NULL, ?, ?)
               ON CONFLICT(session_id) DO UPDATE SET
                   title = COALESCE(sessions.title, excluded.title),
                   updated_at = excluded.updated_at"#,
        )
        .bind(&turn.session_id)
        .bind(title)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO session_turns (id, session_id, role, content, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(turn.id.to_string())
        .bind(&turn.session_id)
        .bind(turn.role.to_string())
        .bind(&turn.content)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get_history(
        &self,
        session_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Turn>, RepositoryError> {
        let rows = match limit {
            Some(n) => {
                // Most recent n turns, returned in ascending order.
                sqlx::query(
                    r#"SELECT * FROM (
                           SELECT * FROM session_turns WHERE session_id = ?
                           ORDER BY created_at DESC, id DESC LIMIT ?
                       ) ORDER BY created_at ASC, id ASC"#,
                )
                .bind(session_id)
                .bind(n as i64)
                .fetch_all(&self.pool.reader)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT * FROM session_turns WHERE session_id = ? ORDER BY created_at ASC, id ASC",
                )
                .bind(session_id)
                .fetch_all(&self.pool.reader)
                .await
            }
        }
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|r| {
                TurnRow::from_row(r)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_turn()
            })
            .collect()
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM sessions WHERE session_id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.map(|r| {
            SessionRow::from_row(&r)
                .map_err(|e| RepositoryError::Query(e.to_string()))?
                .into_record()
        })
        .transpose()
    }

    async fn list_sessions(&self, limit: u32) -> Result<Vec<SessionRecord>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM sessions ORDER BY updated_at DESC LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|r| {
                SessionRow::from_row(r)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_record()
            })
            .collect()
    }

    async fn set_active_workflow(
        &self,
        session_id: &str,
        instance_id: Option<Uuid>,
    ) -> Result<(), RepositoryError> {
        let now = format_datetime(&Utc::now());

        // Upsert: the recovery sweep may attach a workflow to a session
        // whose row does not exist yet in this store.
        sqlx::query(
            r#"INSERT INTO sessions (session_id, title, active_instance_id, created_at, updated_at)
               VALUES (?, NULL, ?, ?, ?)
               ON CONFLICT(session_id) DO UPDATE SET
                   active_instance_id = excluded.active_instance_id,
                   updated_at = excluded.updated_at"#,
        )
        .bind(session_id)
        .bind(instance_id.map(|id| id.to_string()))
        .bind(&now)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get_active_workflow(&self, session_id: &str) -> Result<Option<Uuid>, RepositoryError> {
        let row = sqlx::query("SELECT active_instance_id FROM sessions WHERE session_id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let id: Option<String> = row
            .try_get("active_instance_id")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        id.as_deref().map(parse_uuid).transpose()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_repo() -> (SqliteSessionRepository, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let pool = DatabasePool::new(&url).await.unwrap();
        (SqliteSessionRepository::new(pool), dir)
    }

    #[tokio::test]
    async fn test_append_turn_creates_session_with_title() {
        let (repo, _dir) = test_repo().await;

        let turn = Turn::new("s1", TurnRole::User, "I need a senior data engineer");
        repo.append_turn(&turn).await.unwrap();

        let session = repo.get_session("s1").await.unwrap().unwrap();
        assert_eq!(session.title.as_deref(), Some("I need a senior data engineer"));
        assert!(session.active_instance_id.is_none());
    }

    #[tokio::test]
    async fn test_title_keeps_first_user_message() {
        let (repo, _dir) = test_repo().await;

        repo.append_turn(&Turn::new("s1", TurnRole::User, "first message"))
            .await
            .unwrap();
        repo.append_turn(&Turn::new("s1", TurnRole::Assistant, "reply"))
            .await
            .unwrap();
        repo.append_turn(&Turn::new("s1", TurnRole::User, "second message"))
            .await
            .unwrap();

        let session = repo.get_session("s1").await.unwrap().unwrap();
        assert_eq!(session.title.as_deref(), Some("first message"));
    }

    #[tokio::test]
    async fn test_history_order_and_limit() {
        let (repo, _dir) = test_repo().await;

        for i in 0..5 {
            repo.append_turn(&Turn::new("s1", TurnRole::User, format!("msg {i}")))
                .await
                .unwrap();
        }

        let all = repo.get_history("s1", None).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].content, "msg 0");
        assert_eq!(all[4].content, "msg 4");

        // Limit returns the most recent turns, still ascending.
        let last_two = repo.get_history("s1", Some(2)).await.unwrap();
        assert_eq!(last_two.len(), 2);
        assert_eq!(last_two[0].content, "msg 3");
        assert_eq!(last_two[1].content, "msg 4");
    }

    #[tokio::test]
    async fn test_history_empty_for_unknown_session() {
        let (repo, _dir) = test_repo().await;
        assert!(repo.get_history("missing", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_active_workflow_roundtrip() {
        let (repo, _dir) = test_repo().await;

        repo.append_turn(&Turn::new("s1", TurnRole::User, "hello"))
            .await
            .unwrap();
        assert!(repo.get_active_workflow("s1").await.unwrap().is_none());

        let instance_id = Uuid::now_v7();
        repo.set_active_workflow("s1", Some(instance_id)).await.unwrap();
        assert_eq!(
            repo.get_active_workflow("s1").await.unwrap(),
            Some(instance_id)
        );

        repo.set_active_workflow("s1", None).await.unwrap();
        assert!(repo.get_active_workflow("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_active_workflow_creates_missing_session() {
        let (repo, _dir) = test_repo().await;

        let instance_id = Uuid::now_v7();
        repo.set_active_workflow("fresh", Some(instance_id))
            .await
            .unwrap();

        let session = repo.get_session("fresh").await.unwrap().unwrap();
        assert_eq!(session.active_instance_id, Some(instance_id));
    }

    #[tokio::test]
    async fn test_list_sessions_newest_first() {
        let (repo, _dir) = test_repo().await;

        repo.append_turn(&Turn::new("s1", TurnRole::User, "one"))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        repo.append_turn(&Turn::new("s2", TurnRole::User, "two"))
            .await
            .unwrap();

        let sessions = repo.list_sessions(10).await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].session_id, "s2");
        assert_eq!(sessions[1].session_id, "s1");
    }
}
