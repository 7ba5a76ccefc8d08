//! Process-local in-memory repository implementations.
//!
//! Used when the durable SQLite store is unreachable at startup, and as
//! lightweight backends in tests. State lives only as long as the process;
//! recovery guarantees are reduced accordingly, which is why selection
//! happens once with a loud warning rather than silently per call.

use dashmap::DashMap;
use handrail_core::repository::checkpoint::CheckpointRepository;
use handrail_core::repository::session::SessionRepository;
use handrail_types::error::RepositoryError;
use handrail_types::session::{SessionRecord, Turn, TurnRole, derive_title};
use handrail_types::workflow::{WorkflowInstance, WorkflowStatus};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Checkpoints
// ---------------------------------------------------------------------------

/// In-memory implementation of `CheckpointRepository`.
///
/// DashMap entries give per-session-key linearizable writes.
#[derive(Debug, Default)]
pub struct MemoryCheckpointRepository {
    items: DashMap<String, WorkflowInstance>,
}

impl MemoryCheckpointRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointRepository for MemoryCheckpointRepository {
    async fn save(&self, instance: &WorkflowInstance) -> Result<(), RepositoryError> {
        self.items
            .insert(instance.session_id.clone(), instance.clone());
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<WorkflowInstance>, RepositoryError> {
        Ok(self.items.get(session_id).map(|e| e.value().clone()))
    }

    async fn delete(&self, session_id: &str) -> Result<bool, RepositoryError> {
        Ok(self.items.remove(session_id).is_some())
    }

    async fn list_awaiting(&self) -> Result<Vec<WorkflowInstance>, RepositoryError> {
        Ok(self
            .items
            .iter()
            .filter(|e| e.value().status == WorkflowStatus::AwaitingInput)
            .map(|e| e.value().clone())
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct SessionEntry {
    record: SessionRecord,
    turns: Vec<Turn>,
}

/// In-memory implementation of `SessionRepository`.
#[derive(Debug, Default)]
pub struct MemorySessionRepository {
    sessions: DashMap<String, SessionEntry>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionRepository for MemorySessionRepository {
    async fn append_turn(&self, turn: &Turn) -> Result<(), RepositoryError> {
        let mut entry = self
            .sessions
            .entry(turn.session_id.clone())
            .or_insert_with(|| SessionEntry {
                record: SessionRecord::new(&turn.session_id),
                turns: Vec::new(),
            });

        let entry = entry.value_mut();
        if entry.record.title.is_none() && turn.role == TurnRole::User {
            entry.record.title = Some(derive_title(&turn.content));
        }
        entry.record.updated_at = turn.created_at;
        entry.turns.push(turn.clone());
        Ok(())
    }

    async fn get_history(
        &self,
        session_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Turn>, RepositoryError> {
        let Some(entry) = self.sessions.get(session_id) else {
            return Ok(Vec::new());
        };

        let turns = &entry.value().turns;
        let turns = match limit {
            Some(n) if (n as usize) < turns.len() => turns[turns.len() - n as usize..].to_vec(),
            _ => turns.clone(),
        };
        Ok(turns)
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>, RepositoryError> {
        Ok(self
            .sessions
            .get(session_id)
            .map(|e| e.value().record.clone()))
    }

    async fn list_sessions(&self, limit: u32) -> Result<Vec<SessionRecord>, RepositoryError> {
        let mut records: Vec<SessionRecord> = self
            .sessions
            .iter()
            .map(|e| e.value().record.clone())
            .collect();
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        records.truncate(limit as usize);
        Ok(records)
    }

    async fn set_active_workflow(
        &self,
        session_id: &str,
        instance_id: Option<Uuid>,
    ) -> Result<(), RepositoryError> {
        let mut entry = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionEntry {
                record: SessionRecord::new(session_id),
                turns: Vec::new(),
            });

        let record = &mut entry.value_mut().record;
        record.active_instance_id = instance_id;
        record.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn get_active_workflow(&self, session_id: &str) -> Result<Option<Uuid>, RepositoryError> {
        Ok(self
            .sessions
            .get(session_id)
            .and_then(|e| e.value().record.active_instance_id))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_checkpoint_save_load_delete() {
        let repo = MemoryCheckpointRepository::new();
        let instance = WorkflowInstance::new("s1", "recruiting");

        repo.save(&instance).await.unwrap();
        let loaded = repo.load("s1").await.unwrap().unwrap();
        assert_eq!(loaded.instance_id, instance.instance_id);

        assert!(repo.delete("s1").await.unwrap());
        assert!(repo.load("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_title_and_history() {
        let repo = MemorySessionRepository::new();

        repo.append_turn(&Turn::new("s1", TurnRole::User, "hello there"))
            .await
            .unwrap();
        repo.append_turn(&Turn::new("s1", TurnRole::Assistant, "hi"))
            .await
            .unwrap();

        let session = repo.get_session("s1").await.unwrap().unwrap();
        assert_eq!(session.title.as_deref(), Some("hello there"));

        let history = repo.get_history("s1", None).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, TurnRole::User);

        let limited = repo.get_history("s1", Some(1)).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].role, TurnRole::Assistant);
    }

    #[tokio::test]
    async fn test_active_workflow_reference() {
        let repo = MemorySessionRepository::new();
        let id = Uuid::now_v7();

        repo.set_active_workflow("s1", Some(id)).await.unwrap();
        assert_eq!(repo.get_active_workflow("s1").await.unwrap(), Some(id));

        repo.set_active_workflow("s1", None).await.unwrap();
        assert!(repo.get_active_workflow("s1").await.unwrap().is_none());
    }
}
