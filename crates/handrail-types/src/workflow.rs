//! Workflow domain types for Handrail.
//!
//! A workflow instance is one run of a named step pipeline for one session.
//! The instance plus its pending request is the unit the checkpoint store
//! persists after every transition, so these types must round-trip exactly
//! through JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Workflow status
// ---------------------------------------------------------------------------

/// Lifecycle status of a workflow instance.
///
/// `Running` only exists inside an engine operation; every persisted
/// snapshot is `AwaitingInput`, `Completed`, or `Abandoned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Running,
    AwaitingInput,
    Completed,
    Abandoned,
}

impl WorkflowStatus {
    /// Whether this status counts as an open workflow for the session.
    ///
    /// At most one instance per session may be active at a time.
    pub fn is_active(self) -> bool {
        matches!(self, WorkflowStatus::Running | WorkflowStatus::AwaitingInput)
    }

    /// Whether this status is terminal (no further transitions).
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowStatus::Completed | WorkflowStatus::Abandoned)
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowStatus::Running => write!(f, "running"),
            WorkflowStatus::AwaitingInput => write!(f, "awaiting_input"),
            WorkflowStatus::Completed => write!(f, "completed"),
            WorkflowStatus::Abandoned => write!(f, "abandoned"),
        }
    }
}

impl FromStr for WorkflowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "running" => Ok(WorkflowStatus::Running),
            "awaiting_input" => Ok(WorkflowStatus::AwaitingInput),
            "completed" => Ok(WorkflowStatus::Completed),
            "abandoned" => Ok(WorkflowStatus::Abandoned),
            other => Err(format!("invalid workflow status: '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Pending request
// ---------------------------------------------------------------------------

/// Description of the human decision the engine is currently waiting on.
///
/// The shape is identical for every step so a generic transport can render
/// it without per-step knowledge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    /// Name of the step whose output is awaiting confirmation.
    pub step_name: String,
    /// The step's rendered output, shown to the human.
    pub rendered_output: String,
    /// What the human is being asked (e.g. "say 'proceed' to continue").
    pub prompt_text: String,
}

// ---------------------------------------------------------------------------
// Workflow instance
// ---------------------------------------------------------------------------

/// One execution of a workflow definition for one session.
///
/// `current_step_index` counts completed steps; while the instance is
/// active it always equals `step_outputs.len()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInstance {
    /// UUIDv7 assigned at start.
    pub instance_id: Uuid,
    /// The session this instance belongs to. One active instance per session.
    pub session_id: String,
    /// Key of the workflow definition in the definition registry.
    pub definition_key: String,
    /// Number of steps completed so far.
    pub current_step_index: usize,
    /// Outputs of completed steps, in step order. Append-only.
    pub step_outputs: Vec<String>,
    /// Current lifecycle status.
    pub status: WorkflowStatus,
    /// What human decision is awaited. `Some` iff status is `AwaitingInput`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_request: Option<PendingRequest>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowInstance {
    /// Create a fresh `Running` instance with no completed steps.
    pub fn new(session_id: impl Into<String>, definition_key: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            instance_id: Uuid::now_v7(),
            session_id: session_id.into(),
            definition_key: definition_key.into(),
            current_step_index: 0,
            step_outputs: Vec::new(),
            status: WorkflowStatus::Running,
            pending_request: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this instance is open (running or awaiting input).
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Record a completed step's output and suspend awaiting confirmation.
    pub fn suspend(&mut self, output: String, pending: PendingRequest) {
        self.step_outputs.push(output);
        self.current_step_index = self.step_outputs.len();
        self.status = WorkflowStatus::AwaitingInput;
        self.pending_request = Some(pending);
        self.updated_at = Utc::now();
    }

    /// Record the final step's output and complete the instance.
    pub fn complete(&mut self, output: String) {
        self.step_outputs.push(output);
        self.current_step_index = self.step_outputs.len();
        self.status = WorkflowStatus::Completed;
        self.pending_request = None;
        self.updated_at = Utc::now();
    }

    /// Clear the pending request and mark the instance running again.
    ///
    /// Called when an approval arrives and the next step is about to run.
    pub fn reopen(&mut self) {
        self.status = WorkflowStatus::Running;
        self.pending_request = None;
        self.updated_at = Utc::now();
    }

    /// Terminate the instance without running further steps.
    pub fn abandon(&mut self) {
        self.status = WorkflowStatus::Abandoned;
        self.pending_request = None;
        self.updated_at = Utc::now();
    }

    /// The most recent step output, if any step has completed.
    pub fn last_output(&self) -> Option<&str> {
        self.step_outputs.last().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_instance() -> WorkflowInstance {
        WorkflowInstance::new("sess-1", "recruiting")
    }

    #[test]
    fn test_workflow_status_roundtrip() {
        for status in [
            WorkflowStatus::Running,
            WorkflowStatus::AwaitingInput,
            WorkflowStatus::Completed,
            WorkflowStatus::Abandoned,
        ] {
            let s = status.to_string();
            let parsed: WorkflowStatus = s.parse().unwrap();
            assert_eq!(status, parsed);
        }
    }

    #[test]
    fn test_workflow_status_serde() {
        let json = serde_json::to_string(&WorkflowStatus::AwaitingInput).unwrap();
        assert_eq!(json, "\"awaiting_input\"");
        let parsed: WorkflowStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, WorkflowStatus::AwaitingInput);
    }

    #[test]
    fn test_workflow_status_active_terminal() {
        assert!(WorkflowStatus::Running.is_active());
        assert!(WorkflowStatus::AwaitingInput.is_active());
        assert!(!WorkflowStatus::Completed.is_active());
        assert!(WorkflowStatus::Abandoned.is_terminal());
        assert!(!WorkflowStatus::AwaitingInput.is_terminal());
    }

    #[test]
    fn test_new_instance_invariant() {
        let instance = sample_instance();
        assert_eq!(instance.current_step_index, 0);
        assert!(instance.step_outputs.is_empty());
        assert_eq!(instance.status, WorkflowStatus::Running);
        assert!(instance.pending_request.is_none());
        assert!(instance.is_active());
    }

    #[test]
    fn test_suspend_tracks_outputs() {
        let mut instance = sample_instance();
        instance.suspend(
            "draft".to_string(),
            PendingRequest {
                step_name: "draft_description".to_string(),
                rendered_output: "draft".to_string(),
                prompt_text: "say 'proceed' to continue".to_string(),
            },
        );

        assert_eq!(instance.status, WorkflowStatus::AwaitingInput);
        assert_eq!(instance.current_step_index, 1);
        assert_eq!(instance.step_outputs, vec!["draft".to_string()]);
        assert!(instance.pending_request.is_some());
    }

    #[test]
    fn test_complete_clears_pending() {
        let mut instance = sample_instance();
        instance.suspend(
            "a".to_string(),
            PendingRequest {
                step_name: "first".to_string(),
                rendered_output: "a".to_string(),
                prompt_text: "ok?".to_string(),
            },
        );
        instance.complete("b".to_string());

        assert_eq!(instance.status, WorkflowStatus::Completed);
        assert_eq!(instance.current_step_index, 2);
        assert!(instance.pending_request.is_none());
        assert_eq!(instance.last_output(), Some("b"));
    }

    #[test]
    fn test_abandon_keeps_outputs() {
        let mut instance = sample_instance();
        instance.suspend(
            "a".to_string(),
            PendingRequest {
                step_name: "first".to_string(),
                rendered_output: "a".to_string(),
                prompt_text: "ok?".to_string(),
            },
        );
        instance.abandon();

        assert_eq!(instance.status, WorkflowStatus::Abandoned);
        assert_eq!(instance.step_outputs.len(), 1);
        assert!(instance.pending_request.is_none());
        assert!(!instance.is_active());
    }

    #[test]
    fn test_instance_json_roundtrip() {
        let mut instance = sample_instance();
        instance.suspend(
            "jd text".to_string(),
            PendingRequest {
                step_name: "draft_description".to_string(),
                rendered_output: "jd text".to_string(),
                prompt_text: "changes, or 'proceed'?".to_string(),
            },
        );

        let json = serde_json::to_string(&instance).unwrap();
        let parsed: WorkflowInstance = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.instance_id, instance.instance_id);
        assert_eq!(parsed.session_id, "sess-1");
        assert_eq!(parsed.definition_key, "recruiting");
        assert_eq!(parsed.current_step_index, 1);
        assert_eq!(parsed.step_outputs, instance.step_outputs);
        assert_eq!(parsed.status, WorkflowStatus::AwaitingInput);
        assert_eq!(parsed.pending_request, instance.pending_request);
    }

    #[test]
    fn test_pending_request_serde() {
        let pending = PendingRequest {
            step_name: "match_candidates".to_string(),
            rendered_output: "| Candidate | Score |".to_string(),
            prompt_text: "send outreach?".to_string(),
        };
        let json = serde_json::to_string(&pending).unwrap();
        assert!(json.contains("match_candidates"));
        let parsed: PendingRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, pending);
    }
}
