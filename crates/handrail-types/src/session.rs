//! Session and conversation turn types for Handrail.
//!
//! A session is a caller-identified conversation context. It accumulates
//! turns and carries a reference to the active workflow instance, if any.
//! Sessions are created implicitly on first turn and never deleted by the
//! engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Maximum length of a derived session title.
const TITLE_MAX_LEN: usize = 50;

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnRole::User => write!(f, "user"),
            TurnRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for TurnRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(TurnRole::User),
            "assistant" => Ok(TurnRole::Assistant),
            other => Err(format!("invalid turn role: '{other}'")),
        }
    }
}

/// A single message within a session, ordered by `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: Uuid,
    pub session_id: String,
    pub role: TurnRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// Build a turn with a fresh UUIDv7 and the current timestamp.
    pub fn new(session_id: impl Into<String>, role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            session_id: session_id.into(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// A conversation context keyed by caller-supplied session id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    /// Display title, derived from the first user turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// The open workflow instance, if one is running or awaiting input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_instance_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Create an empty record for a new session.
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            title: None,
            active_instance_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Derive a session title from the first user message.
///
/// Truncates to 50 characters on a char boundary and appends an ellipsis.
pub fn derive_title(first_message: &str) -> String {
    let trimmed = first_message.trim();
    if trimmed.chars().count() <= TITLE_MAX_LEN {
        trimmed.to_string()
    } else {
        let truncated: String = trimmed.chars().take(TITLE_MAX_LEN).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_role_roundtrip() {
        for role in [TurnRole::User, TurnRole::Assistant] {
            let s = role.to_string();
            let parsed: TurnRole = s.parse().unwrap();
            assert_eq!(role, parsed);
        }
    }

    #[test]
    fn test_turn_role_serde() {
        let json = serde_json::to_string(&TurnRole::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }

    #[test]
    fn test_turn_new_fields() {
        let turn = Turn::new("sess-1", TurnRole::User, "find me a backend engineer");
        assert_eq!(turn.session_id, "sess-1");
        assert_eq!(turn.role, TurnRole::User);
        assert_eq!(turn.content, "find me a backend engineer");
    }

    #[test]
    fn test_turn_json_roundtrip() {
        let turn = Turn::new("sess-1", TurnRole::Assistant, "here is the draft");
        let json = serde_json::to_string(&turn).unwrap();
        let parsed: Turn = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, turn.id);
        assert_eq!(parsed.content, "here is the draft");
    }

    #[test]
    fn test_session_record_defaults() {
        let record = SessionRecord::new("sess-1");
        assert_eq!(record.session_id, "sess-1");
        assert!(record.title.is_none());
        assert!(record.active_instance_id.is_none());
    }

    #[test]
    fn test_derive_title_short_message() {
        assert_eq!(derive_title("Hire a data engineer"), "Hire a data engineer");
    }

    #[test]
    fn test_derive_title_truncates_long_message() {
        let long = "a".repeat(80);
        let title = derive_title(&long);
        assert_eq!(title.chars().count(), 53);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn test_derive_title_trims_whitespace() {
        assert_eq!(derive_title("  hello  "), "hello");
    }
}
