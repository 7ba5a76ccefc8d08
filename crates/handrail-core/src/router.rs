//! Inbound message routing.
//!
//! Classifies a free-form message against the session's engine state. The
//! single load-bearing rule: while a workflow is pending, every message is
//! the awaited response -- no intent classification runs, so a stray
//! keyword can never skip or reorder steps. Only with no open workflow does
//! the fixed intent table pick a start-workflow or direct-reply target,
//! with a clarification handler as the fallback.

use uuid::Uuid;

/// What to do with an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAction {
    /// Start a new instance of the named workflow definition.
    StartWorkflow { definition_key: String },
    /// Deliver the message as the awaited response to the open workflow.
    ResumeWorkflow,
    /// Dispatch to a standalone specialist handler.
    DirectReply { handler_key: String },
}

/// How a rule's keywords are matched against the lowercased message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// The whole message equals a keyword (greetings).
    Exact,
    /// The message contains a keyword anywhere.
    Contains,
}

/// One entry in the intent table.
#[derive(Debug, Clone)]
pub struct IntentRule {
    /// Intent name, for logging.
    pub intent: String,
    pub mode: MatchMode,
    pub keywords: Vec<String>,
    pub action: RouteAction,
}

impl IntentRule {
    fn matches(&self, lowered: &str) -> bool {
        match self.mode {
            MatchMode::Exact => self.keywords.iter().any(|k| lowered == k),
            MatchMode::Contains => self.keywords.iter().any(|k| lowered.contains(k.as_str())),
        }
    }
}

/// Keyword-table router with the open-workflow priority rule.
///
/// Rules are evaluated in order; the first match wins. Earlier rules
/// therefore override later ones, mirroring the keyword-override priority
/// of the original routing instructions.
#[derive(Debug, Clone)]
pub struct MessageRouter {
    rules: Vec<IntentRule>,
    fallback_handler: String,
}

impl MessageRouter {
    /// Build a router from an ordered rule table and a fallback handler key.
    pub fn new(rules: Vec<IntentRule>, fallback_handler: impl Into<String>) -> Self {
        Self {
            rules,
            fallback_handler: fallback_handler.into(),
        }
    }

    /// Classify a message given the session's active workflow reference.
    ///
    /// `active_workflow` comes from the session store; when it is non-empty
    /// the result is always `ResumeWorkflow`.
    pub fn route(&self, active_workflow: Option<Uuid>, message: &str) -> RouteAction {
        if active_workflow.is_some() {
            return RouteAction::ResumeWorkflow;
        }

        let lowered = message.trim().to_lowercase();
        for rule in &self.rules {
            if rule.matches(&lowered) {
                tracing::debug!(intent = rule.intent.as_str(), "intent matched");
                return rule.action.clone();
            }
        }

        RouteAction::DirectReply {
            handler_key: self.fallback_handler.clone(),
        }
    }
}

impl Default for MessageRouter {
    /// The recruiting assistant's intent table.
    ///
    /// Feedback and greeting rules come before the hiring rule so their
    /// keywords always win, matching the keyword-override priority of the
    /// original assistant.
    fn default() -> Self {
        let rules = vec![
            IntentRule {
                intent: "greeting".to_string(),
                mode: MatchMode::Exact,
                keywords: ["hi", "hello", "hey", "start"]
                    .map(String::from)
                    .to_vec(),
                action: RouteAction::DirectReply {
                    handler_key: "greeting".to_string(),
                },
            },
            IntentRule {
                intent: "insights".to_string(),
                mode: MatchMode::Contains,
                keywords: ["feedback", "interview", "history", "assessment"]
                    .map(String::from)
                    .to_vec(),
                action: RouteAction::DirectReply {
                    handler_key: "insights".to_string(),
                },
            },
            IntentRule {
                intent: "research".to_string(),
                mode: MatchMode::Contains,
                keywords: ["salary", "market", "trend", "research"]
                    .map(String::from)
                    .to_vec(),
                action: RouteAction::DirectReply {
                    handler_key: "research".to_string(),
                },
            },
            IntentRule {
                intent: "recruiting".to_string(),
                mode: MatchMode::Contains,
                keywords: [
                    "hire",
                    "hiring",
                    "i need a",
                    "role",
                    "position",
                    "job description",
                    "candidate",
                    "recruit",
                ]
                .map(String::from)
                .to_vec(),
                action: RouteAction::StartWorkflow {
                    definition_key: "recruiting".to_string(),
                },
            },
        ];

        Self::new(rules, "clarify")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_workflow_always_resumes() {
        let router = MessageRouter::default();
        let active = Some(Uuid::now_v7());

        // Even messages matching unrelated intent keywords resume the
        // open workflow.
        for message in [
            "hi",
            "I need a data engineer",
            "any interview feedback?",
            "what's the weather",
            "proceed",
        ] {
            assert_eq!(
                router.route(active, message),
                RouteAction::ResumeWorkflow,
                "message: {message}"
            );
        }
    }

    #[test]
    fn test_hiring_intent_starts_workflow() {
        let router = MessageRouter::default();
        let action = router.route(None, "I'm hiring a senior backend engineer");
        assert_eq!(
            action,
            RouteAction::StartWorkflow {
                definition_key: "recruiting".to_string()
            }
        );
    }

    #[test]
    fn test_greeting_is_exact_match_only() {
        let router = MessageRouter::default();

        assert_eq!(
            router.route(None, "Hi"),
            RouteAction::DirectReply {
                handler_key: "greeting".to_string()
            }
        );
        // "hiring" contains "hi" but is not a greeting.
        assert_eq!(
            router.route(None, "hiring now"),
            RouteAction::StartWorkflow {
                definition_key: "recruiting".to_string()
            }
        );
    }

    #[test]
    fn test_feedback_keyword_overrides_hiring() {
        let router = MessageRouter::default();
        // Mentions a role but asks for interview feedback: the earlier
        // rule wins.
        let action = router.route(None, "show interview feedback for the engineer role");
        assert_eq!(
            action,
            RouteAction::DirectReply {
                handler_key: "insights".to_string()
            }
        );
    }

    #[test]
    fn test_unmatched_falls_back_to_clarification() {
        let router = MessageRouter::default();
        let action = router.route(None, "what's the weather like today");
        assert_eq!(
            action,
            RouteAction::DirectReply {
                handler_key: "clarify".to_string()
            }
        );
    }

    #[test]
    fn test_custom_rule_table() {
        let router = MessageRouter::new(
            vec![IntentRule {
                intent: "deploy".to_string(),
                mode: MatchMode::Contains,
                keywords: vec!["deploy".to_string()],
                action: RouteAction::StartWorkflow {
                    definition_key: "release".to_string(),
                },
            }],
            "help",
        );

        assert_eq!(
            router.route(None, "deploy the api"),
            RouteAction::StartWorkflow {
                definition_key: "release".to_string()
            }
        );
        assert_eq!(
            router.route(None, "anything else"),
            RouteAction::DirectReply {
                handler_key: "help".to_string()
            }
        );
    }
}
