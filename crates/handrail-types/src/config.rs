//! Global configuration types for Handrail.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls the
//! pending-request time-to-live and the outbound completion endpoint used
//! by the HTTP step handler.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the Handrail engine.
///
/// Loaded from `~/.handrail/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Seconds an unanswered pending request stays valid before the
    /// transport cancels the workflow on the next inbound message.
    #[serde(default = "default_pending_ttl_secs")]
    pub pending_request_ttl_secs: u64,

    /// Maximum turns returned by the history endpoint per request.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,

    /// Outbound chat-completion endpoint for HTTP step handlers.
    /// When absent, scripted handlers are used instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<CompletionConfig>,
}

fn default_pending_ttl_secs() -> u64 {
    120
}

fn default_history_limit() -> u32 {
    200
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            pending_request_ttl_secs: default_pending_ttl_secs(),
            history_limit: default_history_limit(),
            completion: None,
        }
    }
}

/// OpenAI-compatible chat-completion endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Base URL of the endpoint (e.g. "https://api.example.com/v1").
    pub base_url: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_api_key_env() -> String {
    "HANDRAIL_API_KEY".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_config_default_values() {
        let config = GlobalConfig::default();
        assert_eq!(config.pending_request_ttl_secs, 120);
        assert_eq!(config.history_limit, 200);
        assert!(config.completion.is_none());
    }

    #[test]
    fn test_global_config_deserialize_with_defaults() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config.pending_request_ttl_secs, 120);
        assert!(config.completion.is_none());
    }

    #[test]
    fn test_global_config_deserialize_with_values() {
        let toml_str = r#"
pending_request_ttl_secs = 300
history_limit = 50

[completion]
base_url = "https://api.core42.ai/v1"
model = "gpt-4.1"
"#;
        let config: GlobalConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.pending_request_ttl_secs, 300);
        assert_eq!(config.history_limit, 50);
        let completion = config.completion.unwrap();
        assert_eq!(completion.base_url, "https://api.core42.ai/v1");
        assert_eq!(completion.model, "gpt-4.1");
        assert_eq!(completion.api_key_env, "HANDRAIL_API_KEY");
    }

    #[test]
    fn test_global_config_serde_roundtrip() {
        let config = GlobalConfig {
            pending_request_ttl_secs: 60,
            history_limit: 100,
            completion: Some(CompletionConfig {
                base_url: "https://example.test/v1".to_string(),
                model: "gpt-4.1".to_string(),
                api_key_env: "MY_KEY".to_string(),
            }),
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: GlobalConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.pending_request_ttl_secs, 60);
        assert_eq!(parsed.completion.unwrap().api_key_env, "MY_KEY");
    }
}
