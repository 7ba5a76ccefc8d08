//! HTTP chat-completion step handler.
//!
//! Calls an OpenAI-compatible `/chat/completions` endpoint with a fixed
//! per-step instruction as the system message and the accumulated payload
//! as the user message. The engine sees only text in, text out.

use anyhow::Context;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use handrail_core::workflow::registry::StepHandler;
use handrail_types::config::CompletionConfig;
use handrail_types::error::StepError;

/// Request timeout for a single completion call.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(120);

/// Step handler backed by an OpenAI-compatible completion endpoint.
///
/// Derives Debug via `secrecy::SecretString`, whose Debug impl redacts the
/// API key as `[REDACTED]`, so this does not expose the secret.
#[derive(Debug)]
pub struct HttpCompletionHandler {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: SecretString,
    /// Per-step system instructions (e.g. "You write job descriptions...").
    instructions: String,
}

impl HttpCompletionHandler {
    /// Build a handler from the completion config, reading the API key from
    /// the environment variable the config names.
    pub fn from_config(
        config: &CompletionConfig,
        instructions: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .with_context(|| format!("missing API key env var '{}'", config.api_key_env))?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_key: SecretString::from(api_key),
            instructions: instructions.into(),
        })
    }

    fn endpoint_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// StepHandler implementation
// ---------------------------------------------------------------------------

impl StepHandler for HttpCompletionHandler {
    async fn invoke(&self, payload: &str) -> Result<String, StepError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.instructions,
                },
                ChatMessage {
                    role: "user",
                    content: payload,
                },
            ],
        };

        let response = self
            .client
            .post(self.endpoint_url())
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| StepError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StepError::Invocation(format!(
                "completion endpoint returned {status}: {body}"
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| StepError::Invocation(format!("invalid completion response: {e}")))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| StepError::Invocation("completion response was empty".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_handler(base_url: &str) -> HttpCompletionHandler {
        HttpCompletionHandler {
            client: reqwest::Client::new(),
            base_url: base_url.to_string(),
            model: "gpt-4.1".to_string(),
            api_key: SecretString::from("test-key"),
            instructions: "You write job descriptions.".to_string(),
        }
    }

    #[test]
    fn test_endpoint_url_joins_cleanly() {
        assert_eq!(
            test_handler("https://api.example.com/v1").endpoint_url(),
            "https://api.example.com/v1/chat/completions"
        );
        assert_eq!(
            test_handler("https://api.example.com/v1/").endpoint_url(),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_from_config_requires_api_key_env() {
        let config = CompletionConfig {
            base_url: "https://api.example.com/v1".to_string(),
            model: "gpt-4.1".to_string(),
            api_key_env: "HANDRAIL_TEST_KEY_THAT_DOES_NOT_EXIST".to_string(),
        };
        let err = HttpCompletionHandler::from_config(&config, "instructions").unwrap_err();
        assert!(err.to_string().contains("HANDRAIL_TEST_KEY_THAT_DOES_NOT_EXIST"));
    }

    #[test]
    fn test_request_serialization_shape() {
        let request = ChatRequest {
            model: "gpt-4.1",
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "instructions",
                },
                ChatMessage {
                    role: "user",
                    content: "payload",
                },
            ],
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"model\":\"gpt-4.1\""));
        assert!(json.contains("\"role\":\"system\""));
        assert!(json.contains("\"role\":\"user\""));
    }
}
