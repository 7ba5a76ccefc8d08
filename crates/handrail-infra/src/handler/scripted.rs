//! Deterministic handlers for offline mode and tests.
//!
//! When no completion endpoint is configured, the demo pipeline runs on
//! these: each step renders a fixed template around its input instead of
//! calling a model.

use handrail_core::workflow::registry::StepHandler;
use handrail_types::error::StepError;

/// Placeholder substituted with the incoming payload.
const PAYLOAD_SLOT: &str = "{payload}";

/// Renders a fixed template around the incoming payload.
#[derive(Debug, Clone)]
pub struct ScriptedStepHandler {
    template: String,
}

impl ScriptedStepHandler {
    /// `template` may contain `{payload}`, replaced with the step input.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl StepHandler for ScriptedStepHandler {
    async fn invoke(&self, payload: &str) -> Result<String, StepError> {
        Ok(self.template.replace(PAYLOAD_SLOT, payload))
    }
}

/// Always replies with the same text, ignoring the payload.
///
/// Used for greeting and clarification direct-reply handlers.
#[derive(Debug, Clone)]
pub struct StaticReplyHandler {
    text: String,
}

impl StaticReplyHandler {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl StepHandler for StaticReplyHandler {
    async fn invoke(&self, _payload: &str) -> Result<String, StepError> {
        Ok(self.text.clone())
    }
}
