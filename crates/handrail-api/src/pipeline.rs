//! Wiring for the recruiting pipeline and its specialist handlers.
//!
//! Three steps with a human checkpoint after each: draft a job description,
//! match candidates, draft outreach. With a completion endpoint configured
//! the steps call the model; otherwise deterministic scripted handlers keep
//! the engine fully usable offline.

use handrail_core::workflow::registry::{
    BoxStepHandler, DefinitionRegistry, HandlerRegistry, WorkflowDefinitionBuilder,
};
use handrail_infra::handler::http::HttpCompletionHandler;
use handrail_infra::handler::scripted::{ScriptedStepHandler, StaticReplyHandler};
use handrail_types::config::CompletionConfig;

/// Definition key the router starts for hiring intents.
pub const RECRUITING_KEY: &str = "recruiting";

const DRAFT_INSTRUCTIONS: &str = "You are a recruiting assistant. Write a detailed, \
    well-structured job description for the role described by the user. Include \
    responsibilities, required skills, and nice-to-haves. If the input carries \
    requested changes, apply them to the draft.";

const MATCH_INSTRUCTIONS: &str = "You are a recruiting assistant. Given a job \
    description, produce a comparison table of the five best-matching candidates \
    with name, key skills, and match rationale.";

const OUTREACH_INSTRUCTIONS: &str = "You are a recruiting assistant. Given a job \
    description and a candidate comparison, draft short personalized outreach \
    emails to the selected candidates.";

const GREETING_TEXT: &str = "Welcome to Handrail! I help with hiring: describing a \
    role, matching candidates, and drafting outreach. What role are you hiring for?";

const CLARIFY_TEXT: &str = "I'm a recruiting assistant and can only help with \
    hiring-related tasks. What role are you looking to fill?";

const INSIGHTS_INSTRUCTIONS: &str = "You are a recruiting assistant. Answer the \
    user's question about interview feedback and candidate history.";

const RESEARCH_INSTRUCTIONS: &str = "You are a recruiting assistant. Answer the \
    user's question about salaries, market trends, or companies.";

fn step_handler(
    completion: Option<&CompletionConfig>,
    instructions: &str,
    offline_template: &str,
) -> anyhow::Result<BoxStepHandler> {
    Ok(match completion {
        Some(config) => BoxStepHandler::new(HttpCompletionHandler::from_config(
            config,
            instructions,
        )?),
        None => BoxStepHandler::new(ScriptedStepHandler::new(offline_template)),
    })
}

/// Build the definition registry with the recruiting pipeline.
pub fn build_definitions(
    completion: Option<&CompletionConfig>,
) -> anyhow::Result<DefinitionRegistry> {
    let definition = WorkflowDefinitionBuilder::new(RECRUITING_KEY)
        .step(
            "draft_description",
            "Let me know if you'd like any changes, or say 'proceed' to match candidates.",
            step_handler(
                completion,
                DRAFT_INSTRUCTIONS,
                "## Draft job description\n\nRole request: {payload}",
            )?,
        )
        .step(
            "match_candidates",
            "Say 'send' to draft outreach to the top candidates, or 'cancel' to stop.",
            step_handler(
                completion,
                MATCH_INSTRUCTIONS,
                "## Candidate matches\n\nBased on: {payload}",
            )?,
        )
        .step(
            "draft_outreach",
            "",
            step_handler(
                completion,
                OUTREACH_INSTRUCTIONS,
                "## Outreach drafts\n\nPrepared from: {payload}",
            )?,
        )
        .build()?;

    let mut registry = DefinitionRegistry::new();
    registry.register(definition)?;
    Ok(registry)
}

/// Build the direct-reply handler registry the router dispatches to.
pub fn build_reply_handlers(
    completion: Option<&CompletionConfig>,
) -> anyhow::Result<HandlerRegistry> {
    let mut registry = HandlerRegistry::new();

    registry.register("greeting", BoxStepHandler::new(StaticReplyHandler::new(GREETING_TEXT)))?;
    registry.register("clarify", BoxStepHandler::new(StaticReplyHandler::new(CLARIFY_TEXT)))?;
    registry.register(
        "insights",
        step_handler(
            completion,
            INSIGHTS_INSTRUCTIONS,
            "No interview feedback is recorded yet for: {payload}",
        )?,
    )?;
    registry.register(
        "research",
        step_handler(
            completion,
            RESEARCH_INSTRUCTIONS,
            "Market research is unavailable offline. Asked: {payload}",
        )?,
    )?;

    Ok(registry)
}
