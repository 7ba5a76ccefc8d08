use thiserror::Error;

use crate::workflow::PendingRequest;

/// Errors from repository operations (used by trait definitions in handrail-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors produced by a step handler invocation.
///
/// Handlers are not retried; any failure abandons the workflow instance
/// and the detail is surfaced to the caller.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("handler invocation failed: {0}")]
    Invocation(String),

    #[error("handler backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by the workflow engine entry points.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A workflow is already running or awaiting input for this session.
    #[error("a workflow is already active for this session")]
    AlreadyActive,

    /// Resume was called with no instance awaiting input.
    #[error("no workflow is awaiting input for this session")]
    NoActiveWorkflow,

    /// No checkpoint exists for this session.
    #[error("no workflow state found for this session")]
    NotFound,

    /// The instance references a definition key the registry does not know.
    #[error("unknown workflow definition: '{0}'")]
    UnknownDefinition(String),

    /// A step handler returned an error; the instance was abandoned.
    #[error("step '{step_name}' failed: {detail}")]
    StepHandler { step_name: String, detail: String },

    /// The resume payload matched neither an approval nor a cancellation.
    ///
    /// Carries the unchanged pending request so the caller can re-emit it.
    #[error("response not recognized as an approval or a cancellation")]
    UnrecognizedResponse { pending: PendingRequest },

    /// A checkpoint or session write failed; no state advance was reported.
    #[error("persistence error: {0}")]
    Persistence(#[from] RepositoryError),
}
