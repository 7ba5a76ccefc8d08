//! Step handler trait and the immutable step registry.
//!
//! A workflow definition is a fixed, ordered list of named steps built once
//! at startup. Handlers are external "step functions": they take the
//! accumulated payload as opaque text and asynchronously produce a result.
//! The builder rejects duplicate step names so there is never ambiguity
//! about order or registration.
//!
//! `StepHandler` uses RPITIT (native async fn in traits, Rust 2024 edition),
//! so it is not object-safe. `BoxStepHandler` provides type-erased dispatch
//! via the same blanket-impl pattern as the other boxed traits in this
//! codebase: an object-safe `StepHandlerDyn` with boxed futures, blanket
//! implemented for every `StepHandler`.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use handrail_types::error::StepError;

// ---------------------------------------------------------------------------
// StepHandler
// ---------------------------------------------------------------------------

/// An external unit of work in a workflow.
///
/// The engine treats the payload and result as opaque text; whether the
/// handler calls a language model, a search index, or nothing at all is
/// invisible to the state machine. Handlers are never retried -- a failure
/// abandons the instance.
pub trait StepHandler: Send + Sync {
    /// Run the step on the accumulated payload.
    fn invoke(
        &self,
        payload: &str,
    ) -> impl Future<Output = Result<String, StepError>> + Send;
}

/// Object-safe version of [`StepHandler`] with boxed futures.
pub trait StepHandlerDyn: Send + Sync {
    fn invoke_boxed<'a>(
        &'a self,
        payload: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, StepError>> + Send + 'a>>;
}

/// Blanket implementation: any `StepHandler` automatically implements
/// `StepHandlerDyn`.
impl<T: StepHandler> StepHandlerDyn for T {
    fn invoke_boxed<'a>(
        &'a self,
        payload: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, StepError>> + Send + 'a>> {
        Box::pin(self.invoke(payload))
    }
}

/// Type-erased step handler for heterogeneous registries.
pub struct BoxStepHandler {
    inner: Box<dyn StepHandlerDyn>,
}

impl BoxStepHandler {
    /// Wrap a concrete `StepHandler` in a type-erased box.
    pub fn new<T: StepHandler + 'static>(handler: T) -> Self {
        Self {
            inner: Box::new(handler),
        }
    }

    /// Run the step on the accumulated payload.
    pub async fn invoke(&self, payload: &str) -> Result<String, StepError> {
        self.inner.invoke_boxed(payload).await
    }
}

impl std::fmt::Debug for BoxStepHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxStepHandler").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Workflow definition
// ---------------------------------------------------------------------------

/// One named step in a workflow definition.
#[derive(Debug)]
pub struct StepEntry {
    /// Step name, unique within a definition (e.g. "draft_description").
    pub name: String,
    /// The confirmation question shown alongside the step's output.
    pub prompt_text: String,
    /// The handler invoked with the accumulated payload.
    pub handler: BoxStepHandler,
}

/// An ordered, immutable sequence of named steps.
///
/// Built once at startup via [`WorkflowDefinitionBuilder`]; shared read-only
/// across all instances through `Arc`.
#[derive(Debug)]
pub struct WorkflowDefinition {
    key: String,
    steps: Vec<StepEntry>,
}

impl WorkflowDefinition {
    /// Registry key of this definition.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the definition has no steps. Never true for built definitions.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The step at `index`, if it exists.
    pub fn step(&self, index: usize) -> Option<&StepEntry> {
        self.steps.get(index)
    }

    /// Whether `index` is the final step.
    pub fn is_last(&self, index: usize) -> bool {
        index + 1 == self.steps.len()
    }
}

/// Builder for [`WorkflowDefinition`] that rejects duplicate step names.
pub struct WorkflowDefinitionBuilder {
    key: String,
    steps: Vec<StepEntry>,
}

impl WorkflowDefinitionBuilder {
    /// Start a definition with the given registry key.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step. Order of calls is execution order.
    pub fn step(
        mut self,
        name: impl Into<String>,
        prompt_text: impl Into<String>,
        handler: BoxStepHandler,
    ) -> Self {
        self.steps.push(StepEntry {
            name: name.into(),
            prompt_text: prompt_text.into(),
            handler,
        });
        self
    }

    /// Finalize the definition.
    pub fn build(self) -> Result<WorkflowDefinition, RegistryError> {
        if self.steps.is_empty() {
            return Err(RegistryError::EmptyDefinition(self.key));
        }
        let mut seen = std::collections::HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.name.as_str()) {
                return Err(RegistryError::DuplicateStep {
                    definition: self.key,
                    step: step.name.clone(),
                });
            }
        }
        Ok(WorkflowDefinition {
            key: self.key,
            steps: self.steps,
        })
    }
}

// ---------------------------------------------------------------------------
// Registries
// ---------------------------------------------------------------------------

/// All workflow definitions known to the engine, keyed by definition key.
///
/// Populated once at startup; lookups hand out shared `Arc`s.
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    definitions: HashMap<String, Arc<WorkflowDefinition>>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition. Fails on a duplicate key.
    pub fn register(&mut self, definition: WorkflowDefinition) -> Result<(), RegistryError> {
        let key = definition.key().to_string();
        if self.definitions.contains_key(&key) {
            return Err(RegistryError::DuplicateDefinition(key));
        }
        self.definitions.insert(key, Arc::new(definition));
        Ok(())
    }

    /// Look up a definition by key.
    pub fn get(&self, key: &str) -> Option<Arc<WorkflowDefinition>> {
        self.definitions.get(key).cloned()
    }
}

/// Standalone specialist handlers addressed by the router outside any
/// workflow (greetings, feedback lookups, clarification).
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, BoxStepHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a direct-reply handler under `key`. Fails on duplicates.
    pub fn register(
        &mut self,
        key: impl Into<String>,
        handler: BoxStepHandler,
    ) -> Result<(), RegistryError> {
        let key = key.into();
        if self.handlers.contains_key(&key) {
            return Err(RegistryError::DuplicateHandler(key));
        }
        self.handlers.insert(key, handler);
        Ok(())
    }

    /// Look up a handler by key.
    pub fn get(&self, key: &str) -> Option<&BoxStepHandler> {
        self.handlers.get(key)
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors raised while building registries at startup.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("definition '{definition}' declares step '{step}' more than once")]
    DuplicateStep { definition: String, step: String },

    #[error("definition '{0}' has no steps")]
    EmptyDefinition(String),

    #[error("definition key '{0}' is already registered")]
    DuplicateDefinition(String),

    #[error("handler key '{0}' is already registered")]
    DuplicateHandler(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
