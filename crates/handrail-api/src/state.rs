//! Application state wiring all services together.
//!
//! AppState holds the concrete chat service used by the HTTP handlers.
//! Services are generic over repository traits, but AppState pins them to
//! the storage backends selected once at startup.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use handrail_core::chat::service::ChatService;
use handrail_core::router::MessageRouter;
use handrail_core::workflow::engine::WorkflowEngine;
use handrail_infra::config::load_global_config;
use handrail_infra::resolve_data_dir;
use handrail_infra::sqlite::pool::default_database_url;
use handrail_infra::storage::{CheckpointStore, SessionStore, StorageRuntime};
use handrail_types::config::GlobalConfig;

use crate::pipeline;

/// Concrete type alias for the service generics pinned to the selected
/// storage backends.
pub type ConcreteChatService = ChatService<Arc<CheckpointStore>, SessionStore>;

/// Shared application state holding the chat service and transport config.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ConcreteChatService>,
    pub config: Arc<GlobalConfig>,
    /// When each session's current pending request was emitted; used to
    /// expire unanswered requests after the configured TTL.
    pub pending_since: Arc<DashMap<String, Instant>>,
}

impl AppState {
    /// Initialize the application state: storage, registries, engine.
    pub async fn init(database_url: Option<&str>) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_global_config(&data_dir).await;

        let url = database_url
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}?mode=rwc", default_database_url()));
        let storage = StorageRuntime::connect(&url).await;

        let definitions = pipeline::build_definitions(config.completion.as_ref())?;
        let replies = pipeline::build_reply_handlers(config.completion.as_ref())?;

        let engine = WorkflowEngine::new(Arc::new(definitions), storage.checkpoints);
        let chat = ChatService::new(
            engine,
            storage.sessions,
            MessageRouter::default(),
            replies,
        );

        Ok(Self {
            chat: Arc::new(chat),
            config: Arc::new(config),
            pending_since: Arc::new(DashMap::new()),
        })
    }

    /// TTL for unanswered pending requests.
    pub fn pending_ttl(&self) -> Duration {
        Duration::from_secs(self.config.pending_request_ttl_secs)
    }

    /// Whether the session's pending request has outlived its TTL.
    pub fn pending_expired(&self, session_id: &str) -> bool {
        self.pending_since
            .get(session_id)
            .is_some_and(|since| since.elapsed() > self.pending_ttl())
    }

    /// Record that a pending request was just (re-)emitted for a session.
    pub fn mark_pending(&self, session_id: &str) {
        self.pending_since.insert(session_id.to_string(), Instant::now());
    }

    /// Clear pending tracking once a workflow completes or is abandoned.
    pub fn clear_pending(&self, session_id: &str) {
        self.pending_since.remove(session_id);
    }
}
