use std::sync::Arc;

use crate::auth::{SessionStore, UserStore};
use crate::config::Config;
use crate::llm_client::GenerationBackend;

/// Shared application state injected into all route handlers via Axum extractors.
/// Everything here is either immutable after startup or internally synchronized.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Generation backend. Default: GeminiClient.
    pub llm: Arc<dyn GenerationBackend>,
    /// Pluggable user storage. Default: InMemoryUserStore.
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(
        config: Config,
        llm: Arc<dyn GenerationBackend>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        let sessions = Arc::new(SessionStore::new(config.session_ttl));
        Self {
            config,
            llm,
            users,
            sessions,
        }
    }
}
