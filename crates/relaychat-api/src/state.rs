//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both the CLI and the
//! relay server. Core services are generic over provider/repository traits;
//! AppState pins them to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use relaychat_core::chat::service::SessionService;
use relaychat_core::relay::cache::ConversationCache;
use relaychat_core::relay::engine::RelayEngine;
use relaychat_infra::llm::ollama::OllamaProvider;
use relaychat_infra::sqlite::pool::{database_url, DatabasePool};
use relaychat_infra::sqlite::session::SqliteSessionRepository;
use relaychat_types::config::GlobalConfig;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteRelayEngine = RelayEngine<OllamaProvider>;

pub type ConcreteSessionService = SessionService<SqliteSessionRepository>;

/// Shared application state holding all services.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<ConcreteRelayEngine>,
    pub session_service: Arc<ConcreteSessionService>,
    pub cache: Arc<ConversationCache>,
    pub config: Arc<GlobalConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: connect to DB, wire services.
    pub async fn init(data_dir: PathBuf, config: GlobalConfig) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&data_dir).await?;

        let db_pool = DatabasePool::new(&database_url(&data_dir)).await?;

        // One cache shared by the relay (history fallback) and the session
        // service (listing fallback, unsaved drafts).
        let cache = Arc::new(ConversationCache::new(config.session.cache_capacity));

        let provider = OllamaProvider::new(&config.upstream)?;
        let relay = RelayEngine::new(
            provider,
            config.upstream.model.clone(),
            config.session.greeting.clone(),
            Arc::clone(&cache),
        );

        let session_service = SessionService::with_cache(
            SqliteSessionRepository::new(db_pool.clone()),
            Arc::clone(&cache),
        );

        Ok(Self {
            relay: Arc::new(relay),
            session_service: Arc::new(session_service),
            cache,
            config: Arc::new(config),
            data_dir,
            db_pool,
        })
    }
}
