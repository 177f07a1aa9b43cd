//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST API.
//! Services are generic over repository traits; AppState pins them to the
//! SQLite implementations.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use persona_core::chat::review::ReviewService;
use persona_core::chat::service::ChatService;
use persona_core::llm::BoxChatProvider;
use persona_infra::config::{load_global_config, resolve_provider_settings};
use persona_infra::filesystem::{ensure_data_dir, resolve_data_dir};
use persona_infra::llm::create_provider;
use persona_infra::sqlite::bot::SqliteBotConfigRepository;
use persona_infra::sqlite::pool::{DatabasePool, database_url};
use persona_infra::sqlite::transcript::SqliteTranscriptRepository;
use persona_types::config::GlobalConfig;

pub type ConcreteChatService = ChatService<SqliteBotConfigRepository, SqliteTranscriptRepository>;

pub type ConcreteReviewService = ReviewService<SqliteTranscriptRepository>;

/// How often live sessions are checked for idleness.
const IDLE_SWEEP_PERIOD: Duration = Duration::from_secs(60);

/// Shared application state holding all services.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ConcreteChatService>,
    pub review_service: Arc<ConcreteReviewService>,
    pub config: Arc<GlobalConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: load config, connect to DB, pick
    /// the provider, wire services.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        ensure_data_dir(&data_dir).await?;

        let config = load_global_config(&data_dir).await;
        let settings = resolve_provider_settings(&config, |k| std::env::var(k).ok());
        let provider = create_provider(&settings)?;

        let db_pool = DatabasePool::new(&database_url(&data_dir)).await?;

        let state = Self::assemble(data_dir, config, db_pool, provider);
        let max_idle = Duration::from_secs(state.config.session_idle_minutes.saturating_mul(60));
        ChatService::spawn_idle_sweep(&state.chat_service, max_idle, IDLE_SWEEP_PERIOD);
        tracing::debug!(
            idle_minutes = state.config.session_idle_minutes,
            "Idle session sweep started"
        );

        Ok(state)
    }

    /// Wire services over an already-open pool and provider.
    pub fn assemble(
        data_dir: PathBuf,
        config: GlobalConfig,
        db_pool: DatabasePool,
        provider: BoxChatProvider,
    ) -> Self {
        let transcripts = SqliteTranscriptRepository::new(db_pool.clone());
        let chat_service = ChatService::new(
            SqliteBotConfigRepository::new(db_pool.clone()),
            transcripts.clone(),
            Arc::new(provider),
            config.greeting.as_str(),
        );

        Self {
            chat_service: Arc::new(chat_service),
            review_service: Arc::new(ReviewService::new(transcripts)),
            config: Arc::new(config),
            data_dir,
            db_pool,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Test wiring: a temp SQLite database and a scripted provider.

    use std::sync::Mutex;

    use persona_core::llm::provider::ChatProvider;
    use persona_core::repository::bot::BotConfigRepository;
    use persona_infra::sqlite::bot::SqliteBotConfigRepository;
    use persona_types::bot::BotConfiguration;
    use persona_types::chat::ChatMessage;
    use persona_types::llm::{NormalizedResponse, ProviderError};

    use super::*;

    /// Replies with a fixed result to every call.
    pub struct ScriptedProvider {
        reply: Mutex<Result<NormalizedResponse, ProviderError>>,
    }

    impl ScriptedProvider {
        pub fn replying(reply: Result<NormalizedResponse, ProviderError>) -> Self {
            Self {
                reply: Mutex::new(reply),
            }
        }
    }

    impl ChatProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> Option<&str> {
            Some("scripted-1")
        }

        async fn generate(
            &self,
            _history: &[ChatMessage],
            _system_context: &str,
            _config: &BotConfiguration,
        ) -> Result<NormalizedResponse, ProviderError> {
            self.reply.lock().unwrap().clone()
        }
    }

    pub fn cabin_bot() -> BotConfiguration {
        BotConfiguration {
            publish_id: "cabin".to_string(),
            name: "Cabin helper".to_string(),
            role_description: "You help cabin guests.".to_string(),
            instructions: "Check-in at 15:00.".to_string(),
            example_questions: "Q: Wifi?\nA: On the fridge.".to_string(),
            is_active: true,
        }
    }

    /// State over a fresh database seeded with the `cabin` bot.
    pub async fn test_state(reply: Result<NormalizedResponse, ProviderError>) -> AppState {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().to_path_buf();
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);

        let pool = DatabasePool::new(&format!("{}?mode=rwc", database_url(&data_dir)))
            .await
            .unwrap();
        SqliteBotConfigRepository::new(pool.clone())
            .upsert(&cabin_bot())
            .await
            .unwrap();

        AppState::assemble(
            data_dir,
            GlobalConfig::default(),
            pool,
            BoxChatProvider::new(ScriptedProvider::replying(reply)),
        )
    }
}
