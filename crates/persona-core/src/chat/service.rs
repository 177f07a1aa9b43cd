//! Chat service: the registry of live conversations.
//!
//! ChatService resolves a publish id to a bot configuration, opens an
//! orchestrator for it, and tracks open sessions by session id until they
//! are closed or sit idle past a deadline. Sessions share nothing but the
//! context cache and the persistence gateway, both keyed by session id.

use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use persona_types::error::ChatError;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use super::orchestrator::{ConversationOrchestrator, ConversationState};
use super::persistence::PersistenceGateway;
use super::repository::TranscriptRepository;
use crate::context::SystemContextCache;
use crate::llm::BoxChatProvider;
use crate::repository::bot::BotConfigRepository;

/// Shared handle to one live session.
pub type LiveSession<R> = Arc<ConversationOrchestrator<R>>;

/// Opens, looks up, and closes live conversations.
///
/// Generic over `BotConfigRepository` and `TranscriptRepository` so
/// persona-core never depends on persona-infra.
pub struct ChatService<B: BotConfigRepository, R: TranscriptRepository> {
    bots: B,
    provider: Arc<BoxChatProvider>,
    gateway: Arc<PersistenceGateway<R>>,
    cache: Arc<SystemContextCache>,
    greeting: String,
    sessions: DashMap<Uuid, LiveSession<R>>,
}

impl<B: BotConfigRepository, R: TranscriptRepository> ChatService<B, R> {
    pub fn new(
        bots: B,
        transcripts: R,
        provider: Arc<BoxChatProvider>,
        greeting: impl Into<String>,
    ) -> Self {
        Self {
            bots,
            provider,
            gateway: Arc::new(PersistenceGateway::new(transcripts)),
            cache: Arc::new(SystemContextCache::new()),
            greeting: greeting.into(),
            sessions: DashMap::new(),
        }
    }

    /// Open a new conversation with the bot published as `publish_id`.
    pub async fn open_session(&self, publish_id: &str) -> Result<LiveSession<R>, ChatError> {
        let config = self
            .bots
            .get_by_publish_id(publish_id)
            .await?
            .ok_or_else(|| ChatError::NotFound(format!("chatbot '{publish_id}'")))?;

        let orchestrator = Arc::new(ConversationOrchestrator::new(
            config,
            Arc::clone(&self.provider),
            Arc::clone(&self.gateway),
            Arc::clone(&self.cache),
            self.greeting.as_str(),
        )?);

        let session_id = orchestrator.session_id();
        self.sessions.insert(session_id, Arc::clone(&orchestrator));
        info!(
            session_id = %session_id,
            publish_id = %publish_id,
            provider = self.provider.name(),
            "Chat session opened"
        );
        Ok(orchestrator)
    }

    pub fn get(&self, session_id: &Uuid) -> Option<LiveSession<R>> {
        self.sessions.get(session_id).map(|s| Arc::clone(s.value()))
    }

    /// Like [`get`](Self::get), but a missing session is an error.
    pub fn require(&self, session_id: &Uuid) -> Result<LiveSession<R>, ChatError> {
        self.get(session_id)
            .ok_or_else(|| ChatError::NotFound(format!("session '{session_id}'")))
    }

    /// Close a live session, releasing its cached context and gateway slot.
    ///
    /// The stored transcript, if any, is kept.
    pub fn close(&self, session_id: &Uuid) -> bool {
        let removed = self.sessions.remove(session_id);
        if let Some((_, live)) = &removed {
            live.close();
        }
        let removed = removed.is_some();
        self.cache.evict(session_id);
        self.gateway.forget(session_id);
        if removed {
            info!(session_id = %session_id, "Chat session closed");
        }
        removed
    }

    /// Close every `Idle` session with no activity for at least `max_idle`.
    ///
    /// Returns how many sessions were closed. A session with a reply in
    /// flight is never evicted.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let idle: Vec<Uuid> = self
            .sessions
            .iter()
            .filter(|s| s.state() == ConversationState::Idle && s.idle_for() >= max_idle)
            .map(|s| *s.key())
            .collect();

        let evicted = idle.iter().filter(|id| self.close(id)).count();
        if evicted > 0 {
            info!(evicted, remaining = self.sessions.len(), "Idle chat sessions evicted");
        }
        evicted
    }

    pub fn open_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn provider(&self) -> &BoxChatProvider {
        &self.provider
    }

    pub fn bots(&self) -> &B {
        &self.bots
    }
}

impl<B, R> ChatService<B, R>
where
    B: BotConfigRepository + 'static,
    R: TranscriptRepository + 'static,
{
    /// Spawn a task that runs [`evict_idle`](Self::evict_idle) every `period`.
    ///
    /// The task holds a weak reference and stops once the service is dropped.
    pub fn spawn_idle_sweep(
        service: &Arc<Self>,
        max_idle: Duration,
        period: Duration,
    ) -> JoinHandle<()> {
        let service: Weak<Self> = Arc::downgrade(service);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(service) = service.upgrade() else {
                    debug!("Chat service dropped, idle sweep stopped");
                    break;
                };
                service.evict_idle(max_idle);
            }
        })
    }
}
