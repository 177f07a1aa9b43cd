//! Conversation orchestrator.
//!
//! Owns one live `ConversationSession` and drives its turns. The state is
//! `Idle` or `Sending`; a send that finds the session `Sending` is ignored
//! without waiting, so exactly one provider call is in flight per session.
//!
//! The message list sits behind a synchronous mutex that is never held
//! across an `.await`: the user turn is appended, a history snapshot taken,
//! the lock released, and only then is the provider called.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use persona_types::bot::BotConfiguration;
use persona_types::chat::{ChatMessage, ConversationSession};
use persona_types::error::ChatError;
use tracing::{Instrument, debug, field, info, info_span, warn};
use uuid::Uuid;

use super::persistence::PersistenceGateway;
use super::repository::TranscriptRepository;
use crate::context::SystemContextCache;
use crate::llm::BoxChatProvider;

const IDLE: u8 = 0;
const SENDING: u8 = 1;

/// Whether a provider call is in flight for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    Idle,
    Sending,
}

/// Why a send was dropped without calling the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Empty,
    Busy,
    /// The session was closed or evicted.
    Closed,
}

/// Result of [`ConversationOrchestrator::send_user_message`].
#[derive(Debug, Clone)]
pub enum SendOutcome {
    Ignored(IgnoreReason),
    /// The provider answered; the assistant message that was appended.
    Replied(ChatMessage),
    /// The provider failed; the error message that was appended.
    Failed(ChatMessage),
}

impl SendOutcome {
    /// The assistant message appended by this send, if any.
    pub fn message(&self) -> Option<&ChatMessage> {
        match self {
            SendOutcome::Replied(m) | SendOutcome::Failed(m) => Some(m),
            SendOutcome::Ignored(_) => None,
        }
    }
}

/// Resets the state to `Idle` when the send finishes, however it exits.
struct SendingGuard<'a>(&'a AtomicU8);

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(IDLE, Ordering::Release);
    }
}

/// Drives one live conversation with the configured provider.
pub struct ConversationOrchestrator<R: TranscriptRepository> {
    config: BotConfiguration,
    session_id: Uuid,
    session: Mutex<ConversationSession>,
    state: AtomicU8,
    provider: Arc<BoxChatProvider>,
    gateway: Arc<PersistenceGateway<R>>,
    cache: Arc<SystemContextCache>,
    greeting: String,
    last_active: Mutex<Instant>,
    closed: AtomicBool,
}

impl<R: TranscriptRepository> ConversationOrchestrator<R> {
    /// Open a new session for `config`, seeded with its system context and
    /// the greeting.
    ///
    /// Fails with `InactiveBot` if the configuration is not active.
    pub fn new(
        config: BotConfiguration,
        provider: Arc<BoxChatProvider>,
        gateway: Arc<PersistenceGateway<R>>,
        cache: Arc<SystemContextCache>,
        greeting: impl Into<String>,
    ) -> Result<Self, ChatError> {
        if !config.is_active {
            return Err(ChatError::InactiveBot(config.publish_id.clone()));
        }

        let session = ConversationSession::new(&config.publish_id, &config.name);
        gateway.register(session.session_id);
        let orchestrator = Self {
            session_id: session.session_id,
            session: Mutex::new(session),
            state: AtomicU8::new(IDLE),
            config,
            provider,
            gateway,
            cache,
            greeting: greeting.into(),
            last_active: Mutex::new(Instant::now()),
            closed: AtomicBool::new(false),
        };
        orchestrator.initialize();
        Ok(orchestrator)
    }

    /// Seed `[system(context), assistant(greeting)]`. No-op once seeded.
    pub fn initialize(&self) {
        let context = self.cache.get_or_build(self.session_id, &self.config);
        let mut session = self.lock();
        if !session.messages.is_empty() {
            return;
        }
        session.messages.push(ChatMessage::system(context.as_ref()));
        session.messages.push(ChatMessage::assistant(&self.greeting));
        debug!(
            session_id = %self.session_id,
            publish_id = %self.config.publish_id,
            "Session initialized"
        );
    }

    /// Send one user turn and append the assistant's reply.
    ///
    /// Empty input, a session already `Sending`, or a closed session is
    /// ignored with no provider call. The text is stored as typed. Provider
    /// failures become an `is_error` assistant message; persistence
    /// failures are logged and do not fail the turn.
    pub async fn send_user_message(&self, text: &str) -> SendOutcome {
        if text.trim().is_empty() {
            return SendOutcome::Ignored(IgnoreReason::Empty);
        }
        if self.is_closed() {
            return SendOutcome::Ignored(IgnoreReason::Closed);
        }

        if self
            .state
            .compare_exchange(IDLE, SENDING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(session_id = %self.session_id, "Send ignored while a reply is pending");
            return SendOutcome::Ignored(IgnoreReason::Busy);
        }
        let _sending = SendingGuard(&self.state);
        self.touch_activity();

        let history: Vec<ChatMessage> = {
            let mut session = self.lock();
            session.messages.push(ChatMessage::user(text));
            session.touch();
            session.visible_messages().cloned().collect()
        };

        let context = self.cache.get_or_build(self.session_id, &self.config);
        let span = info_span!(
            "gen_ai.chat",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = self.provider.model().unwrap_or("default"),
            gen_ai.agent.id = %self.config.publish_id,
            gen_ai.usage.input_tokens = field::Empty,
            gen_ai.usage.output_tokens = field::Empty,
            session_id = %self.session_id,
        );

        let started = Instant::now();
        let result = self
            .provider
            .generate(&history, &context, &self.config)
            .instrument(span.clone())
            .await;
        let response_ms = started.elapsed().as_millis() as u64;

        let outcome = match result {
            Ok(response) => {
                if let Some(usage) = &response.usage {
                    span.record("gen_ai.usage.input_tokens", usage.input_tokens);
                    span.record("gen_ai.usage.output_tokens", usage.output_tokens);
                }
                info!(
                    session_id = %self.session_id,
                    provider = self.provider.name(),
                    model = response.model.as_deref().unwrap_or("unknown"),
                    response_ms,
                    "Assistant replied"
                );
                SendOutcome::Replied(ChatMessage::from_response(response, response_ms))
            }
            Err(e) => {
                warn!(
                    session_id = %self.session_id,
                    provider = self.provider.name(),
                    error = %e,
                    "Provider call failed"
                );
                let error = ChatError::from(e);
                SendOutcome::Failed(ChatMessage::error(remediation(&error)))
            }
        };

        let snapshot = {
            let mut session = self.lock();
            if let Some(message) = outcome.message() {
                session.messages.push(message.clone());
            }
            session.touch();
            session.clone()
        };
        self.persist(&snapshot).await;
        self.touch_activity();

        // A close that raced this turn may have run before the lookup above.
        if self.is_closed() {
            self.cache.evict(&self.session_id);
        }

        outcome
    }

    /// Upsert a snapshot and record the store id. Failures are logged only.
    pub(crate) async fn persist(&self, snapshot: &ConversationSession) {
        match self.gateway.upsert(snapshot).await {
            Ok(Some(id)) => {
                let mut session = self.lock();
                if session.persisted_id.is_none() {
                    session.persisted_id = Some(id);
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Failed to persist transcript");
            }
        }
    }

    /// Mark the session closed: later sends are ignored.
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn touch_activity(&self) {
        *self.last_active.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    /// Time since the last turn or feedback on this session.
    pub fn idle_for(&self) -> Duration {
        self.last_active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }

    /// Run `f` with exclusive access to the session.
    pub(crate) fn with_session<T>(&self, f: impl FnOnce(&mut ConversationSession) -> T) -> T {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, ConversationSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A snapshot of the whole session, `system` entry included.
    pub fn session(&self) -> ConversationSession {
        self.lock().clone()
    }

    /// Messages shown to the end user.
    pub fn visible_messages(&self) -> Vec<ChatMessage> {
        self.lock().visible_messages().cloned().collect()
    }

    pub fn state(&self) -> ConversationState {
        match self.state.load(Ordering::Acquire) {
            SENDING => ConversationState::Sending,
            _ => ConversationState::Idle,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn config(&self) -> &BotConfiguration {
        &self.config
    }
}

impl<R: TranscriptRepository> std::fmt::Debug for ConversationOrchestrator<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationOrchestrator")
            .field("session_id", &self.session_id)
            .field("publish_id", &self.config.publish_id)
            .field("state", &self.state())
            .finish()
    }
}

/// User-facing text for a failed turn.
fn remediation(error: &ChatError) -> String {
    let advice = match error {
        ChatError::NotConfigured(_) => {
            "Check that:\n\
             1. The API key for the active provider is set in the environment\n\
             2. A model name is configured for the provider\n\
             3. The server was restarted after changing the environment"
        }
        ChatError::MalformedResponse(_) => {
            "The assistant returned a response that could not be read. Please try again."
        }
        _ => "The assistant could not be reached. Please try again in a moment.",
    };
    format!("Error: {error}\n\n{advice}")
}
