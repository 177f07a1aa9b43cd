//! Session persistence gateway.
//!
//! Decides per write whether a session's transcript must be created or
//! updated. The decision and the write happen under a per-session async
//! lock, so two concurrent writes for one session can never both create.
//!
//! Slots exist only between [`register`](PersistenceGateway::register) and
//! [`forget`](PersistenceGateway::forget). A write for a session that was
//! already forgotten still reaches the store, but leaves no slot behind.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use persona_types::chat::ConversationSession;
use persona_types::error::ChatError;
use persona_types::transcript::NewTranscript;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::repository::TranscriptRepository;

/// What the gateway knows about one session's stored transcript.
#[derive(Debug, Default)]
struct Slot {
    persisted_id: Option<String>,
    /// `updated_at` of the last snapshot written.
    written_at: Option<DateTime<Utc>>,
}

/// Serializes create-or-update writes of live sessions.
pub struct PersistenceGateway<R: TranscriptRepository> {
    repo: R,
    slots: DashMap<Uuid, Arc<Mutex<Slot>>>,
}

impl<R: TranscriptRepository> PersistenceGateway<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            slots: DashMap::new(),
        }
    }

    /// Write `session` to the transcript store.
    ///
    /// - No stored id and no user message yet: nothing is written, `Ok(None)`.
    /// - No stored id and at least one exchange: create, remember the id.
    /// - Stored id: update messages and `updated_at`.
    ///
    /// A snapshot older than the last one written for this session is
    /// skipped, so a slow writer cannot roll the record back.
    pub async fn upsert(&self, session: &ConversationSession) -> Result<Option<String>, ChatError> {
        let slot = match self.slots.get(&session.session_id) {
            Some(slot) => Arc::clone(slot.value()),
            None => {
                debug!(session_id = %session.session_id, "Writing closed session without a slot");
                Arc::default()
            }
        };
        let mut slot = slot.lock().await;

        if slot.persisted_id.is_none() {
            slot.persisted_id = session.persisted_id.clone();
        }

        if let Some(id) = slot.persisted_id.clone() {
            if slot.written_at.is_some_and(|w| session.updated_at < w) {
                debug!(session_id = %session.session_id, transcript_id = %id, "Skipping stale snapshot");
                return Ok(Some(id));
            }
            self.repo
                .update(&id, &session.persistable_messages(), session.updated_at)
                .await
                .map_err(|e| ChatError::PersistenceFailed(e.to_string()))?;
            slot.written_at = Some(session.updated_at);
            debug!(session_id = %session.session_id, transcript_id = %id, "Transcript updated");
            return Ok(Some(id));
        }

        if !session.has_exchange() {
            return Ok(None);
        }

        let id = self
            .repo
            .create(&NewTranscript::from_session(session))
            .await
            .map_err(|e| ChatError::PersistenceFailed(e.to_string()))?;
        slot.persisted_id = Some(id.clone());
        slot.written_at = Some(session.updated_at);
        info!(
            session_id = %session.session_id,
            publish_id = %session.publish_id,
            transcript_id = %id,
            "Transcript created"
        );
        Ok(Some(id))
    }

    /// Start tracking a newly opened session.
    pub fn register(&self, session_id: Uuid) {
        self.slots.entry(session_id).or_default();
    }

    /// Number of sessions currently tracked.
    pub fn tracked(&self) -> usize {
        self.slots.len()
    }

    /// Drop the slot of a closed session.
    pub fn forget(&self, session_id: &Uuid) {
        self.slots.remove(session_id);
    }

    /// Access the underlying transcript repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::testing::InMemoryTranscripts;
    use persona_types::chat::ChatMessage;

    fn seeded() -> ConversationSession {
        let mut session = ConversationSession::new("cabin", "Cabin helper");
        session.messages.push(ChatMessage::system("ctx"));
        session.messages.push(ChatMessage::assistant("Hi!"));
        session
    }

    /// A gateway tracking one freshly seeded session.
    fn open(repo: &InMemoryTranscripts) -> (PersistenceGateway<InMemoryTranscripts>, ConversationSession) {
        let gateway = PersistenceGateway::new(repo.clone());
        let session = seeded();
        gateway.register(session.session_id);
        (gateway, session)
    }

    #[tokio::test]
    async fn test_greeting_only_session_not_persisted() {
        let repo = InMemoryTranscripts::new();
        let (gateway, session) = open(&repo);

        let result = gateway.upsert(&session).await.unwrap();
        assert!(result.is_none());
        assert_eq!(repo.create_count(), 0);
    }

    #[tokio::test]
    async fn test_first_exchange_creates_then_updates() {
        let repo = InMemoryTranscripts::new();
        let (gateway, mut session) = open(&repo);

        session.messages.push(ChatMessage::user("Where is the sauna?"));
        let id = gateway.upsert(&session).await.unwrap().unwrap();

        session.messages.push(ChatMessage::assistant("Behind the cabin."));
        session.touch();
        let again = gateway.upsert(&session).await.unwrap().unwrap();

        assert_eq!(id, again);
        assert_eq!(repo.create_count(), 1);
        assert_eq!(repo.update_count(), 1);

        let record = repo.only_record();
        assert_eq!(record.messages.len(), 3);
        assert!(record.messages.iter().all(|m| !m.is_system()));
    }

    #[tokio::test]
    async fn test_concurrent_upserts_create_once() {
        let repo = InMemoryTranscripts::new();
        let (gateway, mut session) = open(&repo);
        let gateway = Arc::new(gateway);
        session.messages.push(ChatMessage::user("hello"));

        let (a, b) = tokio::join!(gateway.upsert(&session), gateway.upsert(&session));
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(repo.create_count(), 1);
    }

    #[tokio::test]
    async fn test_known_persisted_id_seeds_slot() {
        let repo = InMemoryTranscripts::new();
        let (gateway, mut session) = open(&repo);
        session.messages.push(ChatMessage::user("hello"));

        let id = repo.create(&NewTranscript::from_session(&session)).await.unwrap();
        session.persisted_id = Some(id.clone());

        assert_eq!(gateway.upsert(&session).await.unwrap(), Some(id));
        assert_eq!(repo.create_count(), 1);
        assert_eq!(repo.update_count(), 1);
    }

    #[tokio::test]
    async fn test_stale_snapshot_skipped() {
        let repo = InMemoryTranscripts::new();
        let (gateway, mut session) = open(&repo);
        session.messages.push(ChatMessage::user("hello"));
        let stale = session.clone();

        gateway.upsert(&session).await.unwrap();
        session.messages.push(ChatMessage::assistant("hi there"));
        session.updated_at = stale.updated_at + chrono::Duration::seconds(1);
        gateway.upsert(&session).await.unwrap();

        gateway.upsert(&stale).await.unwrap();
        assert_eq!(repo.only_record().messages.len(), 3);
    }

    #[tokio::test]
    async fn test_repository_failure_maps_to_persistence_failed() {
        let repo = InMemoryTranscripts::new();
        repo.set_failing(true);
        let (gateway, mut session) = open(&repo);
        session.messages.push(ChatMessage::user("hello"));

        let err = gateway.upsert(&session).await.unwrap_err();
        assert!(matches!(err, ChatError::PersistenceFailed(_)));

        repo.set_failing(false);
        assert!(gateway.upsert(&session).await.unwrap().is_some());
        assert_eq!(repo.create_count(), 1);
    }

    #[tokio::test]
    async fn test_forget_drops_slot() {
        let repo = InMemoryTranscripts::new();
        let (gateway, mut session) = open(&repo);
        session.messages.push(ChatMessage::user("hello"));

        gateway.upsert(&session).await.unwrap();
        assert_eq!(gateway.tracked(), 1);
        gateway.forget(&session.session_id);
        assert_eq!(gateway.tracked(), 0);
    }

    #[tokio::test]
    async fn test_write_after_forget_leaves_no_slot() {
        let repo = InMemoryTranscripts::new();
        let (gateway, mut session) = open(&repo);
        session.messages.push(ChatMessage::user("hello"));
        let id = gateway.upsert(&session).await.unwrap().unwrap();
        gateway.forget(&session.session_id);

        // A turn that finished after close still updates its own record.
        session.persisted_id = Some(id.clone());
        session.messages.push(ChatMessage::assistant("late reply"));
        session.touch();
        assert_eq!(gateway.upsert(&session).await.unwrap(), Some(id));

        assert_eq!(gateway.tracked(), 0);
        assert_eq!(repo.create_count(), 1);
        assert_eq!(repo.only_record().messages.len(), 3);
    }
}
