//! In-memory fakes of the chat ports, shared by the chat module tests.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use persona_types::bot::BotConfiguration;
use persona_types::chat::ChatMessage;
use persona_types::error::RepositoryError;
use persona_types::llm::{NormalizedResponse, ProviderError};
use persona_types::transcript::{NewTranscript, TranscriptRecord};
use tokio::sync::Notify;

use super::feedback::CommentPrompter;
use super::repository::TranscriptRepository;
use crate::llm::provider::ChatProvider;
use crate::repository::bot::BotConfigRepository;

pub(crate) fn bot(publish_id: &str) -> BotConfiguration {
    BotConfiguration {
        publish_id: publish_id.to_string(),
        name: "Cabin helper".to_string(),
        role_description: "You help cabin guests.".to_string(),
        instructions: "Check-in at 15:00.".to_string(),
        example_questions: "Q: Wifi?\nA: On the fridge.".to_string(),
        is_active: true,
    }
}

/// Scripted provider. Clones share call records.
#[derive(Clone, Default)]
pub(crate) struct MockProvider {
    responses: Arc<Mutex<VecDeque<Result<NormalizedResponse, ProviderError>>>>,
    pub calls: Arc<AtomicUsize>,
    pub histories: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
    pub contexts: Arc<Mutex<Vec<String>>>,
    gate: Option<Arc<Notify>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replying(self, result: Result<NormalizedResponse, ProviderError>) -> Self {
        self.responses.lock().unwrap().push_back(result);
        self
    }

    /// Block every call until the returned `Notify` is signalled.
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ChatProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> Option<&str> {
        Some("mock-1")
    }

    fn generate(
        &self,
        history: &[ChatMessage],
        system_context: &str,
        _config: &BotConfiguration,
    ) -> impl Future<Output = Result<NormalizedResponse, ProviderError>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.histories.lock().unwrap().push(history.to_vec());
        self.contexts.lock().unwrap().push(system_context.to_string());
        let next = self.responses.lock().unwrap().pop_front();
        let gate = self.gate.clone();
        async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            next.unwrap_or_else(|| Ok(NormalizedResponse::text("ok")))
        }
    }
}

/// Transcript store backed by a HashMap. Clones share state.
#[derive(Clone, Default)]
pub(crate) struct InMemoryTranscripts {
    pub records: Arc<Mutex<HashMap<String, TranscriptRecord>>>,
    pub creates: Arc<AtomicUsize>,
    pub updates: Arc<AtomicUsize>,
    pub fail: Arc<AtomicBool>,
}

impl InMemoryTranscripts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn only_record(&self) -> TranscriptRecord {
        let records = self.records.lock().unwrap();
        assert_eq!(records.len(), 1, "expected exactly one transcript");
        records.values().next().cloned().unwrap()
    }

    pub fn insert(&self, record: TranscriptRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.id.clone(), record);
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(RepositoryError::Query("store unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

impl TranscriptRepository for InMemoryTranscripts {
    fn create(
        &self,
        transcript: &NewTranscript,
    ) -> impl Future<Output = Result<String, RepositoryError>> + Send {
        let result = self.check().map(|()| {
            let n = self.creates.fetch_add(1, Ordering::SeqCst) + 1;
            let id = format!("transcript-{n}");
            self.insert(TranscriptRecord {
                id: id.clone(),
                publish_id: transcript.publish_id.clone(),
                bot_name: transcript.bot_name.clone(),
                messages: transcript.messages.clone(),
                created_at: transcript.created_at,
                updated_at: transcript.updated_at,
            });
            id
        });
        async move { result }
    }

    fn update(
        &self,
        id: &str,
        messages: &[ChatMessage],
        updated_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        let result = self.check().and_then(|()| {
            let mut records = self.records.lock().unwrap();
            let record = records.get_mut(id).ok_or(RepositoryError::NotFound)?;
            record.messages = messages.to_vec();
            record.updated_at = updated_at;
            self.updates.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        async move { result }
    }

    fn get(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<TranscriptRecord>, RepositoryError>> + Send {
        let result = self
            .check()
            .map(|()| self.records.lock().unwrap().get(id).cloned());
        async move { result }
    }

    fn list(
        &self,
        publish_id: Option<&str>,
    ) -> impl Future<Output = Result<Vec<TranscriptRecord>, RepositoryError>> + Send {
        let result = self.check().map(|()| {
            let mut all: Vec<_> = self
                .records
                .lock()
                .unwrap()
                .values()
                .filter(|r| publish_id.is_none_or(|p| r.publish_id == p))
                .cloned()
                .collect();
            all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            all
        });
        async move { result }
    }

    fn delete(&self, id: &str) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        let result = self.check().and_then(|()| {
            self.records
                .lock()
                .unwrap()
                .remove(id)
                .map(|_| ())
                .ok_or(RepositoryError::NotFound)
        });
        async move { result }
    }
}

#[derive(Clone, Default)]
pub(crate) struct InMemoryBots {
    configs: Arc<Mutex<HashMap<String, BotConfiguration>>>,
}

impl InMemoryBots {
    pub fn with(configs: impl IntoIterator<Item = BotConfiguration>) -> Self {
        let bots = Self::default();
        for config in configs {
            bots.configs
                .lock()
                .unwrap()
                .insert(config.publish_id.clone(), config);
        }
        bots
    }
}

impl BotConfigRepository for InMemoryBots {
    fn get_by_publish_id(
        &self,
        publish_id: &str,
    ) -> impl Future<Output = Result<Option<BotConfiguration>, RepositoryError>> + Send {
        let found = self.configs.lock().unwrap().get(publish_id).cloned();
        async move { Ok(found) }
    }

    fn upsert(
        &self,
        config: &BotConfiguration,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        self.configs
            .lock()
            .unwrap()
            .insert(config.publish_id.clone(), config.clone());
        async move { Ok(()) }
    }

    fn list(&self) -> impl Future<Output = Result<Vec<BotConfiguration>, RepositoryError>> + Send {
        let mut all: Vec<_> = self.configs.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        async move { Ok(all) }
    }
}

/// Prompter that records whether it was asked.
pub(crate) struct CountingPrompter {
    pub answer: Option<String>,
    pub asked: AtomicUsize,
}

impl CountingPrompter {
    pub fn new(answer: Option<&str>) -> Self {
        Self {
            answer: answer.map(str::to_string),
            asked: AtomicUsize::new(0),
        }
    }

    pub fn times_asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

impl CommentPrompter for CountingPrompter {
    fn prompt_comment(&self) -> impl Future<Output = Option<String>> + Send {
        self.asked.fetch_add(1, Ordering::SeqCst);
        let answer = self.answer.clone();
        async move { answer }
    }
}
