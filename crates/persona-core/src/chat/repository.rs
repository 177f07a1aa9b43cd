//! TranscriptRepository trait definition.
//!
//! The transcript store has document semantics: a record is created once
//! with its header and messages, then only its messages and `updated_at`
//! change.

use chrono::{DateTime, Utc};
use persona_types::chat::ChatMessage;
use persona_types::error::RepositoryError;
use persona_types::transcript::{NewTranscript, TranscriptRecord};

/// Repository trait for persisted conversation transcripts.
///
/// Implementations live in persona-infra (e.g., `SqliteTranscriptRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait TranscriptRepository: Send + Sync {
    /// Create a transcript and return its store-assigned id.
    fn create(
        &self,
        transcript: &NewTranscript,
    ) -> impl std::future::Future<Output = Result<String, RepositoryError>> + Send;

    /// Replace the messages of an existing transcript.
    ///
    /// Returns `RepositoryError::NotFound` if no record has this id.
    fn update(
        &self,
        id: &str,
        messages: &[ChatMessage],
        updated_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a transcript by id.
    fn get(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<Option<TranscriptRecord>, RepositoryError>> + Send;

    /// List transcripts, optionally for one bot, newest first.
    fn list(
        &self,
        publish_id: Option<&str>,
    ) -> impl std::future::Future<Output = Result<Vec<TranscriptRecord>, RepositoryError>> + Send;

    /// Permanently delete a transcript.
    ///
    /// Returns `RepositoryError::NotFound` if no record has this id.
    fn delete(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
