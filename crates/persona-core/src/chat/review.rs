//! Read and delete access to stored transcripts for the review tool.

use persona_types::error::{ChatError, RepositoryError};
use persona_types::transcript::{TranscriptRecord, TranscriptSummary};
use tracing::info;

use super::repository::TranscriptRepository;

/// Transcript review operations. Never used by live sessions.
pub struct ReviewService<R: TranscriptRepository> {
    repo: R,
}

impl<R: TranscriptRepository> ReviewService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Summaries of stored transcripts, newest first.
    pub async fn list(&self, publish_id: Option<&str>) -> Result<Vec<TranscriptSummary>, ChatError> {
        let mut summaries: Vec<_> = self
            .repo
            .list(publish_id)
            .await?
            .iter()
            .map(TranscriptRecord::summary)
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    pub async fn get(&self, id: &str) -> Result<TranscriptRecord, ChatError> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Irreversibly delete a transcript. Confirmation is the caller's job.
    pub async fn delete(&self, id: &str) -> Result<(), ChatError> {
        match self.repo.delete(id).await {
            Ok(()) => {
                info!(transcript_id = %id, "Transcript deleted");
                Ok(())
            }
            Err(RepositoryError::NotFound) => Err(not_found(id)),
            Err(e) => Err(e.into()),
        }
    }
}

fn not_found(id: &str) -> ChatError {
    ChatError::NotFound(format!("transcript '{id}'"))
}
