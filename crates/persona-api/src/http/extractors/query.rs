//! Query parameter extractors for list endpoints.

use serde::Deserialize;

/// Query parameters for the transcript list endpoint.
#[derive(Debug, Deserialize, Default)]
pub struct TranscriptListQuery {
    /// Only transcripts of the bot with this publish id.
    pub publish_id: Option<String>,
}

impl TranscriptListQuery {
    /// The filter, with an empty value meaning "all bots".
    pub fn publish_id(&self) -> Option<&str> {
        self.publish_id.as_deref().filter(|p| !p.trim().is_empty())
    }
}
