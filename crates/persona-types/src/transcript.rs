//! Transcript store record shapes and review-tool summaries.
//!
//! A transcript is the durable form of a `ConversationSession`: header
//! fields plus the message list with the `system` entry stripped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::{ChatMessage, ConversationSession, Feedback, MessageRole};

/// Characters of the first user message shown in review listings.
const PREVIEW_CHARS: usize = 50;

/// Payload for creating a transcript record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTranscript {
    pub publish_id: String,
    pub bot_name: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewTranscript {
    /// Build the create payload from a live session, dropping `system` messages.
    pub fn from_session(session: &ConversationSession) -> Self {
        Self {
            publish_id: session.publish_id.clone(),
            bot_name: session.bot_name.clone(),
            messages: session.persistable_messages(),
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

/// A persisted conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub id: String,
    pub publish_id: String,
    pub bot_name: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row of the review tool's session list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSummary {
    pub id: String,
    pub publish_id: String,
    pub bot_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
    pub preview: String,
    pub good_feedback: usize,
    pub bad_feedback: usize,
}

impl TranscriptRecord {
    /// Summarize this transcript for listing.
    pub fn summary(&self) -> TranscriptSummary {
        let count = |verdict: Feedback| {
            self.messages
                .iter()
                .filter(|m| m.feedback == Some(verdict))
                .count()
        };

        TranscriptSummary {
            id: self.id.clone(),
            publish_id: self.publish_id.clone(),
            bot_name: self.bot_name.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            message_count: self.messages.len(),
            preview: preview(&self.messages),
            good_feedback: count(Feedback::Good),
            bad_feedback: count(Feedback::Bad),
        }
    }
}

fn preview(messages: &[ChatMessage]) -> String {
    if messages.is_empty() {
        return "No messages".to_string();
    }
    match messages.iter().find(|m| m.role == MessageRole::User) {
        Some(first) => {
            let head: String = first.content.chars().take(PREVIEW_CHARS).collect();
            format!("{head}...")
        }
        None => "No user message".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(messages: Vec<ChatMessage>) -> TranscriptRecord {
        let now = Utc::now();
        TranscriptRecord {
            id: "t-1".to_string(),
            publish_id: "pub".to_string(),
            bot_name: "Bot".to_string(),
            messages,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_new_transcript_strips_system() {
        let mut session = ConversationSession::new("pub", "Bot");
        session.messages.push(ChatMessage::system("secret persona"));
        session.messages.push(ChatMessage::assistant("Hello"));
        session.messages.push(ChatMessage::user("Hi"));

        let new = NewTranscript::from_session(&session);
        assert_eq!(new.messages.len(), 2);
        assert!(new.messages.iter().all(|m| !m.is_system()));
        assert_eq!(new.created_at, session.created_at);
    }

    #[test]
    fn test_summary_counts_feedback() {
        let mut good = ChatMessage::assistant("a");
        good.feedback = Some(Feedback::Good);
        let mut bad = ChatMessage::assistant("b");
        bad.feedback = Some(Feedback::Bad);
        let mut bad2 = ChatMessage::assistant("c");
        bad2.feedback = Some(Feedback::Bad);

        let summary = record(vec![ChatMessage::user("q"), good, bad, bad2]).summary();
        assert_eq!(summary.message_count, 4);
        assert_eq!(summary.good_feedback, 1);
        assert_eq!(summary.bad_feedback, 2);
    }

    #[test]
    fn test_preview_truncates_first_user_message() {
        let long = "ä".repeat(80);
        let summary = record(vec![
            ChatMessage::assistant("greeting"),
            ChatMessage::user(long),
            ChatMessage::user("second"),
        ])
        .summary();
        assert_eq!(summary.preview.chars().count(), PREVIEW_CHARS + 3);
        assert!(summary.preview.ends_with("..."));
    }

    #[test]
    fn test_preview_fallbacks() {
        assert_eq!(record(vec![]).summary().preview, "No messages");
        assert_eq!(
            record(vec![ChatMessage::assistant("hi")]).summary().preview,
            "No user message"
        );
    }
}
