//! Conversation session, message, and feedback types for Persona.
//!
//! A `ConversationSession` is the unit of persistence. Its message list
//! always starts with exactly one `system` entry carrying the session's
//! system context; that entry is never shown to the end user, never sent
//! to a provider verbatim, and never written to the transcript store.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use crate::llm::{MessageRole, NormalizedResponse, Usage};

/// Stored in place of an empty comment on negative feedback.
pub const FEEDBACK_PLACEHOLDER: &str = "[No comment provided]";

static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<a[^>]+href="([^"]+)"[^>]*>([^<]+)</a>"#).expect("anchor regex is valid")
});

/// End-user verdict on a single assistant message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Good,
    Bad,
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feedback::Good => write!(f, "good"),
            Feedback::Bad => write!(f, "bad"),
        }
    }
}

impl FromStr for Feedback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "good" | "up" => Ok(Feedback::Good),
            "bad" | "down" => Ok(Feedback::Bad),
            other => Err(format!("invalid feedback: '{other}'")),
        }
    }
}

/// Rendered search widget attached to a grounded response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEntryPoint {
    #[serde(default)]
    pub rendered_content: String,
}

/// Search-grounding data some providers attach to a response.
///
/// Field names follow the provider's camelCase wire shape so the metadata
/// can be surfaced unmodified. Fields we do not model are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub web_search_queries: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_entry_point: Option<SearchEntryPoint>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A search result link parsed out of the rendered search widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingLink {
    pub url: String,
    pub text: String,
}

impl GroundingMetadata {
    /// Extract `<a href>` links from the rendered search entry point, in order.
    pub fn links(&self) -> Vec<GroundingLink> {
        let Some(entry) = &self.search_entry_point else {
            return Vec::new();
        };
        ANCHOR_RE
            .captures_iter(&entry.rendered_content)
            .map(|cap| GroundingLink {
                url: cap[1].to_string(),
                text: cap[2].to_string(),
            })
            .collect()
    }
}

/// One turn in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding_metadata: Option<GroundingMetadata>,
    /// Write-once for the lifetime of the session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_comment: Option<String>,
    /// Content is a surfaced failure, not model output.
    #[serde(default)]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ChatMessage {
    fn with_role(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            grounding_metadata: None,
            feedback: None,
            feedback_comment: None,
            is_error: false,
            model: None,
            response_time_ms: None,
            usage: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, content)
    }

    /// An assistant message carrying a human-readable failure diagnostic.
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::with_role(MessageRole::Assistant, content)
        }
    }

    /// An assistant message built from a provider's normalized response.
    pub fn from_response(response: NormalizedResponse, response_time_ms: u64) -> Self {
        Self {
            grounding_metadata: response.grounding_metadata,
            model: response.model,
            usage: response.usage,
            response_time_ms: Some(response_time_ms),
            ..Self::with_role(MessageRole::Assistant, response.text)
        }
    }

    pub fn is_system(&self) -> bool {
        self.role == MessageRole::System
    }
}

/// The unit of persistence: one end user's conversation with one bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    /// Local, ephemeral identifier.
    pub session_id: Uuid,
    /// Assigned by the transcript store on the first successful write.
    pub persisted_id: Option<String>,
    pub publish_id: String,
    pub bot_name: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationSession {
    /// Create an empty, unpersisted session for the given bot.
    pub fn new(publish_id: impl Into<String>, bot_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::now_v7(),
            persisted_id: None,
            publish_id: publish_id.into(),
            bot_name: bot_name.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Messages shown to the end user (everything except `system`).
    pub fn visible_messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(|m| !m.is_system())
    }

    /// Messages as written to the transcript store.
    pub fn persistable_messages(&self) -> Vec<ChatMessage> {
        self.visible_messages().cloned().collect()
    }

    /// True once the session holds more than the seeded greeting.
    pub fn has_exchange(&self) -> bool {
        self.messages.iter().any(|m| m.role == MessageRole::User)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
