//! LLM request/response types for Persona.
//!
//! These types model the provider-agnostic side of every backend call:
//! message roles, the normalized response shape every adapter returns,
//! token usage, and the provider error taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::chat::GroundingMetadata;

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// Token usage reported by a provider for one call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Adapter output, identical in shape for every backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizedResponse {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grounding_metadata: Option<GroundingMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl NormalizedResponse {
    /// A plain text response with no provenance attached.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Which backend is active for this deployment.
///
/// Exactly one provider is selected at configuration time; it is never
/// chosen per message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    #[default]
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "openrouter")]
    OpenRouter,
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderType::Gemini => write!(f, "gemini"),
            ProviderType::OpenAi => write!(f, "openai"),
            ProviderType::OpenRouter => write!(f, "openrouter"),
        }
    }
}

impl FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(ProviderType::Gemini),
            "openai" => Ok(ProviderType::OpenAi),
            "openrouter" | "open_router" => Ok(ProviderType::OpenRouter),
            other => Err(format!("invalid provider type: '{other}'")),
        }
    }
}

/// Coarse classification of a [`ProviderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    NotConfigured,
    RequestFailed,
    MalformedResponse,
}

/// Errors from provider adapter calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Credential or model name missing from the deployment settings.
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// Transport failure or a non-success status from the provider.
    #[error("request failed{}: {message}", status_suffix(.status))]
    RequestFailed {
        status: Option<u16>,
        message: String,
    },

    /// Success status, but the body lacked the fields we read.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

pub(crate) fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {code})"),
        None => String::new(),
    }
}

impl ProviderError {
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            ProviderError::NotConfigured(_) => ProviderErrorKind::NotConfigured,
            ProviderError::RequestFailed { .. } => ProviderErrorKind::RequestFailed,
            ProviderError::MalformedResponse(_) => ProviderErrorKind::MalformedResponse,
        }
    }

    /// Shorthand for a transport-level failure without an HTTP status.
    pub fn transport(message: impl Into<String>) -> Self {
        ProviderError::RequestFailed {
            status: None,
            message: message.into(),
        }
    }
}
