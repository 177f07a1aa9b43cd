//! Global configuration types for Persona.
//!
//! `GlobalConfig` represents the top-level `config.toml` of a deployment:
//! which provider is active, the greeting every session opens with, and
//! per-provider model and grounding choices. API keys never live here;
//! they come from the environment.

use serde::{Deserialize, Serialize};

use crate::llm::ProviderType;

/// Greeting seeded as the first visible assistant message of every session.
pub const DEFAULT_GREETING: &str = "Hi! I'm your personal assistant. How can I help you?";

/// Top-level configuration for a Persona deployment.
///
/// Loaded from `~/.persona/config.toml`. All fields have defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Backend used for every conversation in this deployment.
    #[serde(default)]
    pub provider: ProviderType,

    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Enable Google Search grounding for the Gemini backend.
    #[serde(default)]
    pub gemini_grounding: bool,

    /// Gemini has no default model; it must be named explicitly.
    #[serde(default)]
    pub gemini_model: Option<String>,

    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    #[serde(default = "default_openrouter_model")]
    pub openrouter_model: String,

    /// Origin reported to OpenRouter in the `HTTP-Referer` header.
    #[serde(default = "default_site_url")]
    pub site_url: String,

    /// Minutes without activity after which a live session is closed.
    #[serde(default = "default_session_idle_minutes")]
    pub session_idle_minutes: u64,
}

fn default_greeting() -> String {
    DEFAULT_GREETING.to_string()
}

fn default_openai_model() -> String {
    "gpt-4".to_string()
}

fn default_openrouter_model() -> String {
    "x-ai/grok-4-fast".to_string()
}

fn default_site_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_session_idle_minutes() -> u64 {
    30
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            provider: ProviderType::default(),
            greeting: default_greeting(),
            gemini_grounding: false,
            gemini_model: None,
            openai_model: default_openai_model(),
            openrouter_model: default_openrouter_model(),
            site_url: default_site_url(),
            session_idle_minutes: default_session_idle_minutes(),
        }
    }
}
