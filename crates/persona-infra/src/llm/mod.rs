//! Chat provider implementations.
//!
//! Contains the three concrete [`ChatProvider`](persona_core::llm::ChatProvider)
//! adapters (Gemini, OpenAI, OpenRouter) and the factory
//! ([`create_provider`]) that picks exactly one of them from
//! [`ProviderSettings`] at startup.
//!
//! Adapters are constructed even when their credentials are missing; the
//! `NotConfigured` error then surfaces on the first turn, in the transcript.

pub mod gemini;
pub mod openai;
pub mod openrouter;

use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use persona_core::llm::BoxChatProvider;
use persona_types::llm::{ProviderError, ProviderType};

use self::gemini::GeminiProvider;
use self::openai::OpenAiProvider;
use self::openrouter::OpenRouterProvider;

/// Request timeout shared by the raw HTTP adapters.
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// Resolved backend selection for one deployment.
///
/// Built by [`crate::config::resolve_provider_settings`] from `config.toml`
/// and the environment. `api_key` belongs to the selected provider only.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub provider: ProviderType,
    pub api_key: Option<SecretString>,
    /// `None` only for Gemini, which has no default model.
    pub model: Option<String>,
    pub gemini_grounding: bool,
    /// Origin reported to OpenRouter as `HTTP-Referer`.
    pub site_url: String,
}

/// Create a [`BoxChatProvider`] for the selected backend.
///
/// # Errors
///
/// Fails only if the HTTP client cannot be built.
pub fn create_provider(settings: &ProviderSettings) -> Result<BoxChatProvider, ProviderError> {
    let provider = match settings.provider {
        ProviderType::Gemini => BoxChatProvider::new(GeminiProvider::new(
            http_client()?,
            settings.api_key.clone(),
            settings.model.clone(),
            settings.gemini_grounding,
        )),
        ProviderType::OpenAi => BoxChatProvider::new(OpenAiProvider::new(
            settings.api_key.as_ref(),
            settings.model.clone(),
        )),
        ProviderType::OpenRouter => BoxChatProvider::new(OpenRouterProvider::new(
            http_client()?,
            settings.api_key.clone(),
            settings.model.clone(),
            settings.site_url.clone(),
        )),
    };

    tracing::info!(
        provider = provider.name(),
        model = provider.model().unwrap_or("unset"),
        "Chat provider selected"
    );
    Ok(provider)
}

fn http_client() -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| ProviderError::transport(format!("failed to create HTTP client: {e}")))
}

/// `{"error": {"message": "..."}}`, the error body shape both REST backends use.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Map a non-success HTTP response to `RequestFailed`, preferring the
/// provider's own error message.
pub(crate) fn status_error(status: reqwest::StatusCode, body: &str) -> ProviderError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| format!("API request failed: {}", status.as_u16()));
    ProviderError::RequestFailed {
        status: Some(status.as_u16()),
        message,
    }
}
