//! OpenRouterProvider: [`ChatProvider`] over `openrouter.ai/api/v1/chat/completions`.
//!
//! Besides bearer auth, OpenRouter attributes traffic through the
//! `HTTP-Referer` and `X-Title` headers.

use secrecy::{ExposeSecret, SecretString};

use persona_core::llm::provider::{ChatProvider, conversation_turns};
use persona_types::bot::BotConfiguration;
use persona_types::chat::ChatMessage;
use persona_types::llm::{MessageRole, NormalizedResponse, ProviderError, Usage};

use super::types::{ChatCompletionRequest, ChatCompletionResponse, WireMessage};
use crate::llm::status_error;

pub const DEFAULT_MODEL: &str = "x-ai/grok-4-fast";
const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const FALLBACK_TITLE: &str = "AI Assistant";

/// OpenRouter chat provider. Does not derive Debug (holds the API key).
pub struct OpenRouterProvider {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    model: String,
    site_url: String,
    base_url: String,
}

impl OpenRouterProvider {
    pub fn new(
        client: reqwest::Client,
        api_key: Option<SecretString>,
        model: Option<String>,
        site_url: String,
    ) -> Self {
        Self {
            client,
            api_key,
            model: model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            site_url,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

fn wire(role: &str, content: &str) -> WireMessage {
    WireMessage {
        role: role.to_string(),
        content: Some(content.to_string()),
    }
}

pub(crate) fn build_request(
    model: &str,
    history: &[ChatMessage],
    system_context: &str,
) -> ChatCompletionRequest {
    let messages = std::iter::once(wire("system", system_context))
        .chain(conversation_turns(history).map(|m| match m.role {
            MessageRole::Assistant => wire("assistant", &m.content),
            _ => wire("user", &m.content),
        }))
        .collect();

    ChatCompletionRequest {
        model: model.to_string(),
        messages,
        temperature: 0.3,
        max_tokens: 2048,
        top_p: 0.8,
        stream: false,
    }
}

/// `X-Title` value: the bot's name, or a generic title when it has none.
pub(crate) fn title_for(config: &BotConfiguration) -> &str {
    let name = config.name.trim();
    if name.is_empty() { FALLBACK_TITLE } else { name }
}

pub(crate) fn parse_response(
    response: ChatCompletionResponse,
    configured_model: &str,
) -> Result<NormalizedResponse, ProviderError> {
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| {
            ProviderError::MalformedResponse(
                "Unexpected response format from OpenRouter".to_string(),
            )
        })?;

    Ok(NormalizedResponse {
        text,
        grounding_metadata: None,
        model: Some(
            response
                .model
                .unwrap_or_else(|| configured_model.to_string()),
        ),
        usage: response.usage.map(|u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        }),
    })
}

impl ChatProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    fn model(&self) -> Option<&str> {
        Some(&self.model)
    }

    async fn generate(
        &self,
        history: &[ChatMessage],
        system_context: &str,
        config: &BotConfiguration,
    ) -> Result<NormalizedResponse, ProviderError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            ProviderError::NotConfigured(
                "OpenRouter API key is not set (OPENROUTER_API_KEY)".to_string(),
            )
        })?;

        let body = build_request(&self.model, history, system_context);
        tracing::debug!(model = %self.model, messages = body.messages.len(), "OpenRouter request");

        let response = self
            .client
            .post(self.url())
            .bearer_auth(api_key.expose_secret())
            .header("HTTP-Referer", &self.site_url)
            .header("X-Title", title_for(config))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &error_body));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|e| {
            ProviderError::MalformedResponse(format!("failed to parse OpenRouter response: {e}"))
        })?;
        parse_response(parsed, &self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str) -> BotConfiguration {
        BotConfiguration {
            publish_id: "cabin".to_string(),
            name: name.to_string(),
            role_description: String::new(),
            instructions: String::new(),
            example_questions: String::new(),
            is_active: true,
        }
    }

    #[test]
    fn test_build_request_body() {
        let history = vec![ChatMessage::assistant("Hi!"), ChatMessage::user("Sauna?")];
        let req = build_request(DEFAULT_MODEL, &history, "CTX");

        assert_eq!(
            req.messages,
            vec![
                wire("system", "CTX"),
                wire("assistant", "Hi!"),
                wire("user", "Sauna?")
            ]
        );
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "x-ai/grok-4-fast");
        assert_eq!(json["max_tokens"], 2048);
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn test_title_falls_back() {
        assert_eq!(title_for(&config("Cabin helper")), "Cabin helper");
        assert_eq!(title_for(&config("  ")), "AI Assistant");
    }

    #[test]
    fn test_parse_response() {
        let parsed: ChatCompletionResponse = serde_json::from_value(serde_json::json!({
            "model": "x-ai/grok-4-fast:free",
            "choices": [{"message": {"role": "assistant", "content": "By the lake."}}],
            "usage": {"prompt_tokens": 30, "completion_tokens": 5, "total_tokens": 35}
        }))
        .unwrap();

        let resp = parse_response(parsed, DEFAULT_MODEL).unwrap();
        assert_eq!(resp.text, "By the lake.");
        assert_eq!(resp.model.as_deref(), Some("x-ai/grok-4-fast:free"));
        assert_eq!(resp.usage.unwrap().output_tokens, 5);
    }

    #[test]
    fn test_parse_response_falls_back_to_configured_model() {
        let parsed: ChatCompletionResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Hi"}}]
        }))
        .unwrap();
        let resp = parse_response(parsed, DEFAULT_MODEL).unwrap();
        assert_eq!(resp.model.as_deref(), Some(DEFAULT_MODEL));
        assert!(resp.usage.is_none());
    }

    #[test]
    fn test_parse_response_missing_message() {
        let parsed: ChatCompletionResponse =
            serde_json::from_value(serde_json::json!({"choices": [{}]})).unwrap();
        let err = parse_response(parsed, DEFAULT_MODEL).unwrap_err();
        assert_eq!(
            err,
            ProviderError::MalformedResponse("Unexpected response format from OpenRouter".into())
        );
    }

    #[tokio::test]
    async fn test_missing_key() {
        let provider = OpenRouterProvider::new(
            reqwest::Client::new(),
            None,
            None,
            "http://localhost:3000".to_string(),
        );
        assert_eq!(provider.model(), Some(DEFAULT_MODEL));
        let err = provider
            .generate(&[ChatMessage::user("Hi")], "CTX", &config("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn test_base_url_override() {
        let provider = OpenRouterProvider::new(reqwest::Client::new(), None, None, String::new())
            .with_base_url("http://localhost:8080/v1".to_string());
        assert_eq!(provider.url(), "http://localhost:8080/v1/chat/completions");
    }
}
