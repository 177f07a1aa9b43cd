//! GeminiProvider: [`ChatProvider`] over the Gemini `generateContent` API.
//!
//! The API key travels in the `x-goog-api-key` header, never in the URL,
//! so request URLs are safe to log.

use secrecy::{ExposeSecret, SecretString};

use persona_core::llm::provider::{ChatProvider, conversation_turns};
use persona_types::bot::BotConfiguration;
use persona_types::chat::ChatMessage;
use persona_types::llm::{MessageRole, NormalizedResponse, ProviderError, Usage};

use super::types::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Tool};
use crate::llm::status_error;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini chat provider.
///
/// Key and model are both optional at construction; a missing one is
/// reported as `NotConfigured` when a turn is attempted. Does not derive
/// Debug so the key cannot leak through formatting.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    model: Option<String>,
    grounding: bool,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(
        client: reqwest::Client,
        api_key: Option<SecretString>,
        model: Option<String>,
        grounding: bool,
    ) -> Self {
        Self {
            client,
            api_key,
            model: model.filter(|m| !m.trim().is_empty()),
            grounding,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn url(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }

    fn credentials(&self) -> Result<(&SecretString, &str), ProviderError> {
        let key = self.api_key.as_ref().ok_or_else(|| {
            ProviderError::NotConfigured("Gemini API key is not set (GEMINI_API_KEY)".to_string())
        })?;
        let model = self.model.as_deref().ok_or_else(|| {
            ProviderError::NotConfigured("Gemini model is not set (GEMINI_MODEL)".to_string())
        })?;
        Ok((key, model))
    }
}

/// Shape a history into a `generateContent` body.
///
/// Prior turns become `contents`; the trailing user turn is sent with the
/// system context prepended. Gemini rejects histories that open with a
/// `model` turn, so assistant turns before the first user turn are dropped.
pub(crate) fn build_request(
    history: &[ChatMessage],
    system_context: &str,
    grounding: bool,
) -> Result<GenerateContentRequest, ProviderError> {
    let turns: Vec<&ChatMessage> = conversation_turns(history).collect();
    let Some((last, prior)) = turns.split_last() else {
        return Err(ProviderError::transport("conversation has no user message to answer"));
    };
    if last.role != MessageRole::User {
        return Err(ProviderError::transport(
            "conversation must end with a user message",
        ));
    }

    let mut contents: Vec<Content> = prior
        .iter()
        .skip_while(|m| m.role != MessageRole::User)
        .map(|m| match m.role {
            MessageRole::Assistant => Content::text("model", m.content.as_str()),
            _ => Content::text("user", m.content.as_str()),
        })
        .collect();
    contents.push(Content::text(
        "user",
        format!("{system_context}\n\n{}", last.content),
    ));

    Ok(GenerateContentRequest {
        contents,
        generation_config: GenerationConfig::default(),
        tools: if grounding {
            vec![Tool::google_search()]
        } else {
            Vec::new()
        },
    })
}

/// Fold a `generateContent` reply into a [`NormalizedResponse`].
pub(crate) fn parse_response(
    response: GenerateContentResponse,
    configured_model: &str,
) -> Result<NormalizedResponse, ProviderError> {
    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        ProviderError::MalformedResponse("Gemini response has no candidates".to_string())
    })?;
    let content = candidate.content.ok_or_else(|| {
        ProviderError::MalformedResponse("Gemini candidate has no content".to_string())
    })?;

    let text = content
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect::<Vec<_>>()
        .join("");

    Ok(NormalizedResponse {
        text,
        grounding_metadata: candidate.grounding_metadata,
        model: Some(
            response
                .model_version
                .unwrap_or_else(|| configured_model.to_string()),
        ),
        usage: response.usage_metadata.map(|u| Usage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
        }),
    })
}

impl ChatProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    async fn generate(
        &self,
        history: &[ChatMessage],
        system_context: &str,
        _config: &BotConfiguration,
    ) -> Result<NormalizedResponse, ProviderError> {
        let (api_key, model) = self.credentials()?;
        let body = build_request(history, system_context, self.grounding)?;
        let url = self.url(model);

        tracing::debug!(%url, turns = body.contents.len(), grounding = self.grounding, "Gemini request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &error_body));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            ProviderError::MalformedResponse(format!("failed to parse Gemini response: {e}"))
        })?;
        parse_response(parsed, model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(key: Option<&str>, model: Option<&str>) -> GeminiProvider {
        GeminiProvider::new(
            reqwest::Client::new(),
            key.map(SecretString::from),
            model.map(str::to_string),
            false,
        )
    }

    fn config() -> BotConfiguration {
        BotConfiguration {
            publish_id: "cabin".to_string(),
            name: "Cabin helper".to_string(),
            role_description: String::new(),
            instructions: String::new(),
            example_questions: String::new(),
            is_active: true,
        }
    }

    fn text_of(content: &Content) -> &str {
        content.parts[0].text.as_deref().unwrap_or_default()
    }

    #[test]
    fn test_build_request_drops_leading_assistant_and_prefixes_context() {
        let history = vec![
            ChatMessage::assistant("Hi! How can I help?"),
            ChatMessage::user("Wifi password?"),
            ChatMessage::assistant("It is on the fridge."),
            ChatMessage::user("And the sauna?"),
        ];

        let req = build_request(&history, "CTX", false).unwrap();
        let roles: Vec<_> = req.contents.iter().map(|c| c.role.as_str()).collect();
        assert_eq!(roles, vec!["user", "model", "user"]);
        assert_eq!(text_of(&req.contents[0]), "Wifi password?");
        assert_eq!(text_of(&req.contents[2]), "CTX\n\nAnd the sauna?");
        assert!(req.tools.is_empty());
        assert_eq!(req.generation_config, GenerationConfig::default());
    }

    #[test]
    fn test_build_request_first_turn() {
        let history = vec![ChatMessage::assistant("Hi!"), ChatMessage::user("Hello")];
        let req = build_request(&history, "CTX", true).unwrap();
        assert_eq!(req.contents.len(), 1);
        assert_eq!(text_of(&req.contents[0]), "CTX\n\nHello");
        assert_eq!(req.tools.len(), 1);
    }

    #[test]
    fn test_build_request_does_not_mutate_history() {
        let history = vec![ChatMessage::user("Hello")];
        let before = history.clone();
        build_request(&history, "CTX", false).unwrap();
        assert_eq!(history, before);
    }

    #[test]
    fn test_build_request_requires_trailing_user() {
        let history = vec![ChatMessage::user("Hello"), ChatMessage::assistant("Hi")];
        let err = build_request(&history, "CTX", false).unwrap_err();
        assert!(matches!(err, ProviderError::RequestFailed { status: None, .. }));

        assert!(build_request(&[], "CTX", false).is_err());
    }

    #[test]
    fn test_request_wire_shape() {
        let req = build_request(&[ChatMessage::user("Hi")], "CTX", true).unwrap();
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 2048);
        assert_eq!(json["generationConfig"]["topK"], 10);
        assert_eq!(json["tools"][0]["google_search"], serde_json::json!({}));
        assert_eq!(json["contents"][0]["role"], "user");
    }

    #[test]
    fn test_parse_response_with_grounding() {
        let body = serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "The sauna "}, {"text": "is by the lake."}]},
                "groundingMetadata": {
                    "webSearchQueries": ["cabin sauna"],
                    "searchEntryPoint": {"renderedContent": "<a href=\"https://x.test\">x</a>"},
                    "groundingChunks": [{"web": {"uri": "https://x.test"}}]
                }
            }],
            "modelVersion": "gemini-2.5-flash-001",
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 7}
        });
        let parsed: GenerateContentResponse = serde_json::from_value(body).unwrap();

        let resp = parse_response(parsed, "gemini-2.5-flash").unwrap();
        assert_eq!(resp.text, "The sauna is by the lake.");
        assert_eq!(resp.model.as_deref(), Some("gemini-2.5-flash-001"));
        assert_eq!(
            resp.usage,
            Some(Usage {
                input_tokens: 12,
                output_tokens: 7
            })
        );
        let grounding = resp.grounding_metadata.unwrap();
        assert_eq!(grounding.web_search_queries, vec!["cabin sauna"]);
        assert!(grounding.extra.contains_key("groundingChunks"));
    }

    #[test]
    fn test_parse_response_without_grounding_uses_configured_model() {
        let body = serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "Hi"}]}}]
        });
        let parsed: GenerateContentResponse = serde_json::from_value(body).unwrap();
        let resp = parse_response(parsed, "gemini-2.5-flash").unwrap();
        assert!(resp.grounding_metadata.is_none());
        assert_eq!(resp.model.as_deref(), Some("gemini-2.5-flash"));
    }

    #[test]
    fn test_parse_response_malformed() {
        let empty: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(matches!(
            parse_response(empty, "m"),
            Err(ProviderError::MalformedResponse(_))
        ));

        let no_content: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({"candidates": [{}]})).unwrap();
        assert!(matches!(
            parse_response(no_content, "m"),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_key_and_model_are_distinct() {
        let history = vec![ChatMessage::user("Hello")];

        let no_key = provider(None, Some("gemini-2.5-flash"));
        let err = no_key.generate(&history, "CTX", &config()).await.unwrap_err();
        assert!(matches!(&err, ProviderError::NotConfigured(m) if m.contains("GEMINI_API_KEY")));

        let no_model = provider(Some("k"), None);
        let err = no_model.generate(&history, "CTX", &config()).await.unwrap_err();
        assert!(matches!(&err, ProviderError::NotConfigured(m) if m.contains("GEMINI_MODEL")));
    }

    #[test]
    fn test_url_and_blank_model() {
        let p = provider(Some("k"), Some("gemini-2.5-flash"))
            .with_base_url("http://localhost:9".to_string());
        assert_eq!(
            p.url("gemini-2.5-flash"),
            "http://localhost:9/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(p.name(), "gemini");
        assert!(provider(Some("k"), Some("  ")).model().is_none());
    }
}
