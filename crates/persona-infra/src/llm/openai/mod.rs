//! OpenAI chat provider.
//!
//! Uses [`async_openai`] for the Chat Completions request and response
//! types. The bot's system context is sent as a single leading `system`
//! message.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
    CreateChatCompletionResponse,
};
use secrecy::{ExposeSecret, SecretString};

use persona_core::llm::provider::{ChatProvider, conversation_turns};
use persona_types::bot::BotConfiguration;
use persona_types::chat::ChatMessage;
use persona_types::llm::{MessageRole, NormalizedResponse, ProviderError, Usage};

pub const DEFAULT_MODEL: &str = "gpt-4";

const TEMPERATURE: f32 = 0.7;
const TOP_P: f32 = 1.0;

/// OpenAI chat provider.
///
/// Holds no client when the key is missing; `generate` then reports
/// `NotConfigured`. Does NOT derive Debug: the async-openai client holds
/// the API key.
pub struct OpenAiProvider {
    client: Option<Client<OpenAIConfig>>,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: Option<&SecretString>, model: Option<String>) -> Self {
        let client = api_key.map(|key| {
            Client::with_config(OpenAIConfig::new().with_api_key(key.expose_secret()))
        });
        Self {
            client,
            model: model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }
}

fn system_message(content: &str) -> ChatCompletionRequestMessage {
    ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
        content: ChatCompletionRequestSystemMessageContent::Text(content.to_string()),
        name: None,
    })
}

fn turn_message(msg: &ChatMessage) -> ChatCompletionRequestMessage {
    match msg.role {
        MessageRole::Assistant => {
            #[allow(deprecated)]
            ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                    msg.content.clone(),
                )),
                refusal: None,
                name: None,
                audio: None,
                tool_calls: None,
                function_call: None,
            })
        }
        _ => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
            name: None,
        }),
    }
}

/// Build a Chat Completions request: one system message, then the turns.
pub(crate) fn build_request(
    model: &str,
    history: &[ChatMessage],
    system_context: &str,
) -> CreateChatCompletionRequest {
    let messages = std::iter::once(system_message(system_context))
        .chain(conversation_turns(history).map(turn_message))
        .collect();

    CreateChatCompletionRequest {
        model: model.to_string(),
        messages,
        temperature: Some(TEMPERATURE),
        top_p: Some(TOP_P),
        ..Default::default()
    }
}

pub(crate) fn parse_response(
    response: CreateChatCompletionResponse,
) -> Result<NormalizedResponse, ProviderError> {
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| {
            ProviderError::MalformedResponse(
                "OpenAI response has no choices[0].message.content".to_string(),
            )
        })?;

    Ok(NormalizedResponse {
        text,
        grounding_metadata: None,
        model: Some(response.model),
        usage: response.usage.map(|u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        }),
    })
}

impl ChatProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> Option<&str> {
        Some(&self.model)
    }

    async fn generate(
        &self,
        history: &[ChatMessage],
        system_context: &str,
        _config: &BotConfiguration,
    ) -> Result<NormalizedResponse, ProviderError> {
        let client = self.client.as_ref().ok_or_else(|| {
            ProviderError::NotConfigured("OpenAI API key is not set (OPENAI_API_KEY)".to_string())
        })?;

        let request = build_request(&self.model, history, system_context);
        tracing::debug!(model = %self.model, messages = request.messages.len(), "OpenAI request");

        let response = client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;
        parse_response(response)
    }
}

/// Map an `async_openai::error::OpenAIError` to a [`ProviderError`].
fn map_openai_error(err: async_openai::error::OpenAIError) -> ProviderError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => ProviderError::RequestFailed {
            status: None,
            message: api_err.message.clone(),
        },
        OpenAIError::Reqwest(reqwest_err) => ProviderError::RequestFailed {
            status: reqwest_err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        },
        OpenAIError::JSONDeserialize(_, content) => {
            ProviderError::MalformedResponse(format!("failed to parse response: {content}"))
        }
        _ => ProviderError::transport(err.to_string()),
    }
}
