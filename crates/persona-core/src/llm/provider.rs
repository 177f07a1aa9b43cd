//! ChatProvider trait definition.
//!
//! Every backend adapter turns the same normalized history into its own
//! wire format and folds the reply back into a `NormalizedResponse`.

use persona_types::bot::BotConfiguration;
use persona_types::chat::ChatMessage;
use persona_types::llm::{MessageRole, NormalizedResponse, ProviderError};

/// Trait for chat backends (Gemini, OpenAI, OpenRouter).
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
/// Implementations live in persona-infra (e.g., `GeminiProvider`).
pub trait ChatProvider: Send + Sync {
    /// Short provider identifier (e.g., "gemini").
    fn name(&self) -> &str;

    /// Configured model, if any.
    fn model(&self) -> Option<&str>;

    /// Generate the next assistant turn.
    ///
    /// `history` is the conversation without its leading `system` entry and
    /// must end with the user message being answered. The adapter must not
    /// mutate it and must ignore any stray `system` entries.
    fn generate(
        &self,
        history: &[ChatMessage],
        system_context: &str,
        config: &BotConfiguration,
    ) -> impl std::future::Future<Output = Result<NormalizedResponse, ProviderError>> + Send;
}

/// The user/assistant turns of a history, in order.
pub fn conversation_turns(history: &[ChatMessage]) -> impl Iterator<Item = &ChatMessage> {
    history.iter().filter(|m| m.role != MessageRole::System)
}
