//! BoxChatProvider -- object-safe dynamic dispatch wrapper for ChatProvider.
//!
//! 1. `ChatProviderDyn` is the object-safe mirror with a boxed future
//! 2. Blanket-impl `ChatProviderDyn` for all `T: ChatProvider`
//! 3. `BoxChatProvider` wraps `Box<dyn ChatProviderDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use persona_types::bot::BotConfiguration;
use persona_types::chat::ChatMessage;
use persona_types::llm::{NormalizedResponse, ProviderError};

use super::provider::ChatProvider;

type GenerateFuture<'a> =
    Pin<Box<dyn Future<Output = Result<NormalizedResponse, ProviderError>> + Send + 'a>>;

/// Object-safe version of [`ChatProvider`] with a boxed future.
pub trait ChatProviderDyn: Send + Sync {
    fn name(&self) -> &str;

    fn model(&self) -> Option<&str>;

    fn generate_boxed<'a>(
        &'a self,
        history: &'a [ChatMessage],
        system_context: &'a str,
        config: &'a BotConfiguration,
    ) -> GenerateFuture<'a>;
}

impl<T: ChatProvider> ChatProviderDyn for T {
    fn name(&self) -> &str {
        ChatProvider::name(self)
    }

    fn model(&self) -> Option<&str> {
        ChatProvider::model(self)
    }

    fn generate_boxed<'a>(
        &'a self,
        history: &'a [ChatMessage],
        system_context: &'a str,
        config: &'a BotConfiguration,
    ) -> GenerateFuture<'a> {
        Box::pin(self.generate(history, system_context, config))
    }
}

/// Type-erased chat provider chosen once at startup.
///
/// `ChatProvider` uses RPITIT and cannot be a trait object directly;
/// this wrapper exposes the same methods over `dyn ChatProviderDyn`.
pub struct BoxChatProvider {
    inner: Box<dyn ChatProviderDyn + Send + Sync>,
}

impl BoxChatProvider {
    pub fn new<T: ChatProvider + 'static>(provider: T) -> Self {
        Self {
            inner: Box::new(provider),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn model(&self) -> Option<&str> {
        self.inner.model()
    }

    pub async fn generate(
        &self,
        history: &[ChatMessage],
        system_context: &str,
        config: &BotConfiguration,
    ) -> Result<NormalizedResponse, ProviderError> {
        self.inner
            .generate_boxed(history, system_context, config)
            .await
    }
}

impl std::fmt::Debug for BoxChatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxChatProvider")
            .field("name", &self.name())
            .field("model", &self.model())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoProvider;

    impl ChatProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        fn model(&self) -> Option<&str> {
            Some("echo-1")
        }

        fn generate(
            &self,
            history: &[ChatMessage],
            system_context: &str,
            _config: &BotConfiguration,
        ) -> impl Future<Output = Result<NormalizedResponse, ProviderError>> + Send {
            let last = history.last().map(|m| m.content.clone()).unwrap_or_default();
            let text = format!("{system_context}|{last}");
            async move { Ok(NormalizedResponse::text(text)) }
        }
    }

    fn config() -> BotConfiguration {
        BotConfiguration {
            publish_id: "p".to_string(),
            name: "Echo".to_string(),
            role_description: String::new(),
            instructions: String::new(),
            example_questions: String::new(),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_box_provider_delegates() {
        let provider = BoxChatProvider::new(EchoProvider);
        assert_eq!(provider.name(), "echo");
        assert_eq!(provider.model(), Some("echo-1"));

        let history = vec![ChatMessage::user("ping")];
        let resp = provider.generate(&history, "ctx", &config()).await.unwrap();
        assert_eq!(resp.text, "ctx|ping");
    }
}
