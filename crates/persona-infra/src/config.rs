//! Global configuration loader for Persona.
//!
//! Reads `config.toml` from the data directory (`~/.persona/` in production)
//! and deserializes it into [`GlobalConfig`]. Falls back to defaults when the
//! file is missing or malformed. Environment variables then override the
//! file when the provider settings are resolved.

use std::path::Path;

use secrecy::SecretString;

use persona_types::config::GlobalConfig;
use persona_types::llm::ProviderType;

use crate::llm::ProviderSettings;

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`GlobalConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
    };

    match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GlobalConfig::default()
        }
    }
}

/// Resolve the active provider and its credentials.
///
/// `lookup` reads a variable by name; production passes
/// `|k| std::env::var(k).ok()`. Blank values count as unset.
///
/// Precedence: environment over `config.toml` over built-in defaults. Only
/// the selected provider's key is read.
pub fn resolve_provider_settings(
    config: &GlobalConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> ProviderSettings {
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let provider = match var("PERSONA_PROVIDER").map(|v| v.parse::<ProviderType>()) {
        Some(Ok(provider)) => provider,
        Some(Err(err)) => {
            tracing::warn!("Ignoring PERSONA_PROVIDER: {err}");
            config.provider
        }
        None => config.provider,
    };

    let (key_var, model) = match provider {
        ProviderType::Gemini => (
            "GEMINI_API_KEY",
            var("GEMINI_MODEL").or_else(|| config.gemini_model.clone()),
        ),
        ProviderType::OpenAi => (
            "OPENAI_API_KEY",
            Some(var("OPENAI_MODEL").unwrap_or_else(|| config.openai_model.clone())),
        ),
        ProviderType::OpenRouter => (
            "OPENROUTER_API_KEY",
            Some(var("OPENROUTER_MODEL").unwrap_or_else(|| config.openrouter_model.clone())),
        ),
    };

    let gemini_grounding = var("GEMINI_GROUNDING")
        .map(|v| is_truthy(&v))
        .unwrap_or(config.gemini_grounding);

    ProviderSettings {
        provider,
        api_key: var(key_var).map(SecretString::from),
        model,
        gemini_grounding,
        site_url: var("PERSONA_SITE_URL").unwrap_or_else(|| config.site_url.clone()),
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
