//! Bot configuration CLI commands: import, list, show.

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use secrecy::ExposeSecret;
use serde::Deserialize;

use persona_core::repository::bot::BotConfigRepository;
use persona_infra::config::resolve_provider_settings;
use persona_types::bot::BotConfiguration;

use crate::state::AppState;

/// A file of `[[bots]]` tables.
#[derive(Debug, Deserialize)]
struct BotFile {
    #[serde(default)]
    bots: Vec<BotConfiguration>,
}

fn parse_bot_file(content: &str) -> Result<Vec<BotConfiguration>> {
    let file: BotFile = toml::from_str(content)?;
    for bot in &file.bots {
        if bot.publish_id.trim().is_empty() {
            anyhow::bail!("bot '{}' has an empty publish_id", bot.name);
        }
    }
    Ok(file.bots)
}

/// Import (insert or replace) bot configurations from a TOML file.
///
/// ```toml
/// [[bots]]
/// publish_id = "cabin-42"
/// name = "Cabin helper"
/// role_description = "You help guests of a lakeside cabin."
/// ```
pub async fn import_configs(state: &AppState, file: &Path, json: bool) -> Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let bots = parse_bot_file(&content)
        .with_context(|| format!("failed to parse {}", file.display()))?;

    for bot in &bots {
        state.chat_service.bots().upsert(bot).await?;
    }
    tracing::info!(count = bots.len(), "Bot configurations imported");

    if json {
        let ids: Vec<_> = bots.iter().map(|b| b.publish_id.as_str()).collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "imported": ids }))?
        );
        return Ok(());
    }

    println!();
    for bot in &bots {
        println!(
            "  {} {} {}",
            style("✓").green().bold(),
            style(&bot.name).cyan(),
            style(format!("({})", bot.publish_id)).dim()
        );
    }
    println!();
    println!(
        "  {} configuration{} imported",
        style(bots.len()).bold(),
        if bots.len() == 1 { "" } else { "s" }
    );
    println!();
    Ok(())
}

/// List configured bots in a table.
pub async fn list_configs(state: &AppState, json: bool) -> Result<()> {
    let bots = state.chat_service.bots().list().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&bots)?);
        return Ok(());
    }

    if bots.is_empty() {
        println!();
        println!(
            "  {} No bots configured. Import some with: {}",
            style("i").blue().bold(),
            style("persona config import bots.toml").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Name").fg(Color::White),
        Cell::new("Publish ID").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Role").fg(Color::White),
    ]);

    for bot in &bots {
        let status = if bot.is_active {
            Cell::new("● active").fg(Color::Green)
        } else {
            Cell::new("○ inactive").fg(Color::Yellow)
        };
        table.add_row(vec![
            Cell::new(&bot.name).fg(Color::Cyan),
            Cell::new(&bot.publish_id),
            status,
            Cell::new(truncate(&bot.role_description, 50)),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}

/// Show the provider this deployment talks to and where settings came from.
pub async fn show_config(state: &AppState, json: bool) -> Result<()> {
    let provider = state.chat_service.provider();
    let settings = resolve_provider_settings(&state.config, |k| std::env::var(k).ok());
    let key_set = settings
        .api_key
        .as_ref()
        .is_some_and(|k| !k.expose_secret().is_empty());

    if json {
        let out = serde_json::json!({
            "provider": provider.name(),
            "model": provider.model(),
            "api_key_set": key_set,
            "gemini_grounding": settings.gemini_grounding,
            "site_url": settings.site_url,
            "greeting": state.config.greeting,
            "data_dir": state.data_dir.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let key_display = if key_set {
        style("set".to_string()).green()
    } else {
        style("missing".to_string()).red()
    };

    println!();
    println!("  {}", style("── Provider ──").dim());
    println!("  {}   {}", style("Backend:").bold(), style(provider.name()).cyan());
    println!(
        "  {}     {}",
        style("Model:").bold(),
        provider.model().unwrap_or("(unset)")
    );
    println!("  {}   {}", style("API key:").bold(), key_display);
    if settings.provider == persona_types::llm::ProviderType::Gemini {
        println!(
            "  {} {}",
            style("Grounding:").bold(),
            if settings.gemini_grounding { "on" } else { "off" }
        );
    }
    println!();
    println!("  {}", style("── Widget ──").dim());
    println!("  {}  {}", style("Greeting:").bold(), state.config.greeting);
    println!("  {}  {}", style("Site URL:").bold(), settings.site_url);
    println!(
        "  {}  {}",
        style("Data dir:").bold(),
        style(state.data_dir.display()).dim()
    );
    println!();
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max - 3).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bot_file() {
        let bots = parse_bot_file(
            r#"
[[bots]]
publish_id = "cabin"
name = "Cabin helper"
instructions = "Check-in at 15:00."

[[bots]]
publish_id = "boat"
name = "Boat rental"
is_active = false
"#,
        )
        .unwrap();
        assert_eq!(bots.len(), 2);
        assert_eq!(bots[0].instructions, "Check-in at 15:00.");
        assert!(!bots[1].is_active);
    }

    #[test]
    fn test_parse_bot_file_rejects_blank_publish_id() {
        let err = parse_bot_file(
            r#"
[[bots]]
publish_id = "  "
name = "Nameless"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("empty publish_id"));
    }

    #[test]
    fn test_parse_empty_file() {
        assert!(parse_bot_file("").unwrap().is_empty());
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 50), "short");
        let long = "å".repeat(60);
        assert_eq!(truncate(&long, 50).chars().count(), 50);
    }

    #[tokio::test]
    async fn test_import_upserts_into_store() {
        let state = crate::state::testing::test_state(Ok(
            persona_types::llm::NormalizedResponse::text("x"),
        ))
        .await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bots.toml");
        std::fs::write(
            &path,
            "[[bots]]\npublish_id = \"cabin\"\nname = \"Renamed cabin\"\n",
        )
        .unwrap();

        import_configs(&state, &path, true).await.unwrap();

        let bots = state.chat_service.bots().list().await.unwrap();
        assert_eq!(bots.len(), 1);
        assert_eq!(bots[0].name, "Renamed cabin");
    }
}
