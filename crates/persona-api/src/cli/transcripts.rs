//! Transcript review CLI commands: list, show, delete.

use anyhow::Result;
use chrono::{DateTime, Utc};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;

use persona_types::chat::{Feedback, MessageRole};
use persona_types::transcript::TranscriptRecord;

use crate::state::AppState;

/// List transcripts, newest first, optionally for one bot.
pub async fn list_transcripts(state: &AppState, publish_id: Option<&str>, json: bool) -> Result<()> {
    let summaries = state.review_service.list(publish_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!();
        println!("  {} No transcripts yet.", style("i").blue().bold());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Bot").fg(Color::White),
        Cell::new("Started").fg(Color::White),
        Cell::new("Msgs").fg(Color::White),
        Cell::new("👍").fg(Color::White),
        Cell::new("👎").fg(Color::White),
        Cell::new("Preview").fg(Color::White),
    ]);

    for summary in &summaries {
        table.add_row(vec![
            Cell::new(&summary.id).fg(Color::DarkGrey),
            Cell::new(&summary.bot_name).fg(Color::Cyan),
            Cell::new(format_timestamp(&summary.created_at)),
            Cell::new(summary.message_count),
            Cell::new(summary.good_feedback).fg(Color::Green),
            Cell::new(summary.bad_feedback).fg(Color::Red),
            Cell::new(&summary.preview),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} transcript{}",
        style(summaries.len()).bold(),
        if summaries.len() == 1 { "" } else { "s" }
    );
    println!();
    Ok(())
}

/// Print one transcript with every message and its feedback.
pub async fn show_transcript(state: &AppState, id: &str, json: bool) -> Result<()> {
    let record = state.review_service.get(id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    print_transcript(&record);
    Ok(())
}

/// Delete a transcript after confirmation (skipped by `--force` or `--json`).
pub async fn delete_transcript(state: &AppState, id: &str, force: bool, json: bool) -> Result<()> {
    if !force && !json {
        let prompt = format!("Permanently delete transcript {id}?");
        let confirmed = tokio::task::spawn_blocking(move || {
            Confirm::new()
                .with_prompt(prompt)
                .default(false)
                .interact()
        })
        .await??;

        if !confirmed {
            println!("  {}", style("Cancelled.").dim());
            return Ok(());
        }
    }

    state.review_service.delete(id).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "deleted": true, "id": id }))?
        );
    } else {
        println!("  {} Transcript {} deleted.", style("✓").green().bold(), style(id).dim());
    }
    Ok(())
}

fn print_transcript(record: &TranscriptRecord) {
    println!();
    println!("  {}", style(&record.bot_name).cyan().bold());
    println!(
        "  {} {}  {} {}",
        style("Started:").bold(),
        format_timestamp(&record.created_at),
        style("Updated:").bold(),
        format_timestamp(&record.updated_at)
    );
    println!("  {}", style(&record.id).dim());
    println!();

    for message in &record.messages {
        let who = match message.role {
            MessageRole::User => style("User").green().bold(),
            MessageRole::Assistant if message.is_error => style("Bot (error)").red().bold(),
            MessageRole::Assistant => style("Bot").cyan().bold(),
            MessageRole::System => continue,
        };
        println!(
            "  {who} {}",
            style(format_timestamp(&message.timestamp)).dim()
        );
        for line in message.content.lines() {
            println!("    {line}");
        }

        match message.feedback {
            Some(Feedback::Good) => println!("    {}", style("👍 good").green()),
            Some(Feedback::Bad) => {
                let comment = message.feedback_comment.as_deref().unwrap_or("");
                println!("    {} {}", style("👎 bad").red(), style(comment).italic());
            }
            None => {}
        }
        println!();
    }
}

fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        let at = DateTime::parse_from_rfc3339("2026-03-01T09:05:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_timestamp(&at), "2026-03-01 09:05");
    }
}
