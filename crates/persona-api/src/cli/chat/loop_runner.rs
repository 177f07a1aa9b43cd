//! Main chat loop.
//!
//! Opens a live session for a published bot, prints the greeting, then
//! alternates between reading a line and either running a slash command
//! or sending the line to the bot. The session is closed on exit; its
//! transcript, if any exchange happened, stays in the store.

use std::time::Duration;

use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use persona_core::chat::feedback::{FeedbackController, FeedbackOutcome};
use persona_core::chat::orchestrator::{ConversationOrchestrator, SendOutcome};
use persona_core::chat::repository::TranscriptRepository;
use persona_types::chat::{ChatMessage, Feedback, MessageRole};
use persona_types::error::ChatError;

use crate::state::AppState;

use super::commands::{self, ChatCommand};
use super::prompter::TerminalPrompter;

/// Run the interactive chat loop for the bot published as `publish_id`.
pub async fn run_chat_loop(state: &AppState, publish_id: &str) -> anyhow::Result<()> {
    let live = state.chat_service.open_session(publish_id).await?;
    let provider = state.chat_service.provider();

    println!();
    println!("  {}", style(&live.config().name).cyan().bold());
    println!(
        "  {}  {} {}",
        style("Provider:").bold(),
        style(provider.name()).dim(),
        style(provider.model().unwrap_or("(no model)")).dim()
    );
    println!(
        "  {}",
        style("Type /help for commands, /exit to leave.").dim()
    );
    println!();
    print_messages(&live.session().messages);

    loop {
        let Some(line) = read_line().await else {
            break;
        };

        match commands::parse(&line) {
            Some(ChatCommand::Exit) => break,
            Some(ChatCommand::Help) => commands::print_help(),
            Some(ChatCommand::History) => print_messages(&live.session().messages),
            Some(ChatCommand::Rate { index, verdict }) => {
                rate(&*live, index, verdict).await;
            }
            Some(ChatCommand::Unknown(hint)) => {
                println!("  {} {hint}", style("?").yellow().bold());
            }
            None => {
                let spinner = thinking_spinner();
                let outcome = live.send_user_message(&line).await;
                spinner.finish_and_clear();

                match outcome {
                    SendOutcome::Replied(_) | SendOutcome::Failed(_) => {
                        let session = live.session();
                        if let Some((index, message)) = session.messages.iter().enumerate().last()
                        {
                            print_message(index, message);
                        }
                    }
                    SendOutcome::Ignored(reason) => {
                        debug!(?reason, "Send ignored");
                    }
                }
            }
        }
    }

    let session = live.session();
    state.chat_service.close(&live.session_id());
    match session.persisted_id {
        Some(id) => println!(
            "\n  {} Transcript saved as {}",
            style("✓").green().bold(),
            style(id).dim()
        ),
        None => println!("\n  {}", style("Nothing to save.").dim()),
    }
    Ok(())
}

async fn rate<R: TranscriptRepository>(
    live: &ConversationOrchestrator<R>,
    index: usize,
    verdict: Feedback,
) {
    match FeedbackController::set_feedback(live, index, verdict, &TerminalPrompter).await {
        Ok(FeedbackOutcome::Applied(_)) => {
            println!("  {} Thanks for the feedback.", style("✓").green().bold());
        }
        Ok(FeedbackOutcome::Cancelled) => {
            println!("  {}", style("Feedback cancelled.").dim());
        }
        Err(ChatError::AlreadyFeedback) => {
            println!(
                "  {} You have already given feedback for message #{index}.",
                style("!").yellow().bold()
            );
        }
        Err(ChatError::InvalidFeedbackTarget(_)) => {
            println!(
                "  {} #{index} is not a bot message.",
                style("!").yellow().bold()
            );
        }
        Err(e) => {
            println!("  {} {e}", style("✗").red().bold());
        }
    }
}

/// Read one line of input; `None` on end of input or interrupt.
async fn read_line() -> Option<String> {
    tokio::task::spawn_blocking(|| {
        Input::<String>::new()
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()
    })
    .await
    .ok()?
    .ok()
}

fn thinking_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Thinking...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

fn print_messages(messages: &[ChatMessage]) {
    for (index, message) in messages.iter().enumerate() {
        print_message(index, message);
    }
}

fn print_message(index: usize, message: &ChatMessage) {
    let label = match message.role {
        MessageRole::System => return,
        MessageRole::User => style("You").green().bold(),
        MessageRole::Assistant if message.is_error => style("Bot").red().bold(),
        MessageRole::Assistant => style("Bot").cyan().bold(),
    };

    let verdict = match message.feedback {
        Some(Feedback::Good) => format!(" {}", style("[good]").green()),
        Some(Feedback::Bad) => format!(" {}", style("[bad]").red()),
        None => String::new(),
    };

    println!("  {} {label}{verdict}", style(format!("#{index}")).dim());
    for line in message.content.lines() {
        println!("    {line}");
    }

    if let Some(grounding) = &message.grounding_metadata {
        for link in grounding.links() {
            println!("    {} {} {}", style("↗").dim(), link.text, style(link.url).dim());
        }
    }
    println!();
}
