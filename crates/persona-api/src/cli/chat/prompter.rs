//! Terminal comment prompt for negative feedback.

use std::future::Future;

use dialoguer::Input;

use persona_core::chat::feedback::CommentPrompter;

/// Typing this at the comment prompt cancels the verdict.
pub const CANCEL: &str = "/cancel";

/// Asks for the comment on stdin through `dialoguer`.
pub struct TerminalPrompter;

impl CommentPrompter for TerminalPrompter {
    fn prompt_comment(&self) -> impl Future<Output = Option<String>> + Send {
        async {
            let answer = tokio::task::spawn_blocking(|| {
                Input::<String>::new()
                    .with_prompt(format!("  What went wrong? (Enter to skip, {CANCEL} to cancel)"))
                    .allow_empty(true)
                    .interact_text()
            })
            .await;

            match answer {
                Ok(Ok(text)) => interpret(text),
                _ => None,
            }
        }
    }
}

/// `None` for the cancel keyword, the raw text otherwise.
fn interpret(text: String) -> Option<String> {
    if text.trim().eq_ignore_ascii_case(CANCEL) {
        None
    } else {
        Some(text)
    }
}
