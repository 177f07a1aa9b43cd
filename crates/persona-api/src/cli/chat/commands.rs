//! Slash command parsing for the chat loop.
//!
//! Commands start with `/`; anything else is sent to the bot.

use console::style;

use persona_types::chat::Feedback;

/// Available slash commands in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    /// Show available commands.
    Help,
    /// Exit the chat session.
    Exit,
    /// Reprint the conversation.
    History,
    /// Rate the message shown as `#index`.
    Rate { index: usize, verdict: Feedback },
    /// Unknown or malformed command, with a hint.
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let mut parts = trimmed.split_whitespace();
    let cmd = parts.next().unwrap_or_default().to_lowercase();
    let arg = parts.next();

    let command = match cmd.as_str() {
        "/help" | "/h" | "/?" => ChatCommand::Help,
        "/exit" | "/quit" | "/q" => ChatCommand::Exit,
        "/history" => ChatCommand::History,
        "/good" | "/bad" | "/up" | "/down" => {
            let verdict = match cmd.as_str() {
                "/good" | "/up" => Feedback::Good,
                _ => Feedback::Bad,
            };
            match arg.map(|a| a.trim_start_matches('#').parse::<usize>()) {
                Some(Ok(index)) => ChatCommand::Rate { index, verdict },
                _ => ChatCommand::Unknown(format!("{cmd} needs a message number, e.g. {cmd} 3")),
            }
        }
        other => ChatCommand::Unknown(format!("unknown command {other}")),
    };
    Some(command)
}

/// Print the command reference.
pub fn print_help() {
    println!();
    println!("  {}", style("Commands").bold());
    for (cmd, desc) in [
        ("/good <n>", "Mark message #n as helpful"),
        ("/bad <n>", "Mark message #n as unhelpful (asks for a comment)"),
        ("/history", "Show the conversation so far"),
        ("/help", "Show this help"),
        ("/exit", "End the chat"),
    ] {
        println!("  {}  {}", style(format!("{cmd:<10}")).yellow(), style(desc).dim());
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(parse("Where is the sauna?"), None);
    }

    #[test]
    fn test_basic_commands() {
        assert_eq!(parse("/exit"), Some(ChatCommand::Exit));
        assert_eq!(parse("  /Q "), Some(ChatCommand::Exit));
        assert_eq!(parse("/?"), Some(ChatCommand::Help));
        assert_eq!(parse("/history"), Some(ChatCommand::History));
    }

    #[test]
    fn test_rate_commands() {
        assert_eq!(
            parse("/good 3"),
            Some(ChatCommand::Rate {
                index: 3,
                verdict: Feedback::Good
            })
        );
        assert_eq!(
            parse("/down #5"),
            Some(ChatCommand::Rate {
                index: 5,
                verdict: Feedback::Bad
            })
        );
        assert!(matches!(parse("/bad"), Some(ChatCommand::Unknown(_))));
        assert!(matches!(parse("/bad x"), Some(ChatCommand::Unknown(_))));
    }

    #[test]
    fn test_unknown_command() {
        assert!(matches!(parse("/nope"), Some(ChatCommand::Unknown(m)) if m.contains("/nope")));
    }
}
