//! CLI command definitions and dispatch for the `persona` binary.
//!
//! Uses clap derive macros for argument parsing. The CLI follows a
//! noun-verb pattern (e.g., `persona transcripts list`).

pub mod chat;
pub mod config;
pub mod transcripts;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Embeddable chat assistants backed by Gemini, OpenAI or OpenRouter.
#[derive(Parser)]
#[command(name = "persona", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server for the chat widget and review tool.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Start an interactive chat session with a published bot.
    Chat {
        /// Publish id of the bot to chat with.
        publish_id: String,
    },

    /// Manage bot configurations.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },

    /// Review stored conversation transcripts.
    #[command(alias = "t")]
    Transcripts {
        #[command(subcommand)]
        action: TranscriptCommand,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Import bot configurations from a TOML file (`[[bots]]` tables).
    Import {
        /// Path to the TOML file.
        file: PathBuf,
    },

    /// List configured bots.
    #[command(alias = "ls")]
    List,

    /// Show the active provider settings.
    Show,
}

#[derive(Subcommand)]
pub enum TranscriptCommand {
    /// List transcripts, newest first.
    #[command(alias = "ls")]
    List {
        /// Only transcripts of this bot.
        #[arg(long)]
        publish_id: Option<String>,
    },

    /// Show a full transcript.
    Show {
        /// Transcript id.
        id: String,
    },

    /// Permanently delete a transcript.
    #[command(alias = "rm")]
    Delete {
        /// Transcript id.
        id: String,

        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_transcripts_delete() {
        let cli = Cli::try_parse_from(["persona", "-v", "transcripts", "rm", "abc", "--force"])
            .unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Transcripts {
                action: TranscriptCommand::Delete { id, force },
            } => {
                assert_eq!(id, "abc");
                assert!(force);
            }
            _ => panic!("expected transcripts delete"),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "persona",
            "transcripts",
            "list",
            "--publish-id",
            "cabin",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Transcripts {
                action: TranscriptCommand::List { publish_id: Some(ref p) }
            } if p == "cabin"
        ));
    }
}
