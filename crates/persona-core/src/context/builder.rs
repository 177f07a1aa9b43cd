//! Builds the system context a bot speaks from.
//!
//! The layout is fixed: the role description, then the operator's
//! instructions, then example Q&A. Empty fields stay in place as empty
//! sections so every provider sees the same shape.

use persona_types::bot::BotConfiguration;

/// Assemble the system context string for a bot configuration.
pub fn build_context(config: &BotConfiguration) -> String {
    format!(
        "{}\n\nInstructions and Knowledge:\n{}\n\nExample Q&A:\n{}",
        config.role_description, config.instructions, config.example_questions
    )
}
