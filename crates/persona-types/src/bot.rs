//! Operator-authored bot configuration.
//!
//! Configurations are owned by the workbench and read-only to the chat
//! engine: a session derives its system context from one exactly once.

use serde::{Deserialize, Serialize};

/// The persona a published chat widget speaks as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotConfiguration {
    /// Public identifier embedded in the widget URL.
    pub publish_id: String,
    /// Display name shown in the chat header.
    pub name: String,
    #[serde(default)]
    pub role_description: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub example_questions: String,
    /// Inactive bots cannot be chatted with.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}
