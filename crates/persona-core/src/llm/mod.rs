//! LLM provider abstractions for Persona.
//!
//! - `ChatProvider`: RPITIT trait for concrete backend adapters
//! - `BoxChatProvider`: Object-safe wrapper for runtime provider selection

pub mod box_provider;
pub mod provider;

pub use box_provider::BoxChatProvider;
pub use provider::ChatProvider;
