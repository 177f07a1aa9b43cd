//! OpenRouter chat provider (OpenAI-shaped REST API over reqwest).

pub mod client;
pub mod types;

pub use client::OpenRouterProvider;
