//! Google Gemini chat provider.
//!
//! Talks to the native `generateContent` endpoint rather than the
//! OpenAI-compatible one, so grounding metadata comes back intact.

pub mod client;
pub mod types;

pub use client::GeminiProvider;
