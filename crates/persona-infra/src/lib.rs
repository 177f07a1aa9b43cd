//! Infrastructure layer for Persona.
//!
//! Contains implementations of the ports defined in `persona-core`: SQLite
//! repositories for bot configurations and transcripts, the Gemini, OpenAI
//! and OpenRouter chat providers, and configuration/data-dir loading.

pub mod config;
pub mod filesystem;
pub mod llm;
pub mod sqlite;
