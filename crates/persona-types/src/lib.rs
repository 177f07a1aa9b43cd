//! Shared domain types for Persona.
//!
//! This crate contains the domain types used across the Persona chat engine:
//! bot configuration, conversation sessions and messages, normalized provider
//! responses, transcript records, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror, regex.

pub mod bot;
pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod transcript;
