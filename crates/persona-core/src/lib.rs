//! Conversation orchestration and repository trait definitions for Persona.
//!
//! This crate defines the "ports" (provider, repository, and prompter traits)
//! that the infrastructure layer implements, plus the engine that drives a
//! live conversation: system context caching, turn orchestration, write-once
//! feedback, and transcript upserts. It depends only on `persona-types` --
//! never on `persona-infra` or any database/IO crate.

pub mod chat;
pub mod context;
pub mod llm;
pub mod repository;
