//! Live conversation engine for Persona.
//!
//! - `orchestrator`: one live session, its Idle/Sending state, and turn handling
//! - `feedback`: write-once per-message verdicts
//! - `persistence`: serialized create-or-update of transcripts
//! - `review`: read/delete access to stored transcripts
//! - `service`: registry of live sessions keyed by session id

pub mod feedback;
pub mod orchestrator;
pub mod persistence;
pub mod repository;
pub mod review;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;
