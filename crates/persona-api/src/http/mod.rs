//! HTTP/REST API layer for Persona.
//!
//! Axum-based REST API at `/api/v1/` serving the chat widget (open) and the
//! transcript review tool (API key required), with envelope responses and
//! CORS support.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
