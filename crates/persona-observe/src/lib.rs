//! Observability for Persona: structured logging with an optional
//! OpenTelemetry bridge for the `gen_ai.chat` spans around provider calls.

pub mod tracing_setup;

pub use tracing_setup::{Verbosity, init_tracing, shutdown_tracing};
