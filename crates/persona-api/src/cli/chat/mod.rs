//! Interactive terminal chat, the CLI counterpart of the embedded widget.

pub mod commands;
pub mod loop_runner;
pub mod prompter;

pub use loop_runner::run_chat_loop;
