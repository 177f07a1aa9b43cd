//! System context assembly and per-session caching.

pub mod builder;
pub mod cache;

pub use builder::build_context;
pub use cache::SystemContextCache;
