//! Per-session system context cache.
//!
//! A session's context is computed at most once; later lookups return the
//! stored value even if the bot configuration has since been edited.

use std::sync::Arc;

use dashmap::DashMap;
use persona_types::bot::BotConfiguration;
use tracing::debug;
use uuid::Uuid;

use super::builder::build_context;

/// Concurrent map from session id to its built system context.
#[derive(Debug, Default)]
pub struct SystemContextCache {
    entries: DashMap<Uuid, Arc<str>>,
}

impl SystemContextCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached context for `session_id`, building it on first use.
    ///
    /// The entry API holds the shard lock while building, so concurrent
    /// callers for the same session observe a single build.
    pub fn get_or_build(&self, session_id: Uuid, config: &BotConfiguration) -> Arc<str> {
        self.entries
            .entry(session_id)
            .or_insert_with(|| {
                debug!(session_id = %session_id, publish_id = %config.publish_id, "Building system context");
                Arc::from(build_context(config))
            })
            .clone()
    }

    /// Drop the entry for a closed session.
    pub fn evict(&self, session_id: &Uuid) -> bool {
        self.entries.remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(role: &str) -> BotConfiguration {
        BotConfiguration {
            publish_id: "pub".to_string(),
            name: "Bot".to_string(),
            role_description: role.to_string(),
            instructions: "I".to_string(),
            example_questions: "E".to_string(),
            is_active: true,
        }
    }

    #[test]
    fn test_context_stable_after_config_change() {
        let cache = SystemContextCache::new();
        let session = Uuid::now_v7();

        let first = cache.get_or_build(session, &config("Original role"));
        let second = cache.get_or_build(session, &config("Edited role"));

        assert_eq!(first, second);
        assert!(second.starts_with("Original role"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_sessions_do_not_share_entries() {
        let cache = SystemContextCache::new();
        let a = cache.get_or_build(Uuid::now_v7(), &config("A"));
        let b = cache.get_or_build(Uuid::now_v7(), &config("B"));
        assert_ne!(a, b);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_evict_rebuilds_on_next_lookup() {
        let cache = SystemContextCache::new();
        let session = Uuid::now_v7();
        cache.get_or_build(session, &config("Old"));

        assert!(cache.evict(&session));
        assert!(!cache.evict(&session));
        assert!(cache.is_empty());

        let rebuilt = cache.get_or_build(session, &config("New"));
        assert!(rebuilt.starts_with("New"));
    }

    #[tokio::test]
    async fn test_concurrent_lookups_build_once() {
        let cache = Arc::new(SystemContextCache::new());
        let session = Uuid::now_v7();

        let mut handles = Vec::new();
        for i in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                cache.get_or_build(session, &config(&format!("role-{i}")))
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        assert!(results.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(cache.len(), 1);
    }
}
