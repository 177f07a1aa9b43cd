//! Bot configuration repository trait definition.

use persona_types::bot::BotConfiguration;
use persona_types::error::RepositoryError;

/// Repository trait for operator-authored bot configurations.
///
/// The chat engine only reads through `get_by_publish_id`; `upsert` and
/// `list` exist for seeding and inspecting a local store.
pub trait BotConfigRepository: Send + Sync {
    /// Look up a configuration by its public identifier.
    fn get_by_publish_id(
        &self,
        publish_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<BotConfiguration>, RepositoryError>> + Send;

    /// Insert or replace a configuration keyed by `publish_id`.
    fn upsert(
        &self,
        config: &BotConfiguration,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// All configurations, ordered by name.
    fn list(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<BotConfiguration>, RepositoryError>> + Send;
}
