//! SQLite bot configuration repository.
//!
//! Implements `BotConfigRepository` from `persona-core` using sqlx with split read/write pools.

use chrono::Utc;
use persona_core::repository::bot::BotConfigRepository;
use persona_types::bot::BotConfiguration;
use persona_types::error::RepositoryError;
use sqlx::Row;

use super::format_datetime;
use super::pool::DatabasePool;

/// SQLite-backed implementation of `BotConfigRepository`.
#[derive(Clone)]
pub struct SqliteBotConfigRepository {
    pool: DatabasePool,
}

impl SqliteBotConfigRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to `BotConfiguration`.
struct BotConfigRow {
    publish_id: String,
    name: String,
    role_description: String,
    instructions: String,
    example_questions: String,
    is_active: bool,
}

impl BotConfigRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            publish_id: row.try_get("publish_id")?,
            name: row.try_get("name")?,
            role_description: row.try_get("role_description")?,
            instructions: row.try_get("instructions")?,
            example_questions: row.try_get("example_questions")?,
            is_active: row.try_get("is_active")?,
        })
    }

    fn into_config(self) -> BotConfiguration {
        BotConfiguration {
            publish_id: self.publish_id,
            name: self.name,
            role_description: self.role_description,
            instructions: self.instructions,
            example_questions: self.example_questions,
            is_active: self.is_active,
        }
    }
}

impl BotConfigRepository for SqliteBotConfigRepository {
    async fn get_by_publish_id(
        &self,
        publish_id: &str,
    ) -> Result<Option<BotConfiguration>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM bot_configs WHERE publish_id = ?")
            .bind(publish_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.map(|row| {
            BotConfigRow::from_row(&row)
                .map(BotConfigRow::into_config)
                .map_err(|e| RepositoryError::Query(e.to_string()))
        })
        .transpose()
    }

    async fn upsert(&self, config: &BotConfiguration) -> Result<(), RepositoryError> {
        let now = format_datetime(&Utc::now());

        sqlx::query(
            "INSERT INTO bot_configs (publish_id, name, role_description, instructions, example_questions, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(publish_id) DO UPDATE SET
                name = excluded.name,
                role_description = excluded.role_description,
                instructions = excluded.instructions,
                example_questions = excluded.example_questions,
                is_active = excluded.is_active,
                updated_at = excluded.updated_at",
        )
        .bind(&config.publish_id)
        .bind(&config.name)
        .bind(&config.role_description)
        .bind(&config.instructions)
        .bind(&config.example_questions)
        .bind(config.is_active)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<BotConfiguration>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM bot_configs ORDER BY name ASC")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                BotConfigRow::from_row(row)
                    .map(BotConfigRow::into_config)
                    .map_err(|e| RepositoryError::Query(e.to_string()))
            })
            .collect()
    }
}
