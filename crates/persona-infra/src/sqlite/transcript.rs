//! SQLite transcript repository.
//!
//! Each transcript is one row; its messages are stored as a JSON array in
//! the `messages` column, so an update rewrites the whole list.

use chrono::{DateTime, Utc};
use persona_core::chat::repository::TranscriptRepository;
use persona_types::chat::ChatMessage;
use persona_types::error::RepositoryError;
use persona_types::transcript::{NewTranscript, TranscriptRecord};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime};

/// SQLite-backed implementation of `TranscriptRepository`.
#[derive(Clone)]
pub struct SqliteTranscriptRepository {
    pool: DatabasePool,
}

impl SqliteTranscriptRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct TranscriptRow {
    id: String,
    publish_id: String,
    bot_name: String,
    messages: String,
    created_at: String,
    updated_at: String,
}

impl TranscriptRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, RepositoryError> {
        let get = |e: sqlx::Error| RepositoryError::Query(e.to_string());
        Ok(Self {
            id: row.try_get("id").map_err(get)?,
            publish_id: row.try_get("publish_id").map_err(get)?,
            bot_name: row.try_get("bot_name").map_err(get)?,
            messages: row.try_get("messages").map_err(get)?,
            created_at: row.try_get("created_at").map_err(get)?,
            updated_at: row.try_get("updated_at").map_err(get)?,
        })
    }

    fn into_record(self) -> Result<TranscriptRecord, RepositoryError> {
        let messages: Vec<ChatMessage> = serde_json::from_str(&self.messages)
            .map_err(|e| RepositoryError::Query(format!("invalid messages JSON: {e}")))?;

        Ok(TranscriptRecord {
            id: self.id,
            publish_id: self.publish_id,
            bot_name: self.bot_name,
            messages,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn messages_json(messages: &[ChatMessage]) -> Result<String, RepositoryError> {
    serde_json::to_string(messages).map_err(|e| RepositoryError::Query(e.to_string()))
}

impl TranscriptRepository for SqliteTranscriptRepository {
    async fn create(&self, transcript: &NewTranscript) -> Result<String, RepositoryError> {
        let id = Uuid::now_v7().to_string();

        sqlx::query(
            "INSERT INTO transcripts (id, publish_id, bot_name, messages, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&transcript.publish_id)
        .bind(&transcript.bot_name)
        .bind(messages_json(&transcript.messages)?)
        .bind(format_datetime(&transcript.created_at))
        .bind(format_datetime(&transcript.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(id)
    }

    async fn update(
        &self,
        id: &str,
        messages: &[ChatMessage],
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE transcripts SET messages = ?, updated_at = ? WHERE id = ?")
            .bind(messages_json(messages)?)
            .bind(format_datetime(&updated_at))
            .bind(id)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<TranscriptRecord>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM transcripts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.map(|row| TranscriptRow::from_row(&row)?.into_record())
            .transpose()
    }

    async fn list(&self, publish_id: Option<&str>) -> Result<Vec<TranscriptRecord>, RepositoryError> {
        let rows = match publish_id {
            Some(publish_id) => {
                sqlx::query(
                    "SELECT * FROM transcripts WHERE publish_id = ? ORDER BY created_at DESC",
                )
                .bind(publish_id)
                .fetch_all(&self.pool.reader)
                .await
            }
            None => {
                sqlx::query("SELECT * FROM transcripts ORDER BY created_at DESC")
                    .fetch_all(&self.pool.reader)
                    .await
            }
        }
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| TranscriptRow::from_row(row)?.into_record())
            .collect()
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM transcripts WHERE id = ?")
            .bind(id)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
