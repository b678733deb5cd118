//! SQLite turn repository implementation.
//!
//! Implements `TurnRepository` from `brokerchat-core` over the `chat_turns`
//! table. Every query filters on `user_id`.

use brokerchat_core::chat::repository::TurnRepository;
use brokerchat_types::error::StorageError;
use brokerchat_types::turn::{ConversationTurn, NewTurn, Sender};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `TurnRepository`.
pub struct SqliteTurnRepository {
    pool: DatabasePool,
}

impl SqliteTurnRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct TurnRow {
    id: String,
    user_id: String,
    session_id: String,
    sender: String,
    message: String,
    created_at: String,
}

impl TurnRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            session_id: row.try_get("session_id")?,
            sender: row.try_get("sender")?,
            message: row.try_get("message")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_turn(self) -> Result<ConversationTurn, StorageError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| StorageError::Corrupt(format!("invalid turn id: {e}")))?;
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| StorageError::Corrupt(format!("invalid user_id: {e}")))?;
        let session_id = Uuid::parse_str(&self.session_id)
            .map_err(|e| StorageError::Corrupt(format!("invalid session_id: {e}")))?;
        let sender: Sender = self.sender.parse().map_err(StorageError::Corrupt)?;
        let created_at = parse_datetime(&self.created_at)?;

        Ok(ConversationTurn {
            id,
            user_id,
            session_id,
            sender,
            message: self.message,
            created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt(format!("invalid datetime: {e}")))
}

/// Fixed-width RFC 3339 so `ORDER BY created_at` sorts chronologically.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn map_rows(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<ConversationTurn>, StorageError> {
    let mut turns = Vec::with_capacity(rows.len());
    for row in rows {
        let turn_row = TurnRow::from_row(row).map_err(|e| StorageError::Query(e.to_string()))?;
        turns.push(turn_row.into_turn()?);
    }
    Ok(turns)
}

// ---------------------------------------------------------------------------
// TurnRepository implementation
// ---------------------------------------------------------------------------

impl TurnRepository for SqliteTurnRepository {
    async fn insert_turn(&self, turn: &NewTurn) -> Result<ConversationTurn, StorageError> {
        let stored = ConversationTurn {
            id: Uuid::now_v7(),
            user_id: turn.user_id,
            session_id: turn.session_id,
            sender: turn.sender,
            message: turn.message.clone(),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"INSERT INTO chat_turns (id, user_id, session_id, sender, message, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(stored.id.to_string())
        .bind(stored.user_id.to_string())
        .bind(stored.session_id.to_string())
        .bind(stored.sender.as_str())
        .bind(&stored.message)
        .bind(format_datetime(&stored.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        tracing::debug!(
            turn_id = %stored.id,
            session_id = %stored.session_id,
            sender = %stored.sender,
            "Turn stored"
        );
        Ok(stored)
    }

    async fn fetch_turns(
        &self,
        user_id: &Uuid,
        session_id: &Uuid,
    ) -> Result<Vec<ConversationTurn>, StorageError> {
        let rows = sqlx::query(
            r#"SELECT * FROM chat_turns
               WHERE user_id = ? AND session_id = ?
               ORDER BY created_at ASC, rowid ASC"#,
        )
        .bind(user_id.to_string())
        .bind(session_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        map_rows(&rows)
    }

    async fn fetch_user_turns(&self, user_id: &Uuid) -> Result<Vec<ConversationTurn>, StorageError> {
        let rows = sqlx::query(
            "SELECT * FROM chat_turns WHERE user_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        map_rows(&rows)
    }

    async fn delete_session_turns(
        &self,
        user_id: &Uuid,
        session_id: &Uuid,
    ) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM chat_turns WHERE user_id = ? AND session_id = ?")
            .bind(user_id.to_string())
            .bind(session_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
