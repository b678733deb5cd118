//! Database pool for the local turn store.
//!
//! SQLite allows only one writer at a time, so turn inserts and session deletes
//! go through a single-connection writer pool while history and session-list
//! reads share a reader pool. Both run in WAL mode so reads never block on the
//! writer.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Split read/write pool for SQLite with WAL mode.
///
/// - `reader`: Multi-connection pool (up to 8) for concurrent SELECT queries.
/// - `writer`: Single-connection pool for serialized INSERT/UPDATE/DELETE.
#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open (or create) the store at `database_url` and apply migrations.
    ///
    /// The parent directory must already exist.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let base_opts = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(5))
            .create_if_missing(true);

        let read_opts = base_opts.clone().read_only(true);
        let write_opts = base_opts;

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(write_opts)
            .await?;

        // The reader is read-only, so the schema must exist before it opens.
        sqlx::migrate!("../../migrations").run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(read_opts)
            .await?;

        Ok(Self { reader, writer })
    }
}

/// Database URL for the store inside `data_dir`: `{data_dir}/brokerchat.db`.
pub fn database_url_in(data_dir: &std::path::Path) -> String {
    format!("sqlite://{}/brokerchat.db?mode=rwc", data_dir.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_pool(name: &str) -> (tempfile::TempDir, DatabasePool) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join(name);
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = DatabasePool::new(&url).await.unwrap();
        (dir, pool)
    }

    #[tokio::test]
    async fn test_pool_creates_turn_table() {
        let (_dir, pool) = temp_pool("test.db").await;

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations' ORDER BY name",
        )
        .fetch_all(&pool.reader)
        .await
        .unwrap();

        let table_names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        assert_eq!(table_names, vec!["chat_turns"]);

        let indexes: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='index' AND tbl_name='chat_turns' AND name LIKE 'idx_%'",
        )
        .fetch_all(&pool.reader)
        .await
        .unwrap();
        assert!(
            indexes
                .iter()
                .any(|i| i.0 == "idx_chat_turns_user_session_created"),
            "session lookup index missing"
        );
    }

    #[tokio::test]
    async fn test_pool_wal_mode() {
        let (_dir, pool) = temp_pool("test_wal.db").await;

        let result: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&pool.writer)
            .await
            .unwrap();

        assert_eq!(result.0.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn test_sender_check_constraint() {
        let (_dir, pool) = temp_pool("test_check.db").await;

        let result = sqlx::query(
            "INSERT INTO chat_turns (id, user_id, session_id, sender, message, created_at) VALUES ('x', 'u', 's', 'robot', 'hi', '2026-01-01T00:00:00Z')",
        )
        .execute(&pool.writer)
        .await;
        assert!(result.is_err(), "unknown sender should be rejected");
    }

    #[tokio::test]
    async fn test_blank_message_check_constraint() {
        let (_dir, pool) = temp_pool("test_blank.db").await;

        for message in ["", "   "] {
            let result = sqlx::query(
                "INSERT INTO chat_turns (id, user_id, session_id, sender, message, created_at) VALUES (?, 'u', 's', 'user', ?, '2026-01-01T00:00:00Z')",
            )
            .bind(format!("blank-{}", message.len()))
            .bind(message)
            .execute(&pool.writer)
            .await;
            assert!(result.is_err(), "blank message {message:?} should be rejected");
        }
    }

    #[test]
    fn test_database_url_in() {
        let url = database_url_in(std::path::Path::new("/tmp/bc"));
        assert_eq!(url, "sqlite:///tmp/bc/brokerchat.db?mode=rwc");
    }
}
