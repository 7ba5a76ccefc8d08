//! Split reader/writer SQLite pools.
//!
//! Checkpoint and turn writes for a session must be linearizable. SQLite
//! permits a single writer, so all mutation funnels through a one-connection
//! writer pool while reads fan out over a wider reader pool. WAL mode lets
//! the readers proceed while a checkpoint save is in flight.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// Reader connections. Writes never use these.
const READER_CONNECTIONS: u32 = 8;

/// How long a connection waits on a locked database before erroring.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Paired SQLite pools over one database file.
///
/// `writer` holds exactly one connection; every INSERT/UPDATE/DELETE in the
/// process goes through it in submission order. `reader` serves concurrent
/// SELECTs.
#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open the pools and bring the schema up to date.
    ///
    /// Migrations run on the writer before the read-only pool opens, so a
    /// fresh database file is fully created by the time anyone can query it.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT)
            .create_if_missing(true);

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options.clone())
            .await?;

        sqlx::migrate!("../../migrations").run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(READER_CONNECTIONS)
            .connect_with(options.read_only(true))
            .await?;

        Ok(Self { reader, writer })
    }
}

/// Database URL under the resolved data directory.
pub fn default_database_url() -> String {
    let db_path = crate::resolve_data_dir().join("handrail.db");
    format!("sqlite://{}", db_path.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_pool() -> (DatabasePool, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        (DatabasePool::new(&url).await.unwrap(), dir)
    }

    #[tokio::test]
    async fn test_migrations_create_schema() {
        let (pool, _dir) = temp_pool().await;

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        )
        .fetch_all(&pool.reader)
        .await
        .unwrap();

        let names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        for expected in ["sessions", "session_turns", "workflow_checkpoints"] {
            assert!(names.contains(&expected), "missing table {expected}");
        }
    }

    #[tokio::test]
    async fn test_wal_and_foreign_keys_active() {
        let (pool, _dir) = temp_pool().await;

        let journal: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&pool.writer)
            .await
            .unwrap();
        assert_eq!(journal.0.to_lowercase(), "wal");

        let fk: (i32,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool.writer)
            .await
            .unwrap();
        assert_eq!(fk.0, 1);
    }

    #[tokio::test]
    async fn test_reader_pool_rejects_writes() {
        let (pool, _dir) = temp_pool().await;

        let result = sqlx::query("DELETE FROM workflow_checkpoints")
            .execute(&pool.reader)
            .await;
        assert!(result.is_err(), "reader pool must be read-only");
    }

    #[tokio::test]
    async fn test_default_database_url_shape() {
        let url = default_database_url();
        assert!(url.starts_with("sqlite://"));
        assert!(url.ends_with("handrail.db"));
    }
}
