//! Database pool with split reader/writer connections in WAL mode.
//!
//! SQLite allows only one writer at a time. `DatabasePool` pairs a
//! multi-connection reader pool with a single-connection writer pool. Both
//! use WAL journal mode.

use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// Split read/write pool for SQLite with WAL mode.
///
/// - `reader`: up to 4 connections for start-up replay and diagnostics.
/// - `writer`: one connection; every item append goes through it.
#[derive(Clone, Debug)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open (creating if missing) the database at `database_url`.
    ///
    /// Runs migrations on the writer before the reader pool is opened.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let base_opts = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .create_if_missing(true);

        let read_opts = base_opts.clone().read_only(true);
        let write_opts = base_opts;

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(write_opts)
            .await?;

        sqlx::migrate!("../../migrations").run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(read_opts)
            .await?;

        tracing::debug!(database_url, "database pool ready");
        Ok(Self { reader, writer })
    }

    /// Open the database file at `path`.
    pub async fn open_path(path: &Path) -> Result<Self, sqlx::Error> {
        Self::new(&database_url(path)).await
    }
}

/// SQLite URL for a database file.
pub fn database_url(path: &Path) -> String {
    format!("sqlite://{}", path.display())
}
