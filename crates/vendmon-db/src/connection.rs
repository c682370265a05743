//! `SQLite` connection pool construction.

use crate::error::{DatabaseError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::time::Duration;

/// Default number of pooled connections.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Default time a writer waits on a locked database.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a connection pool for the given URL or path.
///
/// The database file is created if missing. File-backed databases use WAL
/// journaling so the two consume loops can read while the other writes.
///
/// # Errors
/// Returns `DatabaseError::Open` if the URL is invalid or the pool cannot connect.
pub async fn open_pool(
    url: &str,
    max_connections: u32,
    busy_timeout: Duration,
) -> Result<Pool<Sqlite>> {
    let mut connect_options = SqliteConnectOptions::from_str(url)
        .map_err(|e| DatabaseError::Open(format!("invalid connection string: {e}")))?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(busy_timeout);

    if !is_in_memory(url) {
        connect_options = connect_options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(connect_options)
        .await
        .map_err(|e| DatabaseError::Open(format!("failed to initialize pool: {e}")))?;

    tracing::info!("Database pool created at {}", url);

    Ok(pool)
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}
