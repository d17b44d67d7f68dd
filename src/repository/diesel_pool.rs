//! Async SQLite connection factory.
//!
//! SQLite connections are cheap to open, so each operation gets a fresh
//! connection wrapped in diesel-async's SyncConnectionWrapper, which runs the
//! blocking calls on tokio's blocking pool.

use std::path::Path;

use diesel::sqlite::SqliteConnection;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::{AsyncConnection, SimpleAsyncConnection};

use super::util::to_diesel_error;

/// Diesel error type alias.
pub type DieselError = diesel::result::Error;

/// Async SQLite connection using SyncConnectionWrapper.
pub type AsyncSqliteConnection = SyncConnectionWrapper<SqliteConnection>;

/// Milliseconds a writer waits on a locked database before giving up.
const BUSY_TIMEOUT_MS: u32 = 5_000;

#[derive(Clone, Debug)]
pub struct AsyncSqlitePool {
    database_url: String,
}

impl AsyncSqlitePool {
    /// Accepts a plain path or a `sqlite:` URL.
    pub fn new(database_url: &str) -> Self {
        let url = database_url.strip_prefix("sqlite:").unwrap_or(database_url);
        let url = url.strip_prefix("//").unwrap_or(url);
        Self {
            database_url: url.to_string(),
        }
    }

    pub fn from_path(db_path: &Path) -> Self {
        Self::new(&db_path.display().to_string())
    }

    /// Open a connection with foreign keys enforced and a busy timeout set.
    pub async fn get(&self) -> Result<AsyncSqliteConnection, DieselError> {
        let mut conn = AsyncSqliteConnection::establish(&self.database_url)
            .await
            .map_err(to_diesel_error)?;
        conn.batch_execute(&format!(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
            BUSY_TIMEOUT_MS
        ))
        .await?;
        Ok(conn)
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

/// Take the write lock before the first read (`BEGIN IMMEDIATE`).
///
/// A deferred transaction that reads and then writes gets SQLITE_BUSY
/// without waiting if another connection committed in between; an
/// immediate one waits out the busy timeout instead.
pub async fn begin_immediate(conn: &mut AsyncSqliteConnection) -> Result<(), DieselError> {
    conn.batch_execute("BEGIN IMMEDIATE").await
}

/// Commit when `result` is `Ok`, roll back otherwise.
pub async fn end_transaction<T, E>(
    conn: &mut AsyncSqliteConnection,
    result: Result<T, E>,
) -> Result<T, E>
where
    E: From<DieselError>,
{
    match result {
        Ok(value) => {
            conn.batch_execute("COMMIT").await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = conn.batch_execute("ROLLBACK").await {
                tracing::warn!("Rollback failed: {}", rollback);
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_prefixes_stripped() {
        assert_eq!(AsyncSqlitePool::new("sqlite:data.db").database_url(), "data.db");
        assert_eq!(
            AsyncSqlitePool::new("sqlite:///tmp/data.db").database_url(),
            "/tmp/data.db"
        );
        assert_eq!(AsyncSqlitePool::new("/tmp/x.db").database_url(), "/tmp/x.db");
    }
}
