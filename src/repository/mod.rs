//! Repository layer for database persistence.
//!
//! All database access uses Diesel with diesel-async over SQLite.

pub mod article;
pub mod context;
pub mod diesel_models;
pub mod diesel_pool;
pub mod run_ledger;
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;

pub use article::{ArticleRepository, IngestSummary, InsertOutcome};
pub use context::DbContext;
pub use diesel_pool::{AsyncSqlitePool, DieselError};
pub use run_ledger::{LedgerError, RunLedger};

use chrono::{DateTime, Utc};

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Parse an optional datetime string from the database.
pub fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}
