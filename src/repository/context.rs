//! Database context: owns the connection factory and hands out repositories.

use std::path::Path;

use diesel_async::SimpleAsyncConnection;

use super::article::ArticleRepository;
use super::diesel_pool::{AsyncSqlitePool, DieselError};
use super::run_ledger::RunLedger;

/// Entry point for all database access.
///
/// Create one context per command or server, call [`DbContext::init_schema`]
/// once, then borrow repositories from it.
///
/// # Example
/// ```ignore
/// let ctx = DbContext::new(&db_path);
/// ctx.init_schema().await?;
/// ctx.runs().start("R1", today).await?;
/// ```
#[derive(Clone)]
pub struct DbContext {
    pool: AsyncSqlitePool,
}

impl DbContext {
    pub fn new(db_path: &Path) -> Self {
        Self {
            pool: AsyncSqlitePool::from_path(db_path),
        }
    }

    /// Accepts `sqlite:` URLs or plain file paths.
    pub fn from_url(database_url: &str) -> Self {
        Self {
            pool: AsyncSqlitePool::new(database_url),
        }
    }

    pub fn pool(&self) -> &AsyncSqlitePool {
        &self.pool
    }

    pub fn articles(&self) -> ArticleRepository {
        ArticleRepository::new(self.pool.clone())
    }

    pub fn runs(&self) -> RunLedger {
        RunLedger::new(self.pool.clone())
    }

    /// Create every table and index if missing. Safe to call repeatedly.
    pub async fn init_schema(&self) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        conn.batch_execute(
            r#"
            PRAGMA journal_mode = WAL;

            -- Canonical store
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                fingerprint TEXT NOT NULL UNIQUE,
                source TEXT NOT NULL,
                title TEXT,
                url TEXT,
                summary TEXT,
                published_at TEXT,
                published_date TEXT,
                sentiment_label TEXT NOT NULL,
                sentiment_polarity REAL NOT NULL DEFAULT 0,
                sentiment_subjectivity REAL NOT NULL DEFAULT 0,
                run_id TEXT NOT NULL,
                language_ok INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                CHECK (sentiment_label IN ('negative', 'neutral', 'positive')),
                CHECK (sentiment_polarity BETWEEN -1.0 AND 1.0)
            );

            CREATE INDEX IF NOT EXISTS idx_articles_published_date ON articles(published_date);
            CREATE INDEX IF NOT EXISTS idx_articles_run ON articles(run_id);
            CREATE INDEX IF NOT EXISTS idx_articles_source ON articles(source);

            CREATE TABLE IF NOT EXISTS entity_mentions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                article_id INTEGER NOT NULL,
                surface_text TEXT NOT NULL,
                normalized_text TEXT NOT NULL,
                entity_type TEXT NOT NULL,
                confidence REAL NOT NULL,
                start_char INTEGER NOT NULL DEFAULT 0,
                end_char INTEGER NOT NULL DEFAULT 0,
                CHECK (confidence BETWEEN 0.0 AND 1.0),
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_mentions_normalized ON entity_mentions(normalized_text);
            CREATE INDEX IF NOT EXISTS idx_mentions_article ON entity_mentions(article_id);

            CREATE TABLE IF NOT EXISTS framing_phrases (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                article_id INTEGER NOT NULL,
                entity_text TEXT NOT NULL,
                normalized_entity TEXT NOT NULL,
                phrase_text TEXT NOT NULL,
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_phrases_entity ON framing_phrases(normalized_entity);
            CREATE INDEX IF NOT EXISTS idx_phrases_article ON framing_phrases(article_id);

            -- Run ledger
            CREATE TABLE IF NOT EXISTS pipeline_runs (
                run_id TEXT PRIMARY KEY,
                run_date TEXT NOT NULL,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                status TEXT NOT NULL DEFAULT 'running',
                collect_completed INTEGER NOT NULL DEFAULT 0,
                parse_completed INTEGER NOT NULL DEFAULT 0,
                clean_completed INTEGER NOT NULL DEFAULT 0,
                signal_completed INTEGER NOT NULL DEFAULT 0,
                total_sources INTEGER,
                total_fetched INTEGER,
                total_parsed INTEGER,
                total_cleaned INTEGER,
                total_analyzed INTEGER,
                errors TEXT,
                CHECK (status IN ('running', 'completed', 'failed'))
            );

            CREATE INDEX IF NOT EXISTS idx_runs_started ON pipeline_runs(started_at);

            CREATE TABLE IF NOT EXISTS run_statistics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL,
                stage TEXT NOT NULL,
                metric_name TEXT NOT NULL,
                metric_value REAL,
                details TEXT,
                created_at TEXT NOT NULL,
                UNIQUE(run_id, metric_name),
                FOREIGN KEY (run_id) REFERENCES pipeline_runs(run_id)
            );

            CREATE TABLE IF NOT EXISTS source_statistics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL,
                source_name TEXT NOT NULL,
                articles_fetched INTEGER NOT NULL DEFAULT 0,
                succeeded INTEGER NOT NULL DEFAULT 1,
                error TEXT,
                created_at TEXT NOT NULL,
                UNIQUE(run_id, source_name),
                FOREIGN KEY (run_id) REFERENCES pipeline_runs(run_id)
            );
            "#,
        )
        .await?;

        Ok(())
    }

    /// Get list of all tables in the database.
    pub async fn list_tables(&self) -> Result<Vec<String>, DieselError> {
        let mut conn = self.pool.get().await?;
        let rows: Vec<TableName> = diesel_async::RunQueryDsl::load(
            diesel::sql_query(
                "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            ),
            &mut conn,
        )
        .await?;
        Ok(rows.into_iter().map(|r| r.name).collect())
    }
}

#[derive(diesel::QueryableByName)]
struct TableName {
    #[diesel(sql_type = diesel::sql_types::Text)]
    name: String,
}
