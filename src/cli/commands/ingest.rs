//! JSON Lines ingestion into the canonical store.

use std::io::{BufRead, BufReader};
use std::path::Path;

use console::style;
use thiserror::Error;

use crate::config::Settings;
use crate::models::IngestRecord;
use crate::repository::{ArticleRepository, IngestSummary};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// `line` is 1-based.
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

/// Parse one `IngestRecord` per non-blank line.
///
/// The whole input is rejected on the first malformed line so a file is
/// never half-ingested.
pub fn parse_records<R: BufRead>(reader: R) -> Result<Vec<IngestRecord>, IngestError> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: IngestRecord =
            serde_json::from_str(&line).map_err(|e| IngestError::Parse {
                line: idx + 1,
                message: e.to_string(),
            })?;
        records.push(record);
    }
    Ok(records)
}

/// Read `path` and store every record it holds.
pub async fn ingest_file(
    repo: &ArticleRepository,
    path: &Path,
) -> Result<IngestSummary, IngestError> {
    let file = std::fs::File::open(path)?;
    let records = parse_records(BufReader::new(file))?;
    tracing::debug!("Parsed {} records from {}", records.len(), path.display());
    Ok(repo.ingest(&records).await?)
}

pub async fn cmd_ingest(settings: &Settings, path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }

    settings.ensure_directories()?;
    let ctx = settings.create_db_context();
    ctx.init_schema().await?;

    let summary = ingest_file(&ctx.articles(), path).await?;

    println!(
        "{} Ingested {}",
        style("✓").green(),
        style(path.display()).bold()
    );
    println!("  {:<18} {}", "inserted", summary.inserted);
    println!("  {:<18} {}", "duplicates", summary.duplicates);
    if summary.skipped_language > 0 {
        println!(
            "  {:<18} {}",
            "skipped (language)",
            style(summary.skipped_language).yellow()
        );
    }

    Ok(())
}
