//! One-shot aggregation queries printed as JSON.

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::Settings;
use crate::query::{NetworkQuery, PhraseQuery, QueryService, TrendQuery};
use crate::repository::ArticleRepository;

fn query_service(settings: &Settings) -> QueryService<ArticleRepository> {
    QueryService::new(settings.create_db_context().articles())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn ensure_database(settings: &Settings) -> anyhow::Result<()> {
    if !settings.database_exists() {
        anyhow::bail!(
            "No database at {}. Run 'mediawatch init' first.",
            settings.database_path().display()
        );
    }
    Ok(())
}

pub async fn cmd_trend(
    settings: &Settings,
    entity: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> anyhow::Result<()> {
    ensure_database(settings)?;
    let query = TrendQuery {
        entity: entity.to_string(),
        start,
        end,
    };
    print_json(&query_service(settings).trend(&query).await?)
}

pub async fn cmd_phrases(
    settings: &Settings,
    entity: &str,
    start: NaiveDate,
    end: NaiveDate,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    ensure_database(settings)?;
    let query = PhraseQuery {
        entity: entity.to_string(),
        start,
        end,
        limit,
    };
    print_json(&query_service(settings).phrases(&query).await?)
}

pub async fn cmd_network(settings: &Settings, query: &NetworkQuery) -> anyhow::Result<()> {
    ensure_database(settings)?;
    print_json(&query_service(settings).network(query).await?)
}
