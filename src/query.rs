//! Query façade: validates filter parameters and dispatches to the three
//! aggregation views.
//!
//! Each view is computed independently per call; nothing is cached.

use chrono::{DateTime, NaiveDate};
use thiserror::Error;
use tracing::debug;

use crate::aggregation::{
    build_network, rank_phrases, sentiment_trend, DateRange, MentionFilter, NetworkGraph,
    PhraseCount, SignalStore, TrendPoint,
};
use crate::models::{normalize_surface, EntityType};

#[derive(Debug, Error)]
pub enum QueryError {
    /// Bad filter parameters. Caller error, never retried.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

fn invalid(message: impl Into<String>) -> QueryError {
    QueryError::InvalidQuery(message.into())
}

/// Parse a day from `YYYY-MM-DD` or an RFC 3339 timestamp (date part used).
pub fn parse_day(input: &str) -> Result<NaiveDate, QueryError> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(input).map(|dt| dt.date_naive()))
        .map_err(|_| invalid(format!("'{}' is not a date (expected YYYY-MM-DD)", input)))
}

fn validate_entity(entity: &str) -> Result<(), QueryError> {
    if normalize_surface(entity).is_empty() {
        return Err(invalid("entity must not be empty"));
    }
    Ok(())
}

fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<DateRange, QueryError> {
    DateRange::new(start, end)
        .ok_or_else(|| invalid(format!("start date {} is after end date {}", start, end)))
}

fn validate_confidence(min: f64, max: f64) -> Result<(), QueryError> {
    let in_unit = |v: f64| (0.0..=1.0).contains(&v);
    if !in_unit(min) || !in_unit(max) {
        return Err(invalid("confidence bounds must lie in [0, 1]"));
    }
    if min > max {
        return Err(invalid(format!(
            "minimum confidence {} exceeds maximum {}",
            min, max
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct TrendQuery {
    pub entity: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TrendQuery {
    pub fn validate(&self) -> Result<DateRange, QueryError> {
        validate_entity(&self.entity)?;
        validate_range(self.start, self.end)
    }
}

#[derive(Debug, Clone)]
pub struct PhraseQuery {
    pub entity: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Top-N cut-off; `None` returns every phrase.
    pub limit: Option<usize>,
}

impl PhraseQuery {
    pub fn validate(&self) -> Result<DateRange, QueryError> {
        validate_entity(&self.entity)?;
        validate_range(self.start, self.end)
    }
}

#[derive(Debug, Clone)]
pub struct NetworkQuery {
    pub entity: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub min_confidence: f64,
    pub max_confidence: f64,
    /// Empty means every type.
    pub allowed_types: Vec<EntityType>,
    /// Matched case-insensitively.
    pub excluded_entities: Vec<String>,
    pub include_queried: bool,
}

impl NetworkQuery {
    /// Query with the full confidence range and no type or exclusion filters.
    pub fn new(entity: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            entity: entity.into(),
            start,
            end,
            min_confidence: 0.0,
            max_confidence: 1.0,
            allowed_types: Vec::new(),
            excluded_entities: Vec::new(),
            include_queried: true,
        }
    }

    pub fn validate(&self) -> Result<(DateRange, MentionFilter), QueryError> {
        validate_entity(&self.entity)?;
        let range = validate_range(self.start, self.end)?;
        validate_confidence(self.min_confidence, self.max_confidence)?;

        let filter = MentionFilter::new()
            .with_confidence(self.min_confidence, self.max_confidence)
            .with_types(self.allowed_types.iter().copied())
            .excluding(&self.excluded_entities);
        Ok((range, filter))
    }
}

/// Entry point for the three read views.
#[derive(Clone)]
pub struct QueryService<S> {
    store: S,
}

impl<S: SignalStore> QueryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// `[{day, label, count}]`, ascending by day then label.
    pub async fn trend(&self, query: &TrendQuery) -> Result<Vec<TrendPoint>, QueryError> {
        let range = query.validate()?;
        let articles = self.store.articles_mentioning(&query.entity, &range).await?;
        debug!(
            "Trend for '{}': {} candidate articles",
            query.entity,
            articles.len()
        );
        Ok(sentiment_trend(&articles, &range))
    }

    /// `[{phrase, count}]`, descending by count.
    pub async fn phrases(&self, query: &PhraseQuery) -> Result<Vec<PhraseCount>, QueryError> {
        let range = query.validate()?;
        let phrases = self.store.phrases_for_entity(&query.entity, &range).await?;
        Ok(rank_phrases(&query.entity, &phrases, query.limit))
    }

    /// Co-occurrence graph around the queried entity.
    pub async fn network(&self, query: &NetworkQuery) -> Result<NetworkGraph, QueryError> {
        let (range, filter) = query.validate()?;
        let articles = self.store.articles_mentioning(&query.entity, &range).await?;
        if articles.is_empty() {
            return Ok(NetworkGraph::default());
        }

        let ids: Vec<i32> = articles.iter().map(|a| a.id).collect();
        let mentions = self.store.mentions_for_articles(&ids).await?;
        debug!(
            "Network for '{}': {} articles, {} mentions",
            query.entity,
            ids.len(),
            mentions.len()
        );
        Ok(build_network(
            &query.entity,
            &mentions,
            &filter,
            query.include_queried,
        ))
    }
}
