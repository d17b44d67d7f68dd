//! Signal aggregation over the canonical store.
//!
//! The algorithms here are pure functions over rows already loaded from a
//! [`SignalStore`]. They never touch the database themselves, so the same
//! code answers queries against SQLite and against in-memory fixtures.

pub mod filter;
pub mod network;
pub mod phrases;
pub mod trend;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::models::{Article, EntityMention, FramingPhrase};

pub use filter::MentionFilter;
pub use network::{build_network, GraphEdge, GraphNode, NetworkGraph, SEARCHED_GROUP};
pub use phrases::{rank_phrases, PhraseCount};
pub use trend::{sentiment_trend, TrendPoint};

/// Inclusive range of calendar days (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Returns `None` when `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// The `days`-long window ending on `end`, starting no earlier than the
    /// first representable day.
    pub fn ending_on(end: NaiveDate, days: u32) -> Self {
        Self {
            start: end
                .checked_sub_signed(Duration::days(i64::from(days)))
                .unwrap_or(NaiveDate::MIN),
            end,
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Bounds formatted the way `published_date` is stored.
    pub fn as_text(&self) -> (String, String) {
        (
            self.start.format("%Y-%m-%d").to_string(),
            self.end.format("%Y-%m-%d").to_string(),
        )
    }
}

/// Read access to committed articles and their signals.
///
/// Entity arguments are matched on the normalized surface form. Results are
/// in ingestion order: article id, then row id.
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Articles published inside `range` that carry at least one mention of `entity`.
    async fn articles_mentioning(
        &self,
        entity: &str,
        range: &DateRange,
    ) -> Result<Vec<Article>, diesel::result::Error>;

    /// Every mention attached to the given articles.
    async fn mentions_for_articles(
        &self,
        article_ids: &[i32],
    ) -> Result<Vec<EntityMention>, diesel::result::Error>;

    /// Framing phrases extracted around `entity` in articles published inside `range`.
    async fn phrases_for_entity(
        &self,
        entity: &str,
        range: &DateRange,
    ) -> Result<Vec<FramingPhrase>, diesel::result::Error>;
}
