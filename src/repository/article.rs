//! Canonical store: articles with their entity mentions and framing phrases.
//!
//! Articles are write-once. The fingerprint column is UNIQUE; an insert that
//! hits it is reported as a duplicate, so re-ingesting a record is a no-op.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::diesel_models::{
    ArticleRecord, MentionRecord, NewArticle, NewMention, NewPhrase, PhraseRecord,
};
use super::diesel_pool::{
    begin_immediate, end_transaction, AsyncSqliteConnection, AsyncSqlitePool, DieselError,
};
use super::util::{day_to_text, is_unique_violation};
use super::{parse_datetime, parse_datetime_opt};
use crate::aggregation::{DateRange, SignalStore};
use crate::models::{
    normalize_surface, Article, EntityMention, EntityType, FramingPhrase, IngestRecord, Sentiment,
    SentimentLabel,
};
use crate::schema::{articles, entity_mentions, framing_phrases};

/// SQLite caps bound parameters per statement; stay well below it.
const ID_CHUNK: usize = 500;

impl From<ArticleRecord> for Article {
    fn from(record: ArticleRecord) -> Self {
        Article {
            id: record.id,
            fingerprint: record.fingerprint,
            source: record.source,
            title: record.title,
            url: record.url,
            summary: record.summary,
            published_at: parse_datetime_opt(record.published_at),
            sentiment: Sentiment {
                label: SentimentLabel::from_str(&record.sentiment_label)
                    .unwrap_or(SentimentLabel::Neutral),
                polarity: record.sentiment_polarity,
                subjectivity: record.sentiment_subjectivity,
            },
            run_id: record.run_id,
            language_ok: record.language_ok != 0,
            created_at: parse_datetime(&record.created_at),
        }
    }
}

impl TryFrom<MentionRecord> for EntityMention {
    type Error = String;

    fn try_from(record: MentionRecord) -> Result<Self, Self::Error> {
        let entity_type = EntityType::from_str(&record.entity_type)
            .ok_or_else(|| format!("unknown entity type '{}'", record.entity_type))?;
        Ok(EntityMention {
            id: record.id,
            article_id: record.article_id,
            surface_text: record.surface_text,
            normalized_text: record.normalized_text,
            entity_type,
            confidence: record.confidence,
            start_char: record.start_char,
            end_char: record.end_char,
        })
    }
}

impl From<PhraseRecord> for FramingPhrase {
    fn from(record: PhraseRecord) -> Self {
        FramingPhrase {
            id: record.id,
            article_id: record.article_id,
            entity_text: record.entity_text,
            normalized_entity: record.normalized_entity,
            phrase_text: record.phrase_text,
        }
    }
}

fn into_mentions(records: Vec<MentionRecord>) -> Vec<EntityMention> {
    records
        .into_iter()
        .filter_map(|record| {
            let id = record.id;
            EntityMention::try_from(record)
                .map_err(|e| warn!("Skipping mention {}: {}", id, e))
                .ok()
        })
        .collect()
}

/// Insert the article row and, when it is new, its mentions and phrases.
///
/// Only a fingerprint conflict counts as a duplicate; any other constraint
/// failure is returned as an error.
async fn write_article(
    conn: &mut AsyncSqliteConnection,
    new_article: &NewArticle<'_>,
    record: &IngestRecord,
) -> Result<InsertOutcome, DieselError> {
    match diesel::insert_into(articles::table)
        .values(new_article)
        .execute(conn)
        .await
    {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => return Ok(InsertOutcome::Duplicate),
        Err(e) => return Err(e),
    }

    let article_id: i32 = articles::table
        .filter(articles::fingerprint.eq(new_article.fingerprint))
        .select(articles::id)
        .first(conn)
        .await?;

    for mention in &record.mentions {
        let normalized = normalize_surface(&mention.surface_text);
        if normalized.is_empty() {
            continue;
        }
        diesel::insert_into(entity_mentions::table)
            .values(&NewMention {
                article_id,
                surface_text: mention.surface_text.trim(),
                normalized_text: &normalized,
                entity_type: mention.entity_type.as_str(),
                confidence: mention.clamped_confidence(),
                start_char: mention.start_char,
                end_char: mention.end_char,
            })
            .execute(conn)
            .await?;
    }

    for phrase in &record.phrases {
        let normalized_entity = normalize_surface(&phrase.entity_surface_text);
        if normalized_entity.is_empty() || phrase.phrase_text.trim().is_empty() {
            continue;
        }
        diesel::insert_into(framing_phrases::table)
            .values(&NewPhrase {
                article_id,
                entity_text: phrase.entity_surface_text.trim(),
                normalized_entity: &normalized_entity,
                phrase_text: phrase.phrase_text.trim(),
            })
            .execute(conn)
            .await?;
    }

    Ok(InsertOutcome::Inserted(article_id))
}

/// Result of submitting one article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i32),
    /// An article with the same fingerprint already exists; nothing was written.
    Duplicate,
}

/// Totals for a batch submitted through [`ArticleRepository::ingest`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub inserted: usize,
    pub duplicates: usize,
    pub skipped_language: usize,
}

#[derive(Clone)]
pub struct ArticleRepository {
    pool: AsyncSqlitePool,
}

impl ArticleRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an article together with its mentions and phrases.
    ///
    /// Runs in one transaction: either everything for the article is
    /// committed, or (on a fingerprint conflict) nothing is.
    pub async fn insert_article(&self, record: &IngestRecord) -> Result<InsertOutcome, DieselError> {
        let article = &record.article;
        let fingerprint = article.resolved_fingerprint();
        let published_at = article.published_at.map(|dt| dt.to_rfc3339());
        let published_date = article.published_at.map(|dt| day_to_text(dt.date_naive()));
        let created_at = Utc::now().to_rfc3339();

        let new_article = NewArticle {
            fingerprint: &fingerprint,
            source: &article.source,
            title: article.title.as_deref(),
            url: article.url.as_deref(),
            summary: article.summary.as_deref(),
            published_at: published_at.as_deref(),
            published_date: published_date.as_deref(),
            sentiment_label: article.sentiment_label.as_str(),
            sentiment_polarity: article.clamped_polarity(),
            sentiment_subjectivity: article.clamped_subjectivity(),
            run_id: &article.run_id,
            language_ok: i32::from(article.language_ok),
            created_at: &created_at,
        };

        let mut conn = self.pool.get().await?;
        begin_immediate(&mut conn).await?;
        let result = write_article(&mut conn, &new_article, record).await;
        let outcome = end_transaction(&mut conn, result).await?;

        if outcome == InsertOutcome::Duplicate {
            debug!("Duplicate article skipped: {}", fingerprint);
        }
        Ok(outcome)
    }

    /// Submit a batch. Records that failed the language filter are skipped.
    pub async fn ingest(&self, records: &[IngestRecord]) -> Result<IngestSummary, DieselError> {
        let mut summary = IngestSummary::default();

        for record in records {
            if !record.article.language_ok {
                summary.skipped_language += 1;
                continue;
            }
            match self.insert_article(record).await? {
                InsertOutcome::Inserted(_) => summary.inserted += 1,
                InsertOutcome::Duplicate => summary.duplicates += 1,
            }
        }

        info!(
            "Ingested {} articles ({} duplicates, {} skipped by language)",
            summary.inserted, summary.duplicates, summary.skipped_language
        );
        Ok(summary)
    }

    pub async fn get_by_fingerprint(&self, fingerprint: &str) -> Result<Option<Article>, DieselError> {
        let mut conn = self.pool.get().await?;

        articles::table
            .filter(articles::fingerprint.eq(fingerprint))
            .select(ArticleRecord::as_select())
            .first::<ArticleRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(Article::from))
    }

    pub async fn count(&self) -> Result<i64, DieselError> {
        let mut conn = self.pool.get().await?;

        use diesel::dsl::count_star;
        articles::table.select(count_star()).first(&mut conn).await
    }

    /// Count articles first ingested by a run.
    pub async fn count_for_run(&self, run_id: &str) -> Result<i64, DieselError> {
        let mut conn = self.pool.get().await?;

        use diesel::dsl::count_star;
        articles::table
            .filter(articles::run_id.eq(run_id))
            .select(count_star())
            .first(&mut conn)
            .await
    }

    /// Mentions attached to a single article, in offset order.
    pub async fn mentions_for(&self, article_id: i32) -> Result<Vec<EntityMention>, DieselError> {
        let mut conn = self.pool.get().await?;

        let records = entity_mentions::table
            .filter(entity_mentions::article_id.eq(article_id))
            .order((entity_mentions::start_char.asc(), entity_mentions::id.asc()))
            .select(MentionRecord::as_select())
            .load::<MentionRecord>(&mut conn)
            .await?;
        Ok(into_mentions(records))
    }
}

#[async_trait]
impl SignalStore for ArticleRepository {
    async fn articles_mentioning(
        &self,
        entity: &str,
        range: &DateRange,
    ) -> Result<Vec<Article>, DieselError> {
        let key = normalize_surface(entity);
        let (start, end) = range.as_text();
        let mut conn = self.pool.get().await?;

        let mentioned = entity_mentions::table
            .filter(entity_mentions::normalized_text.eq(key))
            .select(entity_mentions::article_id);

        articles::table
            .filter(articles::id.eq_any(mentioned))
            .filter(articles::published_date.ge(start))
            .filter(articles::published_date.le(end))
            .filter(articles::language_ok.eq(1))
            .order(articles::id.asc())
            .select(ArticleRecord::as_select())
            .load::<ArticleRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(Article::from).collect())
    }

    async fn mentions_for_articles(
        &self,
        article_ids: &[i32],
    ) -> Result<Vec<EntityMention>, DieselError> {
        let mut conn = self.pool.get().await?;
        let mut mentions = Vec::new();

        for chunk in article_ids.chunks(ID_CHUNK) {
            let records = entity_mentions::table
                .filter(entity_mentions::article_id.eq_any(chunk.to_vec()))
                .order((entity_mentions::article_id.asc(), entity_mentions::id.asc()))
                .select(MentionRecord::as_select())
                .load::<MentionRecord>(&mut conn)
                .await?;
            mentions.extend(into_mentions(records));
        }

        Ok(mentions)
    }

    async fn phrases_for_entity(
        &self,
        entity: &str,
        range: &DateRange,
    ) -> Result<Vec<FramingPhrase>, DieselError> {
        let key = normalize_surface(entity);
        let (start, end) = range.as_text();
        let mut conn = self.pool.get().await?;

        framing_phrases::table
            .inner_join(articles::table)
            .filter(framing_phrases::normalized_entity.eq(key))
            .filter(articles::published_date.ge(start))
            .filter(articles::published_date.le(end))
            .filter(articles::language_ok.eq(1))
            .order((framing_phrases::article_id.asc(), framing_phrases::id.asc()))
            .select(PhraseRecord::as_select())
            .load::<PhraseRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(FramingPhrase::from).collect())
    }
}
