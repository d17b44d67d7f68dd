//! Diesel row types for every table.
//!
//! Timestamps travel as RFC 3339 text and booleans as 0/1 integers, matching
//! the column types created by `DbContext::init_schema`.

use diesel::prelude::*;

use crate::schema;

/// Article row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::articles)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ArticleRecord {
    pub id: i32,
    pub fingerprint: String,
    pub source: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub summary: Option<String>,
    pub published_at: Option<String>,
    pub published_date: Option<String>,
    pub sentiment_label: String,
    pub sentiment_polarity: f64,
    pub sentiment_subjectivity: f64,
    pub run_id: String,
    pub language_ok: i32,
    pub created_at: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::articles)]
pub struct NewArticle<'a> {
    pub fingerprint: &'a str,
    pub source: &'a str,
    pub title: Option<&'a str>,
    pub url: Option<&'a str>,
    pub summary: Option<&'a str>,
    pub published_at: Option<&'a str>,
    pub published_date: Option<&'a str>,
    pub sentiment_label: &'a str,
    pub sentiment_polarity: f64,
    pub sentiment_subjectivity: f64,
    pub run_id: &'a str,
    pub language_ok: i32,
    pub created_at: &'a str,
}

/// Entity mention row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::entity_mentions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MentionRecord {
    pub id: i32,
    pub article_id: i32,
    pub surface_text: String,
    pub normalized_text: String,
    pub entity_type: String,
    pub confidence: f64,
    pub start_char: i32,
    pub end_char: i32,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::entity_mentions)]
pub struct NewMention<'a> {
    pub article_id: i32,
    pub surface_text: &'a str,
    pub normalized_text: &'a str,
    pub entity_type: &'a str,
    pub confidence: f64,
    pub start_char: i32,
    pub end_char: i32,
}

/// Framing phrase row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::framing_phrases)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PhraseRecord {
    pub id: i32,
    pub article_id: i32,
    pub entity_text: String,
    pub normalized_entity: String,
    pub phrase_text: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::framing_phrases)]
pub struct NewPhrase<'a> {
    pub article_id: i32,
    pub entity_text: &'a str,
    pub normalized_entity: &'a str,
    pub phrase_text: &'a str,
}

/// Pipeline run row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::pipeline_runs)]
#[diesel(primary_key(run_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RunRecord {
    pub run_id: String,
    pub run_date: String,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub status: String,
    pub collect_completed: i32,
    pub parse_completed: i32,
    pub clean_completed: i32,
    pub signal_completed: i32,
    pub total_sources: Option<i64>,
    pub total_fetched: Option<i64>,
    pub total_parsed: Option<i64>,
    pub total_cleaned: Option<i64>,
    pub total_analyzed: Option<i64>,
    pub errors: Option<String>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::pipeline_runs)]
pub struct NewRun<'a> {
    pub run_id: &'a str,
    pub run_date: &'a str,
    pub started_at: &'a str,
    pub status: &'a str,
    pub collect_completed: i32,
    pub parse_completed: i32,
    pub clean_completed: i32,
    pub signal_completed: i32,
}

/// Run statistic row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::run_statistics)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RunStatisticRecord {
    pub id: i32,
    pub run_id: String,
    pub stage: String,
    pub metric_name: String,
    pub metric_value: Option<f64>,
    pub details: Option<String>,
    pub created_at: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::run_statistics)]
pub struct NewRunStatistic<'a> {
    pub run_id: &'a str,
    pub stage: &'a str,
    pub metric_name: &'a str,
    pub metric_value: Option<f64>,
    pub details: Option<&'a str>,
    pub created_at: &'a str,
}

/// Source statistic row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::source_statistics)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SourceStatisticRecord {
    pub id: i32,
    pub run_id: String,
    pub source_name: String,
    pub articles_fetched: i64,
    pub succeeded: i32,
    pub error: Option<String>,
    pub created_at: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::source_statistics)]
pub struct NewSourceStatistic<'a> {
    pub run_id: &'a str,
    pub source_name: &'a str,
    pub articles_fetched: i64,
    pub succeeded: i32,
    pub error: Option<&'a str>,
    pub created_at: &'a str,
}
