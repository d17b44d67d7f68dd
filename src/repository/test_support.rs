//! Shared fixtures for database-backed tests.

use chrono::{NaiveDate, TimeZone, Utc};
use tempfile::TempDir;

use super::DbContext;
use crate::models::{
    CanonicalArticle, EntityType, IngestRecord, MentionInput, PhraseInput, SentimentLabel,
};

/// Fresh database in a temp dir with the schema applied.
pub async fn setup_test_db() -> (DbContext, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let ctx = DbContext::new(&dir.path().join("test.db"));
    ctx.init_schema().await.unwrap();
    (ctx, dir)
}

pub fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Article owned by run `R1`, published at noon UTC on `published` if given.
pub fn record(fingerprint: &str, published: Option<&str>, label: SentimentLabel) -> IngestRecord {
    let published_at = published.map(|d| {
        Utc.from_utc_datetime(&day(d).and_hms_opt(12, 0, 0).unwrap())
    });
    IngestRecord {
        article: CanonicalArticle {
            fingerprint: Some(fingerprint.to_string()),
            source: "kompas".to_string(),
            title: Some(format!("Article {fingerprint}")),
            url: Some(format!("https://news.example/{fingerprint}")),
            summary: None,
            published_at,
            sentiment_label: label,
            sentiment_polarity: 0.0,
            sentiment_subjectivity: 0.0,
            run_id: "R1".to_string(),
            language_ok: true,
        },
        mentions: Vec::new(),
        phrases: Vec::new(),
    }
}

pub trait IngestRecordExt {
    fn mention(self, text: &str, entity_type: EntityType, confidence: f64) -> Self;
    fn phrase(self, entity: &str, text: &str) -> Self;
}

impl IngestRecordExt for IngestRecord {
    fn mention(mut self, text: &str, entity_type: EntityType, confidence: f64) -> Self {
        self.mentions.push(MentionInput {
            surface_text: text.to_string(),
            entity_type,
            confidence,
            start_char: 0,
            end_char: text.len() as i32,
        });
        self
    }

    fn phrase(mut self, entity: &str, text: &str) -> Self {
        self.phrases.push(PhraseInput {
            entity_surface_text: entity.to_string(),
            phrase_text: text.to_string(),
        });
        self
    }
}
