//! Canonical article models.
//!
//! An article is immutable once its signals are attached. Identity across
//! the whole store is the content fingerprint, not the URL or row id.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::entity::MentionInput;
use super::phrase::PhraseInput;

/// Article-level sentiment label.
///
/// Variant order is the fixed output order used by trend aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Negative,
    Neutral,
    Positive,
}

impl SentimentLabel {
    pub const ALL: [SentimentLabel; 3] = [Self::Negative, Self::Neutral, Self::Positive];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Positive => "positive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "negative" => Some(Self::Negative),
            "neutral" => Some(Self::Neutral),
            "positive" => Some(Self::Positive),
            _ => None,
        }
    }
}

/// Sentiment signal attached to an article.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: SentimentLabel,
    /// Polarity in [-1, 1].
    pub polarity: f64,
    pub subjectivity: f64,
}

/// A stored canonical article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// Database row ID. Monotonic, so it doubles as ingestion order.
    pub id: i32,
    pub fingerprint: String,
    pub source: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub summary: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub sentiment: Sentiment,
    /// Run that first ingested this article (provenance only).
    pub run_id: String,
    pub language_ok: bool,
    pub created_at: DateTime<Utc>,
}

impl Article {
    /// Calendar day (UTC) of publication, if the article carries a timestamp.
    pub fn published_day(&self) -> Option<NaiveDate> {
        self.published_at.map(|dt| dt.date_naive())
    }

    /// Compute the content fingerprint for a title and summary.
    pub fn compute_fingerprint(title: &str, summary: &str) -> String {
        let content = format!("{}|{}", title, summary).to_lowercase();
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Canonical article record as delivered by the upstream cleaning and
/// signal stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalArticle {
    /// Content fingerprint. Derived from title and summary when absent.
    #[serde(default)]
    pub fingerprint: Option<String>,
    pub source: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub sentiment_label: SentimentLabel,
    pub sentiment_polarity: f64,
    #[serde(default)]
    pub sentiment_subjectivity: f64,
    pub run_id: String,
    #[serde(default = "default_true")]
    pub language_ok: bool,
}

fn default_true() -> bool {
    true
}

impl CanonicalArticle {
    /// The fingerprint to store: the upstream one if given, else derived.
    pub fn resolved_fingerprint(&self) -> String {
        match self.fingerprint.as_deref().map(str::trim) {
            Some(fp) if !fp.is_empty() => fp.to_string(),
            _ => Article::compute_fingerprint(
                self.title.as_deref().unwrap_or(""),
                self.summary.as_deref().unwrap_or(""),
            ),
        }
    }

    /// Polarity clamped into [-1, 1].
    pub fn clamped_polarity(&self) -> f64 {
        if self.sentiment_polarity.is_nan() {
            0.0
        } else {
            self.sentiment_polarity.clamp(-1.0, 1.0)
        }
    }

    /// Subjectivity clamped into [0, 1].
    pub fn clamped_subjectivity(&self) -> f64 {
        if self.sentiment_subjectivity.is_nan() {
            0.0
        } else {
            self.sentiment_subjectivity.clamp(0.0, 1.0)
        }
    }
}

/// One line of an ingest file: an article with the signals attached to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRecord {
    pub article: CanonicalArticle,
    #[serde(default)]
    pub mentions: Vec<MentionInput>,
    #[serde(default)]
    pub phrases: Vec<PhraseInput>,
}
