//! Per-day sentiment label counts.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;

use super::DateRange;
use crate::models::{Article, SentimentLabel};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub day: NaiveDate,
    pub label: SentimentLabel,
    pub count: usize,
}

/// Count distinct articles per (publication day, label).
///
/// Articles without a timestamp or outside `range` are skipped. Missing
/// (day, label) combinations are omitted, not zero-filled. Output is ordered
/// by day, then negative, neutral, positive.
pub fn sentiment_trend(articles: &[Article], range: &DateRange) -> Vec<TrendPoint> {
    let mut seen = HashSet::new();
    let mut buckets: BTreeMap<(NaiveDate, SentimentLabel), usize> = BTreeMap::new();

    for article in articles {
        let Some(day) = article.published_day() else {
            continue;
        };
        if !range.contains(day) || !seen.insert(article.id) {
            continue;
        }
        *buckets.entry((day, article.sentiment.label)).or_insert(0) += 1;
    }

    buckets
        .into_iter()
        .map(|((day, label), count)| TrendPoint { day, label, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sentiment;
    use chrono::{TimeZone, Utc};

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn article(id: i32, published: Option<(u32, u32)>, label: SentimentLabel) -> Article {
        Article {
            id,
            fingerprint: format!("fp-{id}"),
            source: "kompas".to_string(),
            title: None,
            url: None,
            summary: None,
            published_at: published
                .map(|(d, h)| Utc.with_ymd_and_hms(2024, 1, d, h, 0, 0).unwrap()),
            sentiment: Sentiment {
                label,
                polarity: 0.0,
                subjectivity: 0.0,
            },
            run_id: "R1".to_string(),
            language_ok: true,
            created_at: Utc::now(),
        }
    }

    fn first_week() -> DateRange {
        DateRange::new(day("2024-01-01"), day("2024-01-07")).unwrap()
    }

    #[test]
    fn test_three_positive_two_negative() {
        use SentimentLabel::*;
        let articles = vec![
            article(1, Some((3, 8)), Positive),
            article(2, Some((3, 9)), Negative),
            article(3, Some((3, 10)), Positive),
            article(4, Some((3, 23)), Negative),
            article(5, Some((3, 0)), Positive),
        ];
        let trend = sentiment_trend(&articles, &first_week());

        assert_eq!(
            trend,
            vec![
                TrendPoint { day: day("2024-01-03"), label: Negative, count: 2 },
                TrendPoint { day: day("2024-01-03"), label: Positive, count: 3 },
            ]
        );
    }

    #[test]
    fn test_conservation_and_ordering() {
        use SentimentLabel::*;
        let articles = vec![
            article(1, Some((5, 8)), Neutral),
            article(2, Some((2, 9)), Positive),
            article(3, None, Positive),
            article(4, Some((2, 12)), Negative),
            article(4, Some((2, 12)), Negative),
            article(5, Some((9, 12)), Negative),
            article(6, Some((7, 23)), Neutral),
        ];
        let trend = sentiment_trend(&articles, &first_week());

        let total: usize = trend.iter().map(|p| p.count).sum();
        // Ids 1, 2, 4, 6: dated, distinct, inside the range.
        assert_eq!(total, 4);

        let keys: Vec<_> = trend.iter().map(|p| (p.day, p.label)).collect();
        assert_eq!(
            keys,
            vec![
                (day("2024-01-02"), Negative),
                (day("2024-01-02"), Positive),
                (day("2024-01-05"), Neutral),
                (day("2024-01-07"), Neutral),
            ]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(sentiment_trend(&[], &first_week()).is_empty());
    }
}
