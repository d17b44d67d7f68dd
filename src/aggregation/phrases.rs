//! Frequency-ranked framing phrases.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{normalize_surface, FramingPhrase};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhraseCount {
    pub phrase: String,
    pub count: usize,
}

/// Rank the phrases extracted around `entity`.
///
/// Phrases are grouped on their normalized text and counted per row. Ties
/// keep first-seen order, where first seen means lowest (article id, row id).
pub fn rank_phrases(entity: &str, phrases: &[FramingPhrase], limit: Option<usize>) -> Vec<PhraseCount> {
    let entity_key = normalize_surface(entity);

    let mut ordered: Vec<&FramingPhrase> = phrases
        .iter()
        .filter(|p| p.normalized_entity == entity_key)
        .collect();
    ordered.sort_by_key(|p| (p.article_id, p.id));

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut ranked: Vec<PhraseCount> = Vec::new();
    for phrase in ordered {
        let key = phrase.normalized_phrase();
        if key.is_empty() {
            continue;
        }
        match index.get(&key) {
            Some(&i) => ranked[i].count += 1,
            None => {
                index.insert(key.clone(), ranked.len());
                ranked.push(PhraseCount { phrase: key, count: 1 });
            }
        }
    }

    // Stable sort keeps first-seen order among equal counts.
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    if let Some(limit) = limit {
        ranked.truncate(limit);
    }
    ranked
}
