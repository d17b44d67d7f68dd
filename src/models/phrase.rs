//! Framing phrase models.

use serde::{Deserialize, Serialize};

use super::entity::normalize_surface;

/// A stored framing phrase extracted around an entity mention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramingPhrase {
    pub id: i32,
    pub article_id: i32,
    pub entity_text: String,
    pub normalized_entity: String,
    pub phrase_text: String,
}

impl FramingPhrase {
    /// Grouping key for phrase ranking: case-folded, whitespace-collapsed.
    pub fn normalized_phrase(&self) -> String {
        normalize_surface(&self.phrase_text)
    }
}

/// Framing phrase as delivered by the upstream extraction stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhraseInput {
    #[serde(alias = "entity_word")]
    pub entity_surface_text: String,
    #[serde(alias = "framing_phrase")]
    pub phrase_text: String,
}
