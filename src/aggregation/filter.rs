//! Composable mention filter for the co-occurrence graph.

use std::collections::HashSet;

use crate::models::{normalize_surface, EntityMention, EntityType};

/// A single predicate built from independent clauses.
///
/// Empty sets impose no constraint.
#[derive(Debug, Clone)]
pub struct MentionFilter {
    pub min_confidence: f64,
    pub max_confidence: f64,
    pub allowed_types: HashSet<EntityType>,
    /// Normalized surface forms.
    pub excluded: HashSet<String>,
}

impl Default for MentionFilter {
    fn default() -> Self {
        Self {
            min_confidence: 0.0,
            max_confidence: 1.0,
            allowed_types: HashSet::new(),
            excluded: HashSet::new(),
        }
    }
}

impl MentionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_confidence(mut self, min: f64, max: f64) -> Self {
        self.min_confidence = min;
        self.max_confidence = max;
        self
    }

    pub fn with_types(mut self, types: impl IntoIterator<Item = EntityType>) -> Self {
        self.allowed_types.extend(types);
        self
    }

    pub fn excluding<S: AsRef<str>>(mut self, surfaces: impl IntoIterator<Item = S>) -> Self {
        self.excluded.extend(
            surfaces
                .into_iter()
                .map(|s| normalize_surface(s.as_ref()))
                .filter(|s| !s.is_empty()),
        );
        self
    }

    pub fn confidence_ok(&self, mention: &EntityMention) -> bool {
        mention.confidence >= self.min_confidence && mention.confidence <= self.max_confidence
    }

    pub fn type_ok(&self, entity_type: EntityType) -> bool {
        self.allowed_types.is_empty() || self.allowed_types.contains(&entity_type)
    }

    pub fn is_excluded(&self, normalized: &str) -> bool {
        self.excluded.contains(normalized)
    }

    /// Whether a mention may appear as a co-occurring entity.
    ///
    /// Sub-word fragments (surfaces containing `#`) never qualify.
    pub fn admits(&self, mention: &EntityMention) -> bool {
        !mention.surface_text.contains('#')
            && !mention.normalized_text.is_empty()
            && self.confidence_ok(mention)
            && self.type_ok(mention.entity_type)
            && !self.is_excluded(&mention.normalized_text)
    }
}
