//! Named entity mention models.

use serde::{Deserialize, Serialize};

/// Entity classification emitted by the upstream NER model.
///
/// Closed set. Serialized with the model's short tags (`PER`, `ORG`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    #[serde(rename = "PER")]
    Person,
    #[serde(rename = "ORG")]
    Organization,
    #[serde(rename = "LOC")]
    Location,
    #[serde(rename = "GPE")]
    GeopoliticalEntity,
    #[serde(rename = "FAC")]
    Facility,
    #[serde(rename = "NOR")]
    PoliticalGroup,
    #[serde(rename = "EVT")]
    Event,
    #[serde(rename = "LAW")]
    Law,
    #[serde(rename = "DAT")]
    Date,
    #[serde(rename = "TIM")]
    Time,
    #[serde(rename = "MON")]
    Money,
    #[serde(rename = "PRC")]
    Percent,
    #[serde(rename = "QTY")]
    Quantity,
    #[serde(rename = "CRD")]
    Cardinal,
    #[serde(rename = "ORD")]
    Ordinal,
    #[serde(rename = "PRD")]
    Product,
    #[serde(rename = "WOA")]
    WorkOfArt,
    #[serde(rename = "LAN")]
    Language,
    #[serde(rename = "REG")]
    Religion,
}

impl EntityType {
    pub const ALL: [EntityType; 19] = [
        Self::Person,
        Self::Organization,
        Self::Location,
        Self::GeopoliticalEntity,
        Self::Facility,
        Self::PoliticalGroup,
        Self::Event,
        Self::Law,
        Self::Date,
        Self::Time,
        Self::Money,
        Self::Percent,
        Self::Quantity,
        Self::Cardinal,
        Self::Ordinal,
        Self::Product,
        Self::WorkOfArt,
        Self::Language,
        Self::Religion,
    ];

    /// Short tag as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "PER",
            Self::Organization => "ORG",
            Self::Location => "LOC",
            Self::GeopoliticalEntity => "GPE",
            Self::Facility => "FAC",
            Self::PoliticalGroup => "NOR",
            Self::Event => "EVT",
            Self::Law => "LAW",
            Self::Date => "DAT",
            Self::Time => "TIM",
            Self::Money => "MON",
            Self::Percent => "PRC",
            Self::Quantity => "QTY",
            Self::Cardinal => "CRD",
            Self::Ordinal => "ORD",
            Self::Product => "PRD",
            Self::WorkOfArt => "WOA",
            Self::Language => "LAN",
            Self::Religion => "REG",
        }
    }

    /// Parse a short tag or a descriptive name (case-insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        let by_name = match lowered.as_str() {
            "person" => Some(Self::Person),
            "organization" | "organisation" => Some(Self::Organization),
            "location" => Some(Self::Location),
            "gpe" | "geopolitical" => Some(Self::GeopoliticalEntity),
            "facility" => Some(Self::Facility),
            "political_group" | "norp" => Some(Self::PoliticalGroup),
            "event" => Some(Self::Event),
            "law" => Some(Self::Law),
            "date" => Some(Self::Date),
            "time" => Some(Self::Time),
            "money" => Some(Self::Money),
            "percent" => Some(Self::Percent),
            "quantity" => Some(Self::Quantity),
            "cardinal" => Some(Self::Cardinal),
            "ordinal" => Some(Self::Ordinal),
            "product" => Some(Self::Product),
            "work_of_art" => Some(Self::WorkOfArt),
            "language" => Some(Self::Language),
            "religion" => Some(Self::Religion),
            _ => None,
        };
        by_name.or_else(|| {
            Self::ALL
                .into_iter()
                .find(|t| t.as_str().eq_ignore_ascii_case(&lowered))
        })
    }
}

/// Normalize entity surface text for equality tests.
///
/// Trims, collapses internal whitespace, and lower-cases.
pub fn normalize_surface(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A stored entity mention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMention {
    pub id: i32,
    pub article_id: i32,
    pub surface_text: String,
    /// Output of [`normalize_surface`] on `surface_text`.
    pub normalized_text: String,
    pub entity_type: EntityType,
    /// Model confidence in [0, 1].
    pub confidence: f64,
    pub start_char: i32,
    pub end_char: i32,
}

/// Entity mention as delivered by the upstream NER stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionInput {
    #[serde(alias = "word")]
    pub surface_text: String,
    #[serde(alias = "entity_group")]
    pub entity_type: EntityType,
    #[serde(alias = "score")]
    pub confidence: f64,
    #[serde(default, alias = "start")]
    pub start_char: i32,
    #[serde(default, alias = "end")]
    pub end_char: i32,
}

impl MentionInput {
    /// Confidence clamped into [0, 1].
    pub fn clamped_confidence(&self) -> f64 {
        if self.confidence.is_nan() {
            0.0
        } else {
            self.confidence.clamp(0.0, 1.0)
        }
    }
}
