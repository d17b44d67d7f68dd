//! Data models for mediawatch.

mod article;
mod entity;
mod phrase;
mod run;

pub use article::{Article, CanonicalArticle, IngestRecord, Sentiment, SentimentLabel};
pub use entity::{normalize_surface, EntityMention, EntityType, MentionInput};
pub use phrase::{FramingPhrase, PhraseInput};
pub use run::{
    Run, RunOutcome, RunStatistic, RunStatus, SourceStatistic, Stage, StageCounters, StageFlags,
    StatValue,
};
