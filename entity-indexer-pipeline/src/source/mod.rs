//! Entity sources.
//!
//! Entities reach the indexer in one of two shapes:
//!
//! - **data-iterating**: an [`EntityDataIterator`] yields complete records and an
//!   [`EntityScoreProvider`] supplies the raw score of each one.
//! - **id-iterating**: an [`EntityIterator`] yields `(id, score)` pairs and an
//!   [`EntityDataProvider`] looks up the record for each ID. Entities excluded by
//!   their score are never fetched.
//!
//! A data iterator paired with an entity iterator (and no score provider) is
//! also accepted: the entity iterator is drained into an id to score table and
//! used as the score provider, see [`EntityIteratorScoreProvider`].
//!
//! All sources are single pass.

mod adapter;
mod json_lines;
mod line_based;
mod lines;
mod memory;
mod score;
mod wiring;

use async_trait::async_trait;

use crate::errors::SourceError;
use entity_indexer_shared::{EntityRecord, EntityScore, IndexingComponent};

pub use adapter::EntityIteratorScoreProvider;
pub use json_lines::{JsonLinesEntityDataIterator, JsonLinesEntityDataProvider};
pub use line_based::LineBasedEntityIterator;
pub use memory::{MapEntityDataProvider, VecEntityDataIterator, VecEntityIterator};
pub use score::FieldScoreProvider;
pub use wiring::{EntitySource, SourceComponents, SourceMode};

/// Iterates over complete entity records.
#[async_trait]
pub trait EntityDataIterator: IndexingComponent {
    /// Next record, or `None` once the source is exhausted.
    ///
    /// Recoverable errors (see [`SourceError::is_recoverable`]) skip a single
    /// entry; the next call continues with the following one.
    async fn next_entity(&mut self) -> Result<Option<EntityRecord>, SourceError>;
}

/// Supplies the raw score of an entity.
#[async_trait]
pub trait EntityScoreProvider: IndexingComponent {
    /// Whether scores are computed from the record (`score_for_record`) rather
    /// than looked up by ID (`score_for_id`).
    fn needs_data(&self) -> bool;

    /// Score of the entity with the given ID. `None` means unranked.
    async fn score_for_id(&self, id: &str) -> Result<Option<f64>, SourceError>;

    /// Score computed from the record. `None` means unranked.
    async fn score_for_record(&self, record: &EntityRecord) -> Result<Option<f64>, SourceError>;
}

/// Iterates over `(id, score)` pairs.
#[async_trait]
pub trait EntityIterator: IndexingComponent {
    /// Next pair, or `None` once the source is exhausted.
    async fn next_score(&mut self) -> Result<Option<EntityScore>, SourceError>;
}

/// Looks up entity records by ID.
#[async_trait]
pub trait EntityDataProvider: IndexingComponent {
    /// The record for `id`, or `None` if the provider does not know it.
    async fn entity_data(&self, id: &str) -> Result<Option<EntityRecord>, SourceError>;
}
