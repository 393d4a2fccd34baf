//! Score provider backed by an entity iterator.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{info, warn};

use super::{EntityIterator, EntityScoreProvider};
use crate::errors::SourceError;
use entity_indexer_shared::{ComponentError, EntityRecord, IndexingComponent};

/// Turns an [`EntityIterator`] into an [`EntityScoreProvider`].
///
/// The iterator is drained into an id to score table during `initialise`.
/// IDs the iterator never yielded are unranked. When an ID occurs more than
/// once, the last score wins.
pub struct EntityIteratorScoreProvider {
    iterator: Box<dyn EntityIterator>,
    scores: HashMap<String, Option<f64>>,
    loaded: bool,
}

impl EntityIteratorScoreProvider {
    pub fn new(iterator: Box<dyn EntityIterator>) -> Self {
        Self {
            iterator,
            scores: HashMap::new(),
            loaded: false,
        }
    }

    /// Number of IDs in the table.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

#[async_trait]
impl IndexingComponent for EntityIteratorScoreProvider {
    fn name(&self) -> &str {
        "EntityIteratorScoreProvider"
    }

    fn needs_initialisation(&self) -> bool {
        true
    }

    async fn initialise(&mut self) -> Result<(), ComponentError> {
        if self.loaded {
            return Ok(());
        }
        if self.iterator.needs_initialisation() {
            self.iterator.initialise().await?;
        }
        loop {
            match self.iterator.next_score().await {
                Ok(Some(entry)) => {
                    self.scores.insert(entry.id, entry.score);
                }
                Ok(None) => break,
                Err(e) if e.is_recoverable() => {
                    warn!(error = %e, iterator = %self.iterator.name(), "Skipping score entry");
                }
                Err(e) => return Err(e.into()),
            }
        }
        self.loaded = true;
        info!(
            iterator = %self.iterator.name(),
            count = self.scores.len(),
            "Loaded entity scores"
        );
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ComponentError> {
        self.scores.clear();
        self.iterator.close().await
    }
}

#[async_trait]
impl EntityScoreProvider for EntityIteratorScoreProvider {
    fn needs_data(&self) -> bool {
        false
    }

    async fn score_for_id(&self, id: &str) -> Result<Option<f64>, SourceError> {
        if !self.loaded {
            return Err(ComponentError::NotInitialised(self.name().to_string()).into());
        }
        Ok(self.scores.get(id).copied().flatten())
    }

    async fn score_for_record(&self, _record: &EntityRecord) -> Result<Option<f64>, SourceError> {
        Err(SourceError::unsupported(
            "EntityIteratorScoreProvider looks scores up by id",
        ))
    }
}
