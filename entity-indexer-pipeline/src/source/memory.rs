//! In-memory sources backed by vectors and maps.

use std::collections::HashMap;

use async_trait::async_trait;

use super::{EntityDataIterator, EntityDataProvider, EntityIterator};
use crate::errors::SourceError;
use entity_indexer_shared::{EntityRecord, EntityScore, IndexingComponent};

/// Yields a fixed list of records in order.
pub struct VecEntityDataIterator {
    records: std::vec::IntoIter<EntityRecord>,
}

impl VecEntityDataIterator {
    pub fn new(records: Vec<EntityRecord>) -> Self {
        Self {
            records: records.into_iter(),
        }
    }
}

impl IndexingComponent for VecEntityDataIterator {
    fn name(&self) -> &str {
        "VecEntityDataIterator"
    }
}

#[async_trait]
impl EntityDataIterator for VecEntityDataIterator {
    async fn next_entity(&mut self) -> Result<Option<EntityRecord>, SourceError> {
        Ok(self.records.next())
    }
}

/// Yields a fixed list of `(id, score)` pairs in order.
pub struct VecEntityIterator {
    scores: std::vec::IntoIter<EntityScore>,
}

impl VecEntityIterator {
    pub fn new(scores: Vec<EntityScore>) -> Self {
        Self {
            scores: scores.into_iter(),
        }
    }
}

impl FromIterator<(String, Option<f64>)> for VecEntityIterator {
    fn from_iter<T: IntoIterator<Item = (String, Option<f64>)>>(iter: T) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(id, score)| EntityScore::new(id, score))
                .collect(),
        )
    }
}

impl IndexingComponent for VecEntityIterator {
    fn name(&self) -> &str {
        "VecEntityIterator"
    }
}

#[async_trait]
impl EntityIterator for VecEntityIterator {
    async fn next_score(&mut self) -> Result<Option<EntityScore>, SourceError> {
        Ok(self.scores.next())
    }
}

/// Looks records up in a map keyed by entity ID.
#[derive(Default)]
pub struct MapEntityDataProvider {
    records: HashMap<String, EntityRecord>,
}

impl MapEntityDataProvider {
    pub fn new(records: impl IntoIterator<Item = EntityRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|record| (record.id().to_string(), record))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl IndexingComponent for MapEntityDataProvider {
    fn name(&self) -> &str {
        "MapEntityDataProvider"
    }
}

#[async_trait]
impl EntityDataProvider for MapEntityDataProvider {
    async fn entity_data(&self, id: &str) -> Result<Option<EntityRecord>, SourceError> {
        Ok(self.records.get(id).cloned())
    }
}
