//! Indexing destination implementation.
//!
//! This module provides the wrapper the orchestrator writes through. It puts
//! chunk validation and a once-only finalise in front of an opaque
//! [`EntityStore`].

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::config::DestinationConfig;
use crate::errors::StoreError;
use crate::interfaces::EntityStore;
use entity_indexer_shared::{ComponentConfig, ComponentError, EntityRecord, IndexingComponent};

/// The storage sink as seen by the orchestrator.
///
/// During indexing only [`IndexingDestination::commit_chunk`] is used; after
/// indexing (and optional post-processing) [`IndexingDestination::finalise`]
/// is called exactly once. Post-processing reads committed records back with
/// [`IndexingDestination::fetch`] and stores the result with
/// [`IndexingDestination::write_back`].
pub struct IndexingDestination {
    store: Box<dyn EntityStore>,
    config: DestinationConfig,
    finalised: bool,
}

impl IndexingDestination {
    /// Create a new destination with default configuration.
    pub fn new(store: Box<dyn EntityStore>) -> Self {
        Self {
            store,
            config: DestinationConfig::default(),
            finalised: false,
        }
    }

    /// Create a new destination with custom configuration.
    pub fn with_config(store: Box<dyn EntityStore>, config: DestinationConfig) -> Self {
        Self {
            store,
            config,
            finalised: false,
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &DestinationConfig {
        &self.config
    }

    /// The wrapped store.
    pub fn store(&self) -> &dyn EntityStore {
        self.store.as_ref()
    }

    /// Whether [`IndexingDestination::finalise`] already ran.
    pub fn is_finalised(&self) -> bool {
        self.finalised
    }

    fn validate_chunk(&self, chunk: &[EntityRecord]) -> Result<(), StoreError> {
        self.config.check_batch_size(chunk.len())?;
        if self.config.validate_ids {
            if let Some(position) = chunk.iter().position(|r| r.id().is_empty()) {
                return Err(StoreError::validation(format!(
                    "record at position {} of the chunk has an empty id",
                    position
                )));
            }
        }
        Ok(())
    }

    /// Commit one chunk of processed records as a single batch.
    ///
    /// An empty chunk is a no-op. A chunk that fails validation never reaches
    /// the store.
    #[instrument(skip(self, chunk), fields(chunk_size = chunk.len()))]
    pub async fn commit_chunk(&self, chunk: &[EntityRecord]) -> Result<(), StoreError> {
        if chunk.is_empty() {
            return Ok(());
        }
        self.validate_chunk(chunk)?;
        self.store.store_batch(chunk).await?;
        debug!(count = chunk.len(), "Committed chunk");
        Ok(())
    }

    /// Read a committed record back from the store.
    pub async fn fetch(&self, id: &str) -> Result<Option<EntityRecord>, StoreError> {
        if id.is_empty() {
            return Err(StoreError::validation("entity id is required"));
        }
        self.store.get(id).await
    }

    /// Replace a committed record with its post-processed version.
    pub async fn write_back(&self, record: &EntityRecord) -> Result<(), StoreError> {
        if record.id().is_empty() {
            return Err(StoreError::validation("entity id is required"));
        }
        self.store.update(record).await
    }

    /// Run the store's finalise hook. Only the first call reaches the store.
    pub async fn finalise(&mut self) -> Result<(), StoreError> {
        if self.finalised {
            return Ok(());
        }
        info!(store = self.store.name(), "Finalising destination");
        self.store.finalise().await?;
        self.finalised = true;
        Ok(())
    }
}

#[async_trait]
impl IndexingComponent for IndexingDestination {
    fn name(&self) -> &str {
        self.store.name()
    }

    fn configure(&mut self, config: &ComponentConfig) -> Result<(), ComponentError> {
        self.store.configure(config)
    }

    fn needs_initialisation(&self) -> bool {
        self.store.needs_initialisation()
    }

    async fn initialise(&mut self) -> Result<(), ComponentError> {
        self.store.initialise().await
    }

    async fn close(&mut self) -> Result<(), ComponentError> {
        self.store.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Mock store counting calls.
    #[derive(Default)]
    struct MockStore {
        stored: Arc<AtomicUsize>,
        finalised: Arc<AtomicUsize>,
    }

    impl IndexingComponent for MockStore {}

    #[async_trait]
    impl EntityStore for MockStore {
        async fn store_batch(&self, records: &[EntityRecord]) -> Result<(), StoreError> {
            self.stored.fetch_add(records.len(), Ordering::SeqCst);
            Ok(())
        }

        async fn get(&self, _id: &str) -> Result<Option<EntityRecord>, StoreError> {
            Ok(None)
        }

        async fn update(&self, record: &EntityRecord) -> Result<(), StoreError> {
            Err(StoreError::not_found(record.id()))
        }

        async fn finalise(&mut self) -> Result<(), StoreError> {
            self.finalised.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn records(count: usize) -> Vec<EntityRecord> {
        (0..count)
            .map(|i| EntityRecord::new(format!("urn:test:{}", i)))
            .collect()
    }

    #[tokio::test]
    async fn test_commit_chunk() {
        let store = MockStore::default();
        let stored = store.stored.clone();
        let destination = IndexingDestination::new(Box::new(store));

        destination.commit_chunk(&records(3)).await.unwrap();
        destination.commit_chunk(&[]).await.unwrap();

        assert_eq!(stored.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_commit_chunk_too_large() {
        let store = MockStore::default();
        let stored = store.stored.clone();
        let destination = IndexingDestination::with_config(
            Box::new(store),
            DestinationConfig::with_max_batch_size(2),
        );

        let result = destination.commit_chunk(&records(3)).await;

        assert!(matches!(result, Err(StoreError::BatchSizeExceeded { .. })));
        assert_eq!(stored.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_commit_chunk_rejects_empty_id() {
        let destination = IndexingDestination::new(Box::new(MockStore::default()));
        let mut chunk = records(2);
        chunk.push(EntityRecord::new(""));

        let result = destination.commit_chunk(&chunk).await;
        assert!(matches!(result, Err(StoreError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_finalise_runs_once() {
        let store = MockStore::default();
        let finalised = store.finalised.clone();
        let mut destination = IndexingDestination::new(Box::new(store));

        destination.finalise().await.unwrap();
        destination.finalise().await.unwrap();

        assert!(destination.is_finalised());
        assert_eq!(finalised.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_write_back_validation() {
        let destination = IndexingDestination::new(Box::new(MockStore::default()));

        assert!(destination.fetch("").await.is_err());
        assert!(matches!(
            destination.write_back(&EntityRecord::new("urn:x")).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
