//! Entity store trait definition.
//!
//! This module defines the abstract interface for the storage sink entities are
//! indexed into, allowing for different backend implementations.

use async_trait::async_trait;

use crate::errors::StoreError;
use entity_indexer_shared::{EntityRecord, IndexingComponent};

/// Abstracts the storage backend indexed entities are written to.
///
/// Implementations are wrapped by [`crate::IndexingDestination`], which is the
/// only thing the orchestrator talks to. Like every pluggable component the
/// store follows the [`IndexingComponent`] lifecycle.
///
/// # Thread Safety
///
/// Operations take `&self`; implementations keep their own interior
/// mutability and must be `Send + Sync`.
#[async_trait]
pub trait EntityStore: IndexingComponent {
    /// Persist a batch of records in a single operation.
    ///
    /// Records with an ID already present replace the stored record.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If every record was persisted
    /// * `Err(StoreError)` - If the batch was rejected; callers must assume none of it was stored
    async fn store_batch(&self, records: &[EntityRecord]) -> Result<(), StoreError>;

    /// Read a stored record by entity ID.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(record))` - If the entity is stored
    /// * `Ok(None)` - If no record exists for the ID
    /// * `Err(StoreError)` - If the read fails
    async fn get(&self, id: &str) -> Result<Option<EntityRecord>, StoreError>;

    /// Replace an existing record.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the record was updated
    /// * `Err(StoreError::NotFound)` - If the record does not exist
    /// * `Err(StoreError)` - If the update fails
    async fn update(&self, record: &EntityRecord) -> Result<(), StoreError>;

    /// Package or register the finished index. Called once after indexing
    /// and post-processing completed.
    async fn finalise(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}
