//! Configuration types for the IndexingDestination.

use crate::errors::StoreError;

/// Configuration for the IndexingDestination.
#[derive(Debug, Clone)]
pub struct DestinationConfig {
    /// Maximum number of records allowed in a single committed chunk.
    /// `None` (the default) disables the limit.
    pub max_batch_size: Option<usize>,
    /// Reject chunks containing records with an empty ID before they reach the store.
    pub validate_ids: bool,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            max_batch_size: None,
            validate_ids: true,
        }
    }
}

impl DestinationConfig {
    /// Create a config with a custom chunk size limit.
    pub fn with_max_batch_size(max_batch_size: usize) -> Self {
        Self {
            max_batch_size: Some(max_batch_size),
            ..Self::default()
        }
    }

    /// Check a chunk size against the configured limit.
    pub fn check_batch_size(&self, size: usize) -> Result<(), StoreError> {
        match self.max_batch_size {
            Some(max) if size > max => Err(StoreError::batch_size_exceeded(size, max)),
            _ => Ok(()),
        }
    }
}
