//! Store error types.
//!
//! This module defines the error types that can occur while writing to or
//! reading from an entity store.

use entity_indexer_shared::ComponentError;
use thiserror::Error;

/// Errors that can occur during entity store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Validation error (e.g., a record without an ID).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The store rejected or failed to persist a batch.
    #[error("Commit error: {0}")]
    CommitError(String),

    /// Failed to read a record.
    #[error("Read error: {0}")]
    ReadError(String),

    /// Failed to update an existing record.
    #[error("Update error: {0}")]
    UpdateError(String),

    /// Record not found.
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// Batch size exceeds configured maximum.
    #[error("Batch size {provided} exceeds maximum {max}")]
    BatchSizeExceeded { provided: usize, max: usize },

    /// Failed to serialize records for the store.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The finalise hook failed.
    #[error("Finalise error: {0}")]
    FinaliseError(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Lifecycle error of the underlying component.
    #[error("Component error: {0}")]
    ComponentError(#[from] ComponentError),
}

impl StoreError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a commit error.
    pub fn commit(msg: impl Into<String>) -> Self {
        Self::CommitError(msg.into())
    }

    /// Create a read error.
    pub fn read(msg: impl Into<String>) -> Self {
        Self::ReadError(msg.into())
    }

    /// Create an update error.
    pub fn update(msg: impl Into<String>) -> Self {
        Self::UpdateError(msg.into())
    }

    /// Create a not found error.
    pub fn not_found(entity_id: impl Into<String>) -> Self {
        Self::NotFound(entity_id.into())
    }

    /// Create a batch size exceeded error.
    pub fn batch_size_exceeded(provided: usize, max: usize) -> Self {
        Self::BatchSizeExceeded { provided, max }
    }

    /// Create a finalise error.
    pub fn finalise(msg: impl Into<String>) -> Self {
        Self::FinaliseError(msg.into())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
