//! Error types for the entity indexer pipeline.

use entity_indexer_repository::{LedgerError, StoreError};
use entity_indexer_shared::ComponentError;
use thiserror::Error;

use crate::orchestrator::IndexingState;

/// Errors that can occur in the entity indexer pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// An operation was invoked in a state that does not allow it.
    #[error("Illegal state: {operation} is not allowed while the indexer is {state}")]
    IllegalState {
        operation: &'static str,
        state: IndexingState,
    },

    /// A component was asked for something it declared it does not support.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The pipeline could not be assembled from the configured components.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Fatal error reading from the source.
    #[error("Source error: {0}")]
    SourceError(#[from] SourceError),

    /// Error from the destination; fatal while committing chunks.
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    /// Error recording or reading committed entity IDs.
    #[error("Ledger error: {0}")]
    LedgerError(#[from] LedgerError),

    /// A processor failed for a single record.
    #[error("Processor error: {0}")]
    ProcessorError(#[from] ProcessorError),

    /// A component failed to initialise.
    #[error("Component '{component}' failed: {source}")]
    ComponentError {
        component: String,
        #[source]
        source: ComponentError,
    },
}

impl PipelineError {
    /// Create an illegal state error.
    pub fn illegal_state(operation: &'static str, state: IndexingState) -> Self {
        Self::IllegalState { operation, state }
    }

    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::ConfigurationError(msg.into())
    }

    /// Create a component error.
    pub fn component(component: impl Into<String>, source: ComponentError) -> Self {
        Self::ComponentError {
            component: component.into(),
            source,
        }
    }
}

/// Errors raised by sources and score providers.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The underlying data could not be read; aborts the run.
    #[error("Read error: {0}")]
    ReadError(String),

    /// A single entry could not be parsed; the entry is skipped.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Looking up the score or data of a single entity failed; the entity is skipped.
    #[error("Lookup error for entity '{entity_id}': {reason}")]
    LookupError { entity_id: String, reason: String },

    /// The wrong accessor was called on a score provider.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Lifecycle error of the source component.
    #[error("Component error: {0}")]
    ComponentError(#[from] ComponentError),
}

impl SourceError {
    /// Create a read error.
    pub fn read(msg: impl Into<String>) -> Self {
        Self::ReadError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a lookup error for one entity.
    pub fn lookup(entity_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LookupError {
            entity_id: entity_id.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported operation error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Whether the error concerns a single entity and the run can continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ParseError(_) | Self::LookupError { .. })
    }
}

impl From<SourceError> for ComponentError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::ComponentError(inner) => inner,
            SourceError::IoError(io) => ComponentError::IoError(io),
            other => ComponentError::initialisation(other.to_string()),
        }
    }
}

/// Error raised by an entity processor for a single record.
#[derive(Error, Debug)]
pub enum ProcessorError {
    /// The processor could not transform the record.
    #[error("Processor '{processor}' failed for entity '{entity_id}': {reason}")]
    Failed {
        processor: String,
        entity_id: String,
        reason: String,
    },

    /// The processor returned a record with a different ID.
    #[error("Processor '{processor}' changed the entity id from '{expected}' to '{actual}'")]
    IdChanged {
        processor: String,
        expected: String,
        actual: String,
    },
}

impl ProcessorError {
    /// Create a processing failure.
    pub fn failed(
        processor: impl Into<String>,
        entity_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Failed {
            processor: processor.into(),
            entity_id: entity_id.into(),
            reason: reason.into(),
        }
    }
}
