//! # Entity Indexer
//!
//! Main library for the entity indexer.
//!
//! This crate assembles an indexing job from its JSON definition: component
//! identifiers are resolved through the [`ComponentRegistry`], the resulting
//! pipeline is wrapped in [`Dependencies`] and run by the `entity-indexer`
//! binary.

pub mod config;

pub use config::{ComponentRegistry, ComponentSpec, Dependencies, IndexingJobConfig};

use entity_indexer_shared::ComponentError;
use thiserror::Error;

/// Errors that can occur while assembling or running an indexing job.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The job definition is not valid JSON.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] entity_indexer_pipeline::PipelineError),

    /// A component rejected its parameters.
    #[error("Component '{component}' is misconfigured: {source}")]
    ComponentError {
        component: String,
        #[source]
        source: ComponentError,
    },

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a component configuration error.
    pub fn component(component: impl Into<String>, source: ComponentError) -> Self {
        Self::ComponentError {
            component: component.into(),
            source,
        }
    }
}
