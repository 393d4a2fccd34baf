//! # Entity Indexer Pipeline
//!
//! This crate provides the pipeline that pulls entities from a source, ranks
//! them and writes them to an indexing destination.
//!
//! ## Architecture
//!
//! The pipeline follows the Source-Normaliser-Processor-Destination pattern:
//!
//! 1. **Source**: Yields entities with their raw scores, in one of two shapes
//! 2. **Normaliser**: Maps raw scores onto a common scale and marks exclusions
//! 3. **Processor**: Transforms entity records before (and after) they are stored
//! 4. **Orchestrator**: Drives the indexing state machine and chunked commits

pub mod errors;
mod lifecycle;
pub mod normaliser;
pub mod orchestrator;
pub mod processor;
pub mod source;

pub use errors::{PipelineError, ProcessorError, SourceError};
pub use orchestrator::{Indexer, IndexerConfig, IndexingState, IndexingStats};
