//! # Entity Indexer Shared
//!
//! Types shared by every layer of the entity indexer:
//!
//! - [`EntityRecord`]: the opaque, ID-keyed, multi-valued payload moved through the pipeline
//! - [`EntityScore`]: an entity ID paired with an optional ranking score
//! - [`IndexingComponent`]: the configure/initialise/close contract implemented by
//!   every pluggable source, processor and destination

pub mod component;
pub mod entity;

pub use component::{ComponentConfig, ComponentError, IndexingComponent};
pub use entity::{EntityRecord, EntityScore, FieldValue, SCORE_FIELD};
