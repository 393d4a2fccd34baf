//! Job configuration and dependency wiring.

pub mod dependencies;
pub mod job;
pub mod registry;

pub use dependencies::Dependencies;
pub use job::{ComponentSpec, IndexingJobConfig};
pub use registry::ComponentRegistry;
