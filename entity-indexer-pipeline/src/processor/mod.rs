//! Entity processors.
//!
//! Processors are record to record transforms. The indexer runs the main
//! [`ProcessorChain`] on every entity before it enters a chunk and the
//! post-processing chain on records read back from the destination.

mod chain;
mod field_filter;
mod namespace_mapping;
mod value_converter;

use crate::errors::ProcessorError;
use entity_indexer_shared::{ComponentConfig, EntityRecord, IndexingComponent};

pub use chain::ProcessorChain;
pub use field_filter::FieldFilterProcessor;
pub use namespace_mapping::NamespaceMappingProcessor;
pub use value_converter::{ValueConverterProcessor, ValueKind};

/// Separator of list valued processor parameters (`a|b|c`).
pub const LIST_SEPARATOR: char = '|';

/// Transforms one entity record.
///
/// Implementations must keep the record ID and have no side effects beyond
/// the returned record.
pub trait EntityProcessor: IndexingComponent {
    fn process(&self, record: EntityRecord) -> Result<EntityRecord, ProcessorError>;
}

/// Split a list valued parameter into its trimmed, non-empty items.
pub(crate) fn list_param(config: &ComponentConfig, key: &str) -> Vec<String> {
    config
        .get_str(key)
        .map(|value| {
            value
                .split(LIST_SEPARATOR)
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}
