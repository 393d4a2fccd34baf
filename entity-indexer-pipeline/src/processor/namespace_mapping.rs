use tracing::debug;

use super::{list_param, EntityProcessor};
use crate::errors::ProcessorError;
use entity_indexer_shared::{ComponentConfig, ComponentError, EntityRecord, IndexingComponent};

/// Parameter listing `legacy=canonical` prefix pairs, separated by `|`.
pub const PARAM_MAPPINGS: &str = "mappings";

/// Renames fields from legacy namespace prefixes to canonical ones.
///
/// The first matching mapping wins. Values are merged into the target field
/// when it already exists.
#[derive(Debug, Clone, Default)]
pub struct NamespaceMappingProcessor {
    mappings: Vec<(String, String)>,
}

impl NamespaceMappingProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mapping(mut self, legacy: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.mappings.push((legacy.into(), canonical.into()));
        self
    }

    fn map_field(&self, field: &str) -> Option<String> {
        self.mappings.iter().find_map(|(legacy, canonical)| {
            field
                .strip_prefix(legacy.as_str())
                .map(|rest| format!("{}{}", canonical, rest))
        })
    }
}

impl IndexingComponent for NamespaceMappingProcessor {
    fn name(&self) -> &str {
        "NamespaceMappingProcessor"
    }

    fn configure(&mut self, config: &ComponentConfig) -> Result<(), ComponentError> {
        let entries = list_param(config, PARAM_MAPPINGS);
        if entries.is_empty() {
            return Err(ComponentError::missing(PARAM_MAPPINGS));
        }
        for entry in entries {
            match entry.split_once('=') {
                Some((legacy, canonical)) if !legacy.trim().is_empty() => {
                    self.mappings
                        .push((legacy.trim().to_string(), canonical.trim().to_string()));
                }
                _ => {
                    return Err(ComponentError::invalid(
                        PARAM_MAPPINGS,
                        format!("'{}' is not a legacy=canonical pair", entry),
                    ))
                }
            }
        }
        Ok(())
    }
}

impl EntityProcessor for NamespaceMappingProcessor {
    fn process(&self, mut record: EntityRecord) -> Result<EntityRecord, ProcessorError> {
        let renames: Vec<(String, String)> = record
            .field_names()
            .filter_map(|field| self.map_field(field).map(|to| (field.to_string(), to)))
            .collect();
        for (from, to) in renames {
            debug!(entity_id = %record.id(), from = %from, to = %to, "Mapping field");
            record.rename(&from, &to);
        }
        Ok(record)
    }
}
