use super::{list_param, EntityProcessor};
use crate::errors::ProcessorError;
use entity_indexer_shared::{ComponentConfig, ComponentError, EntityRecord, IndexingComponent};

pub const PARAM_INCLUDE: &str = "include";
pub const PARAM_EXCLUDE: &str = "exclude";

/// Field name pattern: an exact name, or a prefix followed by `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FieldPattern {
    Exact(String),
    Prefix(String),
}

impl FieldPattern {
    fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix('*') {
            Some(prefix) => Self::Prefix(prefix.to_string()),
            None => Self::Exact(pattern.to_string()),
        }
    }

    fn matches(&self, field: &str) -> bool {
        match self {
            Self::Exact(name) => name == field,
            Self::Prefix(prefix) => field.starts_with(prefix.as_str()),
        }
    }
}

/// Keeps the fields matching the include list and drops those matching the
/// exclude list. An empty include list keeps everything.
#[derive(Debug, Clone, Default)]
pub struct FieldFilterProcessor {
    include: Vec<FieldPattern>,
    exclude: Vec<FieldPattern>,
}

impl FieldFilterProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(mut self, pattern: &str) -> Self {
        self.include.push(FieldPattern::parse(pattern));
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.exclude.push(FieldPattern::parse(pattern));
        self
    }

    fn keeps(&self, field: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|p| p.matches(field));
        included && !self.exclude.iter().any(|p| p.matches(field))
    }
}

impl IndexingComponent for FieldFilterProcessor {
    fn name(&self) -> &str {
        "FieldFilterProcessor"
    }

    fn configure(&mut self, config: &ComponentConfig) -> Result<(), ComponentError> {
        self.include
            .extend(list_param(config, PARAM_INCLUDE).iter().map(|p| FieldPattern::parse(p)));
        self.exclude
            .extend(list_param(config, PARAM_EXCLUDE).iter().map(|p| FieldPattern::parse(p)));
        if self.include.is_empty() && self.exclude.is_empty() {
            return Err(ComponentError::missing(PARAM_INCLUDE));
        }
        Ok(())
    }
}

impl EntityProcessor for FieldFilterProcessor {
    fn process(&self, mut record: EntityRecord) -> Result<EntityRecord, ProcessorError> {
        let dropped: Vec<String> = record
            .field_names()
            .filter(|field| !self.keeps(field))
            .map(String::from)
            .collect();
        for field in dropped {
            record.remove(&field);
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> EntityRecord {
        EntityRecord::new("urn:a")
            .with_value("rdfs:label", "A")
            .with_value("rdfs:comment", "about A")
            .with_value("geo:lat", 1.0)
            .with_value("internal", true)
    }

    #[test]
    fn test_include_prefix_and_exclude_exact() {
        let filter = FieldFilterProcessor::new()
            .include("rdfs:*")
            .include("geo:lat")
            .exclude("rdfs:comment");
        let processed = filter.process(record()).unwrap();
        let fields: Vec<&str> = processed.field_names().collect();
        assert_eq!(fields, vec!["rdfs:label", "geo:lat"]);
    }

    #[test]
    fn test_exclude_only() {
        let mut filter = FieldFilterProcessor::new();
        filter
            .configure(&ComponentConfig::new().with(PARAM_EXCLUDE, "internal|geo:*"))
            .unwrap();
        let processed = filter.process(record()).unwrap();
        let fields: Vec<&str> = processed.field_names().collect();
        assert_eq!(fields, vec!["rdfs:label", "rdfs:comment"]);
    }

    #[test]
    fn test_configure_requires_a_list() {
        let mut filter = FieldFilterProcessor::new();
        assert!(filter.configure(&ComponentConfig::new()).is_err());
    }
}
