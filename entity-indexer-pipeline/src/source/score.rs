//! Score provider reading the raw score from a field of the record.

use async_trait::async_trait;
use tracing::debug;

use super::EntityScoreProvider;
use crate::errors::SourceError;
use entity_indexer_shared::{ComponentConfig, ComponentError, EntityRecord, IndexingComponent};

/// Parameter naming the field holding the raw score.
pub const PARAM_FIELD: &str = "field";

/// Reads the raw score from the first value of a record field.
///
/// Records without the field are unranked. A value that is not numeric is
/// reported as a lookup error and skips the entity.
pub struct FieldScoreProvider {
    field: String,
}

impl FieldScoreProvider {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

impl Default for FieldScoreProvider {
    fn default() -> Self {
        Self::new("score")
    }
}

impl IndexingComponent for FieldScoreProvider {
    fn name(&self) -> &str {
        "FieldScoreProvider"
    }

    fn configure(&mut self, config: &ComponentConfig) -> Result<(), ComponentError> {
        if config.contains(PARAM_FIELD) {
            self.field = config.require_str(PARAM_FIELD)?.trim().to_string();
        }
        Ok(())
    }
}

#[async_trait]
impl EntityScoreProvider for FieldScoreProvider {
    fn needs_data(&self) -> bool {
        true
    }

    async fn score_for_id(&self, _id: &str) -> Result<Option<f64>, SourceError> {
        Err(SourceError::unsupported(
            "FieldScoreProvider computes scores from entity data",
        ))
    }

    async fn score_for_record(&self, record: &EntityRecord) -> Result<Option<f64>, SourceError> {
        let Some(value) = record.first(&self.field) else {
            debug!(entity_id = %record.id(), field = %self.field, "No score field");
            return Ok(None);
        };
        value.as_f64().map(Some).ok_or_else(|| {
            SourceError::lookup(
                record.id(),
                format!("value of '{}' is not numeric", self.field),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_numeric_values() {
        let provider = FieldScoreProvider::new("rank");
        let record = EntityRecord::new("urn:a").with_value("rank", 42i64);
        assert_eq!(provider.score_for_record(&record).await.unwrap(), Some(42.0));

        let text = EntityRecord::new("urn:b").with_value("rank", "3.5");
        assert_eq!(provider.score_for_record(&text).await.unwrap(), Some(3.5));
    }

    #[tokio::test]
    async fn test_missing_field_is_unranked() {
        let provider = FieldScoreProvider::new("rank");
        let record = EntityRecord::new("urn:a");
        assert_eq!(provider.score_for_record(&record).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_non_numeric_value_is_recoverable() {
        let provider = FieldScoreProvider::new("rank");
        let record = EntityRecord::new("urn:a").with_value("rank", true);
        let err = provider.score_for_record(&record).await.unwrap_err();
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_lookup_by_id_is_unsupported() {
        let provider = FieldScoreProvider::default();
        assert!(matches!(
            provider.score_for_id("urn:a").await,
            Err(SourceError::Unsupported(_))
        ));
    }

    #[test]
    fn test_configure_field() {
        let mut provider = FieldScoreProvider::default();
        provider
            .configure(&ComponentConfig::new().with(PARAM_FIELD, "popularity"))
            .unwrap();
        assert_eq!(provider.field(), "popularity");
    }
}
