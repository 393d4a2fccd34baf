use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use super::{list_param, EntityProcessor};
use crate::errors::ProcessorError;
use entity_indexer_shared::{
    ComponentConfig, ComponentError, EntityRecord, FieldValue, IndexingComponent,
};

pub const PARAM_INTEGER: &str = "integer";
pub const PARAM_FLOAT: &str = "float";
pub const PARAM_BOOLEAN: &str = "boolean";
pub const PARAM_TIMESTAMP: &str = "timestamp";
/// Fail the record instead of keeping unconvertible values as text.
pub const PARAM_STRICT: &str = "strict";

/// Target type of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Float,
    Boolean,
    Timestamp,
}

impl ValueKind {
    fn convert(self, text: &str) -> Option<FieldValue> {
        let text = text.trim();
        match self {
            Self::Integer => text.parse::<i64>().ok().map(FieldValue::Integer),
            Self::Float => text
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(FieldValue::Float),
            Self::Boolean => text.to_ascii_lowercase().parse::<bool>().ok().map(FieldValue::Boolean),
            Self::Timestamp => parse_timestamp(text).map(FieldValue::Timestamp),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integer => PARAM_INTEGER,
            Self::Float => PARAM_FLOAT,
            Self::Boolean => PARAM_BOOLEAN,
            Self::Timestamp => PARAM_TIMESTAMP,
        };
        f.write_str(name)
    }
}

/// RFC 3339 date-time or a plain `YYYY-MM-DD` date (midnight UTC).
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Coerces text values of configured fields into typed values.
///
/// Values that are not text are left alone. Unconvertible text is kept as it
/// is unless the processor is strict.
#[derive(Debug, Clone, Default)]
pub struct ValueConverterProcessor {
    fields: HashMap<String, ValueKind>,
    strict: bool,
}

impl ValueConverterProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, field: impl Into<String>, kind: ValueKind) -> Self {
        self.fields.insert(field.into(), kind);
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }
}

impl IndexingComponent for ValueConverterProcessor {
    fn name(&self) -> &str {
        "ValueConverterProcessor"
    }

    fn configure(&mut self, config: &ComponentConfig) -> Result<(), ComponentError> {
        let kinds = [
            (PARAM_INTEGER, ValueKind::Integer),
            (PARAM_FLOAT, ValueKind::Float),
            (PARAM_BOOLEAN, ValueKind::Boolean),
            (PARAM_TIMESTAMP, ValueKind::Timestamp),
        ];
        for (param, kind) in kinds {
            for field in list_param(config, param) {
                if let Some(previous) = self.fields.insert(field.clone(), kind) {
                    if previous != kind {
                        return Err(ComponentError::invalid(
                            param,
                            format!("field '{}' is already converted to {}", field, previous),
                        ));
                    }
                }
            }
        }
        if self.fields.is_empty() {
            return Err(ComponentError::missing(PARAM_INTEGER));
        }
        if let Some(strict) = config.get_bool(PARAM_STRICT)? {
            self.strict = strict;
        }
        Ok(())
    }
}

impl EntityProcessor for ValueConverterProcessor {
    fn process(&self, mut record: EntityRecord) -> Result<EntityRecord, ProcessorError> {
        for (field, kind) in &self.fields {
            if !record.contains(field) {
                continue;
            }
            let mut converted = Vec::with_capacity(record.get(field).len());
            for value in record.get(field) {
                let FieldValue::Text(text) = value else {
                    converted.push(value.clone());
                    continue;
                };
                match kind.convert(text) {
                    Some(typed) => converted.push(typed),
                    None if self.strict => {
                        return Err(ProcessorError::failed(
                            self.name(),
                            record.id(),
                            format!("'{}' in field '{}' is not a valid {}", text, field, kind),
                        ))
                    }
                    None => {
                        debug!(entity_id = %record.id(), field = %field, kind = %kind, "Keeping unconvertible value");
                        converted.push(value.clone());
                    }
                }
            }
            record.set_values(field.as_str(), converted);
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_converts_text_values() {
        let processor = ValueConverterProcessor::new()
            .with_field("population", ValueKind::Integer)
            .with_field("lat", ValueKind::Float)
            .with_field("capital", ValueKind::Boolean)
            .with_field("founded", ValueKind::Timestamp);
        let record = EntityRecord::new("urn:a")
            .with_value("population", "1200")
            .with_value("lat", "48.2")
            .with_value("capital", "TRUE")
            .with_value("founded", "1850-06-01")
            .with_value("founded", "2001-02-03T04:05:06+01:00");

        let processed = processor.process(record).unwrap();
        assert_eq!(processed.get("population"), &[FieldValue::Integer(1200)]);
        assert_eq!(processed.get("lat"), &[FieldValue::Float(48.2)]);
        assert_eq!(processed.get("capital"), &[FieldValue::Boolean(true)]);
        assert_eq!(
            processed.get("founded"),
            &[
                FieldValue::Timestamp(Utc.with_ymd_and_hms(1850, 6, 1, 0, 0, 0).unwrap()),
                FieldValue::Timestamp(Utc.with_ymd_and_hms(2001, 2, 3, 3, 5, 6).unwrap()),
            ]
        );
    }

    #[test]
    fn test_lenient_and_strict_modes() {
        let record = EntityRecord::new("urn:a").with_value("population", "many");

        let lenient = ValueConverterProcessor::new().with_field("population", ValueKind::Integer);
        let processed = lenient.process(record.clone()).unwrap();
        assert_eq!(processed.get("population"), &[FieldValue::from("many")]);

        let strict = lenient.strict();
        assert!(matches!(
            strict.process(record),
            Err(ProcessorError::Failed { .. })
        ));
    }

    #[test]
    fn test_configure_rejects_conflicts() {
        let mut processor = ValueConverterProcessor::new();
        let config = ComponentConfig::new()
            .with(PARAM_INTEGER, "a|b")
            .with(PARAM_FLOAT, "b");
        assert!(processor.configure(&config).is_err());

        let mut empty = ValueConverterProcessor::new();
        assert!(empty.configure(&ComponentConfig::new()).is_err());
    }
}
