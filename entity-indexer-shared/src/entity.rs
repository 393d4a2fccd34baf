//! Entity record and score types.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Field the normalised score of an entity is stored under.
///
/// Processors must not change this field; the processor chain restores it.
pub const SCORE_FIELD: &str = "entity-rank";

/// A single typed value of an entity field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Plain text.
    Text(String),
    /// Text with a language tag.
    LangText { text: String, lang: String },
    /// Signed integer.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// Boolean flag.
    Boolean(bool),
    /// Point in time.
    Timestamp(DateTime<Utc>),
    /// Reference to another entity by ID.
    Reference(String),
}

impl FieldValue {
    /// Create a language tagged text value.
    pub fn lang_text(text: impl Into<String>, lang: impl Into<String>) -> Self {
        Self::LangText {
            text: text.into(),
            lang: lang.into(),
        }
    }

    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Text view of the value for text-like variants.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Reference(s) => Some(s),
            Self::LangText { text, .. } => Some(text),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

/// An entity as it moves through the indexing pipeline.
///
/// Fields keep their insertion order and every field may hold several values.
/// The pipeline itself only relies on [`EntityRecord::id`] and the
/// [`SCORE_FIELD`]; everything else is left to processors and stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    id: String,
    #[serde(default)]
    fields: IndexMap<String, Vec<FieldValue>>,
}

impl EntityRecord {
    /// Create an empty record for the given entity ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: IndexMap::new(),
        }
    }

    /// Builder style variant of [`EntityRecord::add`].
    pub fn with_value(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.add(field, value);
        self
    }

    /// The unique entity ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Append a value to a field, creating the field if needed.
    pub fn add(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.entry(field.into()).or_default().push(value.into());
    }

    /// Replace all values of a field with a single value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(field.into(), vec![value.into()]);
    }

    /// Replace all values of a field. An empty list removes the field.
    pub fn set_values(&mut self, field: impl Into<String>, values: Vec<FieldValue>) {
        let field = field.into();
        if values.is_empty() {
            self.fields.shift_remove(&field);
        } else {
            self.fields.insert(field, values);
        }
    }

    /// All values of a field; empty if the field is not present.
    pub fn get(&self, field: &str) -> &[FieldValue] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The first value of a field.
    pub fn first(&self, field: &str) -> Option<&FieldValue> {
        self.get(field).first()
    }

    /// Remove a field, preserving the order of the remaining ones.
    pub fn remove(&mut self, field: &str) -> Option<Vec<FieldValue>> {
        self.fields.shift_remove(field)
    }

    /// Whether the record has at least one value for the field.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Iterate over fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &[FieldValue])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Names of all fields in insertion order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of distinct fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Move all values of `from` to `to`, appending to existing values of `to`.
    ///
    /// Returns `false` if `from` was not present.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        if from == to {
            return self.contains(from);
        }
        match self.fields.shift_remove(from) {
            Some(values) => {
                self.fields.entry(to.to_string()).or_default().extend(values);
                true
            }
            None => false,
        }
    }

    /// The score stored under [`SCORE_FIELD`], if any.
    pub fn score(&self) -> Option<f64> {
        self.first(SCORE_FIELD).and_then(FieldValue::as_f64)
    }
}

/// An entity ID together with its (optional) score.
///
/// `None` means no score is known, which is different from a score of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityScore {
    /// The entity ID.
    pub id: String,
    /// Raw score, if known.
    pub score: Option<f64>,
}

impl EntityScore {
    /// Create a new entity score.
    pub fn new(id: impl Into<String>, score: Option<f64>) -> Self {
        Self {
            id: id.into(),
            score,
        }
    }
}
