//! JSON definition of an indexing job.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::IndexingError;
use entity_indexer_pipeline::processor::LIST_SEPARATOR;
use entity_indexer_shared::ComponentConfig;

/// A component given by its registered identifier and its parameters.
///
/// Parameter values may be strings, numbers or booleans. `null` sets a flag
/// without value, arrays become `|` separated lists and objects become
/// `key=value` lists:
///
/// ```json
/// { "type": "NamespaceMappingProcessor", "params": { "mappings": { "dbp:": "dbpedia:" } } }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

impl ComponentSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// The parameters in the form components are configured with.
    pub fn config(&self) -> ComponentConfig {
        let mut config = ComponentConfig::new();
        for (key, value) in &self.params {
            config.insert(key.as_str(), param_value(value));
        }
        config
    }
}

fn param_value(value: &Value) -> Option<String> {
    let separator = LIST_SEPARATOR.to_string();
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(param_value)
                .collect::<Vec<_>>()
                .join(&separator),
        ),
        Value::Object(entries) => Some(
            entries
                .iter()
                .filter_map(|(k, v)| param_value(v).map(|v| format!("{}={}", k, v)))
                .collect::<Vec<_>>()
                .join(&separator),
        ),
        other => Some(other.to_string()),
    }
}

/// Everything needed to assemble one [`entity_indexer_pipeline::Indexer`].
///
/// Exactly one source wiring must be given: `data_iterator` with
/// `score_provider`, `entity_iterator` with `data_provider`, or
/// `data_iterator` with `entity_iterator`. The normaliser chain uses the
/// `Name,key:value;Name` syntax, outermost normaliser first.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexingJobConfig {
    pub name: String,
    #[serde(default)]
    pub chunk_size: Option<i64>,
    #[serde(default)]
    pub index_all_entities: bool,
    #[serde(default)]
    pub ledger_path: Option<PathBuf>,
    /// Upper bound for the chunk size accepted by the destination.
    #[serde(default)]
    pub max_batch_size: Option<usize>,
    /// Post-process the entities committed by an earlier run instead of reading the source.
    #[serde(default)]
    pub skip_indexing: bool,
    #[serde(default)]
    pub skip_post_processing: bool,
    #[serde(default)]
    pub data_iterator: Option<ComponentSpec>,
    #[serde(default)]
    pub score_provider: Option<ComponentSpec>,
    #[serde(default)]
    pub entity_iterator: Option<ComponentSpec>,
    #[serde(default)]
    pub data_provider: Option<ComponentSpec>,
    #[serde(default)]
    pub score_normaliser: Option<String>,
    #[serde(default)]
    pub processors: Vec<ComponentSpec>,
    #[serde(default)]
    pub post_processors: Vec<ComponentSpec>,
    pub destination: ComponentSpec,
}

impl IndexingJobConfig {
    /// Parse a job definition.
    pub fn from_json(json: &str) -> Result<Self, IndexingError> {
        let job: Self = serde_json::from_str(json)?;
        job.validate()?;
        Ok(job)
    }

    /// Read and parse a job definition file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, IndexingError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            IndexingError::config(format!("cannot read job file {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<(), IndexingError> {
        if self.name.trim().is_empty() {
            return Err(IndexingError::config("job name must not be empty"));
        }
        if self.skip_indexing && self.ledger_path.is_none() {
            return Err(IndexingError::config(
                "skip_indexing needs a ledger_path to read committed entity ids from",
            ));
        }
        Ok(())
    }
}
