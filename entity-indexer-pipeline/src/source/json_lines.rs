//! Sources reading one JSON encoded record per line.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs::File;
use tracing::{info, warn};

use super::lines::LineReader;
use super::{EntityDataIterator, EntityDataProvider};
use crate::errors::SourceError;
use entity_indexer_shared::{ComponentConfig, ComponentError, EntityRecord, IndexingComponent};

pub const PARAM_SOURCE: &str = "source";

/// Reads [`EntityRecord`]s serialised as JSON lines.
///
/// Blank lines are ignored. A line that is not valid UTF-8 or does not
/// deserialise is reported as a recoverable parse error so the indexer skips
/// just that entry.
pub struct JsonLinesEntityDataIterator {
    path: PathBuf,
    lines: Option<LineReader>,
    line_number: usize,
}

impl JsonLinesEntityDataIterator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lines: None,
            line_number: 0,
        }
    }
}

#[async_trait]
impl IndexingComponent for JsonLinesEntityDataIterator {
    fn name(&self) -> &str {
        "JsonLinesEntityDataIterator"
    }

    fn configure(&mut self, config: &ComponentConfig) -> Result<(), ComponentError> {
        self.path = PathBuf::from(config.require_str(PARAM_SOURCE)?.trim());
        Ok(())
    }

    fn needs_initialisation(&self) -> bool {
        true
    }

    async fn initialise(&mut self) -> Result<(), ComponentError> {
        let file = File::open(&self.path).await.map_err(|e| {
            ComponentError::initialisation(format!(
                "cannot open entity file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        info!(path = %self.path.display(), "Opened entity data file");
        self.lines = Some(LineReader::new(file));
        self.line_number = 0;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ComponentError> {
        self.lines = None;
        Ok(())
    }
}

#[async_trait]
impl EntityDataIterator for JsonLinesEntityDataIterator {
    async fn next_entity(&mut self) -> Result<Option<EntityRecord>, SourceError> {
        loop {
            let Some(lines) = self.lines.as_mut() else {
                return Err(ComponentError::NotInitialised(self.name().to_string()).into());
            };
            let Some(line) = lines.next_line().await? else {
                return Ok(None);
            };
            self.line_number = lines.line_number();
            let line = line.map_err(|e| {
                SourceError::parse(format!(
                    "{} line {}: {}",
                    self.path.display(),
                    self.line_number,
                    e
                ))
            })?;
            if line.trim().is_empty() {
                continue;
            }
            return serde_json::from_str::<EntityRecord>(&line)
                .map(Some)
                .map_err(|e| {
                    SourceError::parse(format!(
                        "{} line {}: {}",
                        self.path.display(),
                        self.line_number,
                        e
                    ))
                });
        }
    }
}

/// Looks records up in a JSON lines file loaded into memory on initialisation.
///
/// Unreadable lines are logged and left out. When an ID occurs twice the last
/// record wins.
pub struct JsonLinesEntityDataProvider {
    path: PathBuf,
    records: Option<HashMap<String, EntityRecord>>,
}

impl JsonLinesEntityDataProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: None,
        }
    }

    /// Number of loaded records.
    pub fn len(&self) -> usize {
        self.records.as_ref().map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl IndexingComponent for JsonLinesEntityDataProvider {
    fn name(&self) -> &str {
        "JsonLinesEntityDataProvider"
    }

    fn configure(&mut self, config: &ComponentConfig) -> Result<(), ComponentError> {
        self.path = PathBuf::from(config.require_str(PARAM_SOURCE)?.trim());
        Ok(())
    }

    fn needs_initialisation(&self) -> bool {
        self.records.is_none()
    }

    async fn initialise(&mut self) -> Result<(), ComponentError> {
        let file = File::open(&self.path).await.map_err(|e| {
            ComponentError::initialisation(format!(
                "cannot open entity file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        let mut lines = LineReader::new(file);
        let mut records = HashMap::new();
        while let Some(line) = lines.next_line().await? {
            let line_number = lines.line_number();
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        line = line_number,
                        error = %e,
                        "Skipping undecodable line"
                    );
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<EntityRecord>(&line) {
                Ok(record) => {
                    records.insert(record.id().to_string(), record);
                }
                Err(e) => warn!(
                    path = %self.path.display(),
                    line = line_number,
                    error = %e,
                    "Skipping unreadable entity record"
                ),
            }
        }
        info!(path = %self.path.display(), count = records.len(), "Loaded entity data");
        self.records = Some(records);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ComponentError> {
        self.records = None;
        Ok(())
    }
}

#[async_trait]
impl EntityDataProvider for JsonLinesEntityDataProvider {
    async fn entity_data(&self, id: &str) -> Result<Option<EntityRecord>, SourceError> {
        match &self.records {
            Some(records) => Ok(records.get(id).cloned()),
            None => Err(ComponentError::NotInitialised(self.name().to_string()).into()),
        }
    }
}
