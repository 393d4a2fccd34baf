//! Entity iterator reading `id<separator>score` lines from a file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tracing::{debug, info, warn};

use super::lines::LineReader;
use super::EntityIterator;
use crate::errors::SourceError;
use entity_indexer_shared::{ComponentConfig, ComponentError, EntityScore, IndexingComponent};

pub const PARAM_SOURCE: &str = "source";
pub const PARAM_SEPARATOR: &str = "separator";
pub const PARAM_ID_POS: &str = "id-pos";
pub const PARAM_SCORE_POS: &str = "score-pos";
pub const PARAM_ID_NAMESPACE: &str = "id-namespace";
pub const PARAM_TRIM_LINE: &str = "trimLine";
pub const PARAM_TRIM_ID: &str = "trimEntity";

pub const DEFAULT_SOURCE: &str = "entityScores.tsv";
pub const DEFAULT_SEPARATOR: &str = "\t";
pub const DEFAULT_ID_POS: usize = 1;
pub const DEFAULT_SCORE_POS: usize = 2;

/// Reads entity scores from a delimited text file.
///
/// Every line is split on the separator; the ID and the score are taken from
/// 1-based column positions. Lines without an ID column are skipped, a
/// missing or unparsable score yields an unranked entity. A line that is not
/// valid UTF-8 is reported as a recoverable parse error.
pub struct LineBasedEntityIterator {
    path: PathBuf,
    separator: String,
    id_pos: usize,
    score_pos: usize,
    namespace: Option<String>,
    trim_line: bool,
    trim_id: bool,
    lines: Option<LineReader>,
    line_number: usize,
}

impl LineBasedEntityIterator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            separator: DEFAULT_SEPARATOR.to_string(),
            id_pos: DEFAULT_ID_POS,
            score_pos: DEFAULT_SCORE_POS,
            namespace: None,
            trim_line: false,
            trim_id: true,
            lines: None,
            line_number: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Set the 1-based column positions of the ID and the score.
    pub fn with_positions(mut self, id_pos: usize, score_pos: usize) -> Self {
        self.id_pos = id_pos;
        self.score_pos = score_pos;
        self
    }

    fn validate(&self) -> Result<(), ComponentError> {
        if self.id_pos == 0 {
            return Err(ComponentError::invalid(PARAM_ID_POS, "positions start at 1"));
        }
        if self.score_pos == 0 {
            return Err(ComponentError::invalid(PARAM_SCORE_POS, "positions start at 1"));
        }
        if self.id_pos == self.score_pos {
            return Err(ComponentError::invalid(
                PARAM_SCORE_POS,
                format!("id and score must not share column {}", self.id_pos),
            ));
        }
        if self.separator.is_empty() {
            return Err(ComponentError::invalid(PARAM_SEPARATOR, "must not be empty"));
        }
        Ok(())
    }

    fn parse_line(&self, line: &str) -> Option<EntityScore> {
        let line = if self.trim_line { line.trim() } else { line };
        if line.is_empty() {
            return None;
        }
        let parts: Vec<&str> = line.split(self.separator.as_str()).collect();
        let raw_id = parts.get(self.id_pos - 1)?;
        let raw_id = if self.trim_id { raw_id.trim() } else { raw_id };
        if raw_id.is_empty() {
            return None;
        }
        let id = match &self.namespace {
            Some(ns) => format!("{}{}", ns, raw_id),
            None => raw_id.to_string(),
        };

        let score = match parts.get(self.score_pos - 1) {
            Some(value) => match value.trim().parse::<f64>() {
                Ok(score) if score.is_finite() => Some(score),
                _ => {
                    warn!(
                        entity_id = %id,
                        value = %value,
                        line = self.line_number,
                        "Unparsable score, entity is unranked"
                    );
                    None
                }
            },
            None => {
                debug!(entity_id = %id, line = self.line_number, "No score column");
                None
            }
        };
        Some(EntityScore::new(id, score))
    }
}

#[async_trait]
impl IndexingComponent for LineBasedEntityIterator {
    fn name(&self) -> &str {
        "LineBasedEntityIterator"
    }

    fn configure(&mut self, config: &ComponentConfig) -> Result<(), ComponentError> {
        if config.contains(PARAM_SOURCE) {
            self.path = PathBuf::from(config.require_str(PARAM_SOURCE)?.trim());
        }
        if let Some(separator) = config.get_str(PARAM_SEPARATOR).filter(|s| !s.is_empty()) {
            // "\t" is written escaped in configuration strings
            self.separator = separator.replace("\\t", "\t");
        }
        if let Some(pos) = config.get_usize(PARAM_ID_POS)? {
            self.id_pos = pos;
        }
        if let Some(pos) = config.get_usize(PARAM_SCORE_POS)? {
            self.score_pos = pos;
        }
        if let Some(ns) = config.get_str(PARAM_ID_NAMESPACE) {
            self.namespace = Some(ns.to_string());
        }
        if let Some(trim) = config.get_bool(PARAM_TRIM_LINE)? {
            self.trim_line = trim;
        }
        if let Some(trim) = config.get_bool(PARAM_TRIM_ID)? {
            self.trim_id = trim;
        }
        self.validate()
    }

    fn needs_initialisation(&self) -> bool {
        true
    }

    async fn initialise(&mut self) -> Result<(), ComponentError> {
        self.validate()?;
        let file = File::open(&self.path).await.map_err(|e| {
            ComponentError::initialisation(format!(
                "cannot open score file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        info!(path = %self.path.display(), "Opened entity score file");
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
impl EntityIterator for LineBasedEntityIterator {
    async fn next_score(&mut self) -> Result<Option<EntityScore>, SourceError> {
        loop {
            let Some(lines) = self.lines.as_mut() else {
                return Err(ComponentError::NotInitialised(self.name().to_string()).into());
            };
            let line = lines.next_line().await.map_err(|e| {
                SourceError::read(format!(
                    "{} line {}: {}",
                    self.path.display(),
                    self.line_number + 1,
                    e
                ))
            })?;
            let Some(line) = line else {
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
            if let Some(entry) = self.parse_line(&line) {
                return Ok(Some(entry));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn score_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    async fn drain(iterator: &mut LineBasedEntityIterator) -> Vec<EntityScore> {
        let mut entries = Vec::new();
        while let Some(entry) = iterator.next_score().await.unwrap() {
            entries.push(entry);
        }
        entries
    }

    #[tokio::test]
    async fn test_reads_tab_separated_lines() {
        let file = score_file("urn:a\t10\n\nurn:b\tnot-a-number\nurn:c\n urn:d \t2.5\n");
        let mut iterator = LineBasedEntityIterator::new(file.path());
        iterator.initialise().await.unwrap();

        assert_eq!(
            drain(&mut iterator).await,
            vec![
                EntityScore::new("urn:a", Some(10.0)),
                EntityScore::new("urn:b", None),
                EntityScore::new("urn:c", None),
                EntityScore::new("urn:d", Some(2.5)),
            ]
        );
    }

    #[tokio::test]
    async fn test_configured_columns_and_namespace() {
        let file = score_file("42;b;x\n7;c;y\n");
        let mut iterator = LineBasedEntityIterator::new("unused");
        let config = ComponentConfig::new()
            .with(PARAM_SOURCE, file.path().display())
            .with(PARAM_SEPARATOR, ";")
            .with(PARAM_ID_POS, 2)
            .with(PARAM_SCORE_POS, 1)
            .with(PARAM_ID_NAMESPACE, "http://example.org/");
        iterator.configure(&config).unwrap();
        iterator.initialise().await.unwrap();

        assert_eq!(
            drain(&mut iterator).await,
            vec![
                EntityScore::new("http://example.org/b", Some(42.0)),
                EntityScore::new("http://example.org/c", Some(7.0)),
            ]
        );
    }

    #[test]
    fn test_rejects_shared_column() {
        let mut iterator = LineBasedEntityIterator::new("scores.tsv");
        let config = ComponentConfig::new()
            .with(PARAM_ID_POS, 2)
            .with(PARAM_SCORE_POS, 2);
        assert!(matches!(
            iterator.configure(&config),
            Err(ComponentError::InvalidParameter { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_file_fails_initialisation() {
        let dir = tempfile::tempdir().unwrap();
        let mut iterator = LineBasedEntityIterator::new(dir.path().join("absent.tsv"));
        assert!(iterator.initialise().await.is_err());
    }

    #[tokio::test]
    async fn test_undecodable_line_is_skipped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"urn:a\t1\nurn:\xff\t2\nurn:c\t3\n").unwrap();
        file.flush().unwrap();
        let mut iterator = LineBasedEntityIterator::new(file.path());
        iterator.initialise().await.unwrap();

        assert_eq!(
            iterator.next_score().await.unwrap(),
            Some(EntityScore::new("urn:a", Some(1.0)))
        );
        let err = iterator.next_score().await.unwrap_err();
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("line 2"));
        assert_eq!(
            iterator.next_score().await.unwrap(),
            Some(EntityScore::new("urn:c", Some(3.0)))
        );
        assert!(iterator.next_score().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_next_before_initialise() {
        let mut iterator = LineBasedEntityIterator::new("scores.tsv");
        assert!(matches!(
            iterator.next_score().await,
            Err(SourceError::ComponentError(ComponentError::NotInitialised(_)))
        ));
    }
}
