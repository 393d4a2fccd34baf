//! In-memory entity store.
//!
//! This module provides a concrete implementation of `EntityStore` keeping all
//! records in an insertion ordered map behind an async `RwLock`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::errors::StoreError;
use crate::interfaces::EntityStore;
use entity_indexer_shared::{ComponentConfig, ComponentError, EntityRecord, IndexingComponent};

/// Parameter naming the JSON lines file written on finalise.
pub const PARAM_EXPORT: &str = "export";

/// In-memory entity store.
///
/// Cloning is cheap and every clone sees the same records, so a caller can
/// keep a handle for inspection while the destination owns another.
///
/// # Example
///
/// ```ignore
/// let store = InMemoryStore::new();
/// let destination = IndexingDestination::new(Box::new(store.clone()));
/// // ... run the indexer ...
/// assert_eq!(store.len().await, 42);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryStore {
    records: Arc<RwLock<IndexMap<String, EntityRecord>>>,
    export_path: Option<PathBuf>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that writes all records as JSON lines to `path` on finalise.
    pub fn with_export(path: impl Into<PathBuf>) -> Self {
        Self {
            records: Arc::default(),
            export_path: Some(path.into()),
        }
    }

    /// The configured export path.
    pub fn export_path(&self) -> Option<&Path> {
        self.export_path.as_deref()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// True if nothing has been stored.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// IDs of all stored records in insertion order.
    pub async fn ids(&self) -> Vec<String> {
        self.records.read().await.keys().cloned().collect()
    }

    /// Copy of all stored records in insertion order.
    pub async fn records(&self) -> Vec<EntityRecord> {
        self.records.read().await.values().cloned().collect()
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn export(&self, path: &Path) -> Result<usize, StoreError> {
        let records = self.records.read().await;
        let mut buffer = Vec::with_capacity(records.len() * 128);
        for record in records.values() {
            serde_json::to_writer(&mut buffer, record)?;
            buffer.push(b'\n');
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(path).await?;
        file.write_all(&buffer).await?;
        file.flush().await?;
        Ok(records.len())
    }
}

#[async_trait]
impl IndexingComponent for InMemoryStore {
    fn name(&self) -> &str {
        "InMemoryStore"
    }

    fn configure(&mut self, config: &ComponentConfig) -> Result<(), ComponentError> {
        if let Some(path) = config.get_str(PARAM_EXPORT) {
            if path.trim().is_empty() {
                return Err(ComponentError::invalid(PARAM_EXPORT, "path must not be empty"));
            }
            self.export_path = Some(PathBuf::from(path.trim()));
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn store_batch(&self, records: &[EntityRecord]) -> Result<(), StoreError> {
        let mut stored = self.records.write().await;
        for record in records {
            stored.insert(record.id().to_string(), record.clone());
        }
        debug!(count = records.len(), total = stored.len(), "Stored batch");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<EntityRecord>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn update(&self, record: &EntityRecord) -> Result<(), StoreError> {
        let mut stored = self.records.write().await;
        match stored.get_mut(record.id()) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(StoreError::not_found(record.id())),
        }
    }

    async fn finalise(&mut self) -> Result<(), StoreError> {
        if let Some(path) = self.export_path.clone() {
            let count = self.export(&path).await?;
            info!(path = %path.display(), count = count, "Exported entities");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entity_indexer_shared::FieldValue;

    fn record(id: &str, label: &str) -> EntityRecord {
        EntityRecord::new(id).with_value("label", label)
    }

    #[tokio::test]
    async fn test_store_and_get() {
        let store = InMemoryStore::new();
        store
            .store_batch(&[record("urn:a", "A"), record("urn:b", "B")])
            .await
            .unwrap();

        assert_eq!(store.len().await, 2);
        assert_eq!(store.ids().await, vec!["urn:a", "urn:b"]);
        let a = store.get("urn:a").await.unwrap().unwrap();
        assert_eq!(a.first("label"), Some(&FieldValue::from("A")));
        assert!(store.get("urn:c").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clones_share_records() {
        let store = InMemoryStore::new();
        let handle = store.clone();
        store.store_batch(&[record("urn:a", "A")]).await.unwrap();
        assert_eq!(handle.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_requires_existing_record() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.update(&record("urn:a", "A")).await,
            Err(StoreError::NotFound(_))
        ));

        store.store_batch(&[record("urn:a", "A")]).await.unwrap();
        store.update(&record("urn:a", "A2")).await.unwrap();
        let a = store.get("urn:a").await.unwrap().unwrap();
        assert_eq!(a.first("label"), Some(&FieldValue::from("A2")));
    }

    #[tokio::test]
    async fn test_finalise_exports_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("entities.jsonl");
        let mut store = InMemoryStore::new();
        store
            .configure(&ComponentConfig::new().with(PARAM_EXPORT, path.display()))
            .unwrap();

        store
            .store_batch(&[record("urn:a", "A"), record("urn:b", "B")])
            .await
            .unwrap();
        store.finalise().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<EntityRecord> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(parsed, vec![record("urn:a", "A"), record("urn:b", "B")]);
    }
}
