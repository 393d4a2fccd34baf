use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use entity_indexer_pipeline::processor::{EntityProcessor, ProcessorChain, ValueConverterProcessor, ValueKind};
use entity_indexer_pipeline::source::{
    EntitySource, LineBasedEntityIterator, MapEntityDataProvider, SourceComponents,
    VecEntityDataIterator, VecEntityIterator,
};
use entity_indexer_pipeline::{
    Indexer, IndexerConfig, IndexingState, PipelineError, ProcessorError,
};
use entity_indexer_repository::{
    DestinationConfig, EntityStore, IndexingDestination, InMemoryStore, StoreError,
};
use entity_indexer_shared::{ComponentError, EntityRecord, FieldValue, IndexingComponent, SCORE_FIELD};

fn record(id: &str) -> EntityRecord {
    EntityRecord::new(id).with_value("label", format!("Entity {}", id))
}

fn id_source(scores: &[(&str, Option<f64>)]) -> EntitySource {
    let iterator: VecEntityIterator = scores
        .iter()
        .map(|(id, score)| (id.to_string(), *score))
        .collect();
    let data = MapEntityDataProvider::new(scores.iter().map(|(id, _)| record(id)));
    EntitySource::id_iterating(Box::new(iterator), Box::new(data))
}

fn memory_indexer(source: EntitySource, config: IndexerConfig) -> (Indexer, InMemoryStore) {
    let store = InMemoryStore::new();
    let destination = IndexingDestination::new(Box::new(store.clone()));
    (Indexer::with_config("test", source, destination, config), store)
}

fn sorted(ids: impl IntoIterator<Item = impl Into<String>>) -> Vec<String> {
    let mut ids: Vec<String> = ids.into_iter().map(Into::into).collect();
    ids.sort();
    ids
}

const MIXED: &[(&str, Option<f64>)] = &[
    ("urn:a", Some(4.0)),
    ("urn:b", Some(-1.0)),
    ("urn:c", None),
    ("urn:d", Some(0.0)),
    ("urn:e", Some(-0.5)),
    ("urn:f", Some(12.0)),
];

/// Records the IDs it sees and tags every record.
struct RecordingProcessor {
    seen: Arc<Mutex<Vec<String>>>,
}

impl IndexingComponent for RecordingProcessor {}

impl EntityProcessor for RecordingProcessor {
    fn process(&self, mut record: EntityRecord) -> Result<EntityRecord, ProcessorError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(record.id().to_string());
        }
        record.set("post-processed", true);
        Ok(record)
    }
}

/// Store failing the n-th batch (or its finalise hook) and counting `close` calls.
#[derive(Clone, Default)]
struct FailingStore {
    inner: InMemoryStore,
    batches: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    fail_on_batch: usize,
    fail_finalise: bool,
}

#[async_trait]
impl IndexingComponent for FailingStore {
    async fn close(&mut self) -> Result<(), ComponentError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl EntityStore for FailingStore {
    async fn store_batch(&self, records: &[EntityRecord]) -> Result<(), StoreError> {
        let batch = self.batches.fetch_add(1, Ordering::SeqCst) + 1;
        if batch == self.fail_on_batch {
            return Err(StoreError::commit("disk full"));
        }
        self.inner.store_batch(records).await
    }

    async fn get(&self, id: &str) -> Result<Option<EntityRecord>, StoreError> {
        self.inner.get(id).await
    }

    async fn update(&self, record: &EntityRecord) -> Result<(), StoreError> {
        self.inner.update(record).await
    }

    async fn finalise(&mut self) -> Result<(), StoreError> {
        if self.fail_finalise {
            return Err(StoreError::finalise("registry unavailable"));
        }
        Ok(())
    }
}

#[tokio::test]
async fn negative_scores_are_not_indexed() {
    let (mut indexer, store) = memory_indexer(id_source(MIXED), IndexerConfig::default().with_chunk_size(4));
    indexer.initialise_indexing().await.unwrap();
    indexer.index_entities().await.unwrap();

    let expected = sorted(["urn:a", "urn:c", "urn:d", "urn:f"]);
    assert_eq!(sorted(store.ids().await), expected);
    assert_eq!(sorted(indexer.ledger().ids()), expected);
    assert_eq!(indexer.ledger().len(), MIXED.len() - 2);

    let stats = indexer.stats();
    assert_eq!(stats.entities_read, 6);
    assert_eq!(stats.entities_indexed, 4);
    assert_eq!(stats.entities_skipped, 2);
    assert_eq!(stats.chunks_committed, 1);
}

#[tokio::test]
async fn index_all_entities_includes_negative_scores() {
    let (mut indexer, store) = memory_indexer(id_source(MIXED), IndexerConfig::default());
    assert!(!indexer.is_index_all_entities_state());
    indexer.set_index_all_entities_state(true);
    assert!(indexer.is_index_all_entities_state());

    indexer.initialise_indexing().await.unwrap();
    indexer.index_entities().await.unwrap();

    assert_eq!(store.len().await, MIXED.len());
    assert_eq!(indexer.ledger().len(), MIXED.len());
    let b = store.get("urn:b").await.unwrap().unwrap();
    assert_eq!(b.score(), Some(-1.0));
}

#[tokio::test]
async fn second_index_entities_is_a_no_op() {
    let (mut indexer, store) = memory_indexer(id_source(MIXED), IndexerConfig::default());
    indexer.initialise_indexing().await.unwrap();
    indexer.index_entities().await.unwrap();
    let stats = indexer.stats();

    indexer.index_entities().await.unwrap();
    assert_eq!(indexer.state(), IndexingState::Indexed);
    assert_eq!(indexer.stats(), stats);
    assert_eq!(store.len().await, 4);
}

#[tokio::test]
async fn post_processing_visits_exactly_the_ledger() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (indexer, store) = memory_indexer(id_source(MIXED), IndexerConfig::default().with_chunk_size(3));
    let mut indexer = indexer.with_post_processors(
        ProcessorChain::empty().with(RecordingProcessor { seen: seen.clone() }),
    );

    indexer.index().await.unwrap();

    let visited = sorted(seen.lock().unwrap().clone());
    assert_eq!(visited, sorted(indexer.ledger().ids()));
    assert_eq!(indexer.stats().entities_post_processed, visited.len() as u64);
    for record in store.records().await {
        assert_eq!(record.first("post-processed"), Some(&FieldValue::Boolean(true)));
    }
    assert_eq!(indexer.state(), IndexingState::Finished);
}

#[tokio::test]
async fn failed_commit_is_fatal_and_keeps_the_ledger_consistent() {
    let store = FailingStore {
        fail_on_batch: 2,
        ..FailingStore::default()
    };
    let destination = IndexingDestination::new(Box::new(store.clone()));
    let scores: Vec<(String, Option<f64>)> =
        (0..5).map(|i| (format!("urn:{}", i), Some(i as f64))).collect();
    let iterator: VecEntityIterator = scores.clone().into_iter().collect();
    let data = MapEntityDataProvider::new(scores.iter().map(|(id, _)| record(id)));
    let source = EntitySource::id_iterating(Box::new(iterator), Box::new(data));
    let mut indexer = Indexer::with_config(
        "failing",
        source,
        destination,
        IndexerConfig::default().with_chunk_size(2),
    );

    indexer.initialise_indexing().await.unwrap();
    let err = indexer.index_entities().await.unwrap_err();
    assert!(matches!(err, PipelineError::StoreError(StoreError::CommitError(_))));
    assert_eq!(indexer.state(), IndexingState::Indexing);
    assert_eq!(sorted(indexer.ledger().ids()), sorted(["urn:0", "urn:1"]));
    assert_eq!(store.inner.len().await, 2);

    // the aborted run cannot be resumed
    assert!(matches!(
        indexer.index_entities().await,
        Err(PipelineError::IllegalState { .. })
    ));

    indexer.close().await;
    indexer.close().await;
    assert_eq!(store.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn per_entity_failures_are_skipped() {
    let iterator: VecEntityIterator = vec![
        ("urn:a".to_string(), Some(1.0)),
        ("urn:missing".to_string(), Some(1.0)),
        ("urn:bad".to_string(), Some(1.0)),
    ]
    .into_iter()
    .collect();
    let data = MapEntityDataProvider::new(vec![
        record("urn:a").with_value("population", "12"),
        record("urn:bad").with_value("population", "twelve"),
    ]);
    let source = EntitySource::id_iterating(Box::new(iterator), Box::new(data));
    let (indexer, store) = memory_indexer(source, IndexerConfig::default());
    let mut indexer = indexer.with_processors(
        ProcessorChain::empty().with(
            ValueConverterProcessor::new()
                .with_field("population", ValueKind::Integer)
                .strict(),
        ),
    );

    indexer.initialise_indexing().await.unwrap();
    indexer.index_entities().await.unwrap();

    assert_eq!(store.ids().await, vec!["urn:a"]);
    let a = store.get("urn:a").await.unwrap().unwrap();
    assert_eq!(a.get("population"), &[FieldValue::Integer(12)]);
    assert_eq!(indexer.stats().entities_failed, 2);
}

#[tokio::test]
async fn adapter_treats_unknown_ids_as_unranked() {
    let components = SourceComponents::new()
        .with_data_iterator(Box::new(VecEntityDataIterator::new(vec![
            record("urn:a"),
            record("urn:b"),
            record("urn:c"),
        ])))
        .with_entity_iterator(Box::new(VecEntityIterator::new(vec![
            entity_indexer_shared::EntityScore::new("urn:a", Some(2.0)),
            entity_indexer_shared::EntityScore::new("urn:b", Some(-3.0)),
        ])));
    let source = EntitySource::resolve(components).unwrap();
    let (mut indexer, store) = memory_indexer(source, IndexerConfig::default());

    indexer.index().await.unwrap();

    assert_eq!(store.ids().await, vec!["urn:a", "urn:c"]);
    let c = store.get("urn:c").await.unwrap().unwrap();
    assert!(!c.contains(SCORE_FIELD));
}

#[tokio::test]
async fn skipped_indexing_resumes_from_the_ledger_file() {
    let dir = tempfile::tempdir().unwrap();
    let ledger_path = dir.path().join("indexed-entity-ids.txt");
    let store = InMemoryStore::new();

    let mut first = Indexer::with_config(
        "first",
        id_source(MIXED),
        IndexingDestination::new(Box::new(store.clone())),
        IndexerConfig::default().with_ledger_path(&ledger_path),
    );
    first.initialise_indexing().await.unwrap();
    first.index_entities().await.unwrap();
    first.close().await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut second = Indexer::with_config(
        "second",
        id_source(&[]),
        IndexingDestination::new(Box::new(store.clone())),
        IndexerConfig::default().with_ledger_path(&ledger_path),
    )
    .with_post_processors(ProcessorChain::empty().with(RecordingProcessor { seen: seen.clone() }));

    second.initialise_indexing().await.unwrap();
    second.skip_index_entities().await.unwrap();
    assert_eq!(second.state(), IndexingState::Indexed);
    second.post_process_entities().await.unwrap();
    second.finalise_indexing().await.unwrap();

    assert_eq!(
        sorted(seen.lock().unwrap().clone()),
        sorted(["urn:a", "urn:c", "urn:d", "urn:f"])
    );
}

#[tokio::test]
async fn operations_respect_the_state_order() {
    let (mut indexer, _) = memory_indexer(id_source(MIXED), IndexerConfig::default());

    assert!(matches!(
        indexer.finalise_indexing().await,
        Err(PipelineError::IllegalState { operation: "finalise_indexing", .. })
    ));
    assert!(matches!(
        indexer.post_process_entities().await,
        Err(PipelineError::IllegalState { .. })
    ));

    indexer.initialise_indexing().await.unwrap();
    indexer.initialise_indexing().await.unwrap();
    assert_eq!(indexer.state(), IndexingState::Initialised);

    indexer.index_entities().await.unwrap();
    indexer.skip_index_entities().await.unwrap();
    indexer.skip_post_process_entities().await.unwrap();
    assert_eq!(indexer.state(), IndexingState::PostProcessed);
    indexer.post_process_entities().await.unwrap();
    assert_eq!(indexer.stats().entities_post_processed, 0);

    indexer.finalise_indexing().await.unwrap();
    indexer.finalise_indexing().await.unwrap();
    assert_eq!(indexer.state(), IndexingState::Finished);
    assert!(indexer.destination().is_finalised());
}

#[tokio::test]
async fn failed_initialisation_stays_initialising() {
    let dir = tempfile::tempdir().unwrap();
    let components = SourceComponents::new()
        .with_entity_iterator(Box::new(LineBasedEntityIterator::new(dir.path().join("absent.tsv"))))
        .with_data_provider(Box::new(MapEntityDataProvider::default()));
    let source = EntitySource::resolve(components).unwrap();
    let (mut indexer, _) = memory_indexer(source, IndexerConfig::default());

    assert!(matches!(
        indexer.initialise_indexing().await,
        Err(PipelineError::ComponentError { .. })
    ));
    assert_eq!(indexer.state(), IndexingState::Initialising);
    assert!(indexer.index_entities().await.is_err());
    indexer.close().await;
}

#[tokio::test]
async fn chunk_size_defaults_and_limits() {
    let (mut indexer, _) = memory_indexer(id_source(MIXED), IndexerConfig::default());
    for requested in [0, -1, -10_000] {
        indexer.set_chunk_size(requested).unwrap();
        assert_eq!(indexer.chunk_size(), 10);
    }
    indexer.set_chunk_size(1_000_000).unwrap();
    assert_eq!(indexer.chunk_size(), 1_000_000);

    let mut limited = Indexer::new(
        "limited",
        id_source(MIXED),
        IndexingDestination::with_config(
            Box::new(InMemoryStore::new()),
            DestinationConfig::with_max_batch_size(100),
        ),
    );
    assert!(matches!(
        limited.set_chunk_size(101),
        Err(PipelineError::ConfigurationError(_))
    ));
    assert_eq!(limited.chunk_size(), 10);
}

#[tokio::test]
async fn ids_with_line_breaks_are_skipped_before_commit() {
    let dir = tempfile::tempdir().unwrap();
    let ledger_path = dir.path().join("indexed-entity-ids.txt");
    let source = id_source(&[
        ("urn:a", Some(1.0)),
        ("urn:b\nurn:x", Some(1.0)),
        ("urn:c\r", Some(1.0)),
        ("urn:d", Some(1.0)),
    ]);
    let (mut indexer, store) = memory_indexer(
        source,
        IndexerConfig::default()
            .with_chunk_size(2)
            .with_ledger_path(&ledger_path),
    );

    indexer.initialise_indexing().await.unwrap();
    indexer.index_entities().await.unwrap();
    assert_eq!(indexer.state(), IndexingState::Indexed);

    let expected = sorted(["urn:a", "urn:d"]);
    assert_eq!(sorted(store.ids().await), expected);
    assert_eq!(sorted(indexer.ledger().ids()), expected);
    assert_eq!(indexer.stats().entities_failed, 2);
    assert_eq!(indexer.stats().entities_indexed, 2);

    indexer.finalise_indexing().await.unwrap();
    let stored = std::fs::read_to_string(&ledger_path).unwrap();
    assert_eq!(sorted(stored.lines()), expected);
}

#[tokio::test]
async fn undecodable_score_line_skips_one_entity() {
    let dir = tempfile::tempdir().unwrap();
    let scores = dir.path().join("scores.tsv");
    std::fs::write(&scores, b"urn:a\t1\nurn:\xff\t2\nurn:c\t3\n").unwrap();
    let data = MapEntityDataProvider::new(vec![record("urn:a"), record("urn:c")]);
    let source = EntitySource::id_iterating(
        Box::new(LineBasedEntityIterator::new(&scores)),
        Box::new(data),
    );
    let (mut indexer, store) = memory_indexer(source, IndexerConfig::default());

    indexer.initialise_indexing().await.unwrap();
    indexer.index_entities().await.unwrap();

    assert_eq!(indexer.state(), IndexingState::Indexed);
    assert_eq!(store.ids().await, vec!["urn:a", "urn:c"]);
    assert_eq!(indexer.stats().entities_failed, 1);
    assert_eq!(indexer.stats().entities_indexed, 2);
}

#[tokio::test]
async fn duplicate_source_ids_are_recorded_once() {
    let source = id_source(&[
        ("urn:a", Some(1.0)),
        ("urn:b", Some(2.0)),
        ("urn:a", Some(3.0)),
    ]);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (indexer, _store) = memory_indexer(source, IndexerConfig::default().with_chunk_size(2));
    let mut indexer = indexer
        .with_post_processors(ProcessorChain::empty().with(RecordingProcessor { seen: seen.clone() }));

    indexer.index().await.unwrap();

    assert_eq!(indexer.ledger().len(), 2);
    assert_eq!(sorted(indexer.ledger().ids()), sorted(["urn:a", "urn:b"]));
    assert_eq!(sorted(seen.lock().unwrap().clone()), sorted(["urn:a", "urn:b"]));
}

#[tokio::test]
async fn failed_finalise_cannot_be_retried() {
    let store = FailingStore {
        fail_finalise: true,
        ..FailingStore::default()
    };
    let mut indexer = Indexer::new(
        "finalise",
        id_source(MIXED),
        IndexingDestination::new(Box::new(store.clone())),
    );

    indexer.initialise_indexing().await.unwrap();
    indexer.index_entities().await.unwrap();
    assert!(matches!(
        indexer.finalise_indexing().await,
        Err(PipelineError::StoreError(StoreError::FinaliseError(_)))
    ));
    assert_eq!(indexer.state(), IndexingState::Finalising);
    assert_eq!(store.closes.load(Ordering::SeqCst), 1);

    assert!(matches!(
        indexer.finalise_indexing().await,
        Err(PipelineError::IllegalState { .. })
    ));
    assert!(matches!(
        indexer.index().await,
        Err(PipelineError::IllegalState { .. })
    ));
    assert_eq!(indexer.state(), IndexingState::Finalising);
}
