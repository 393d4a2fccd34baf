//! Orchestrator for the entity indexer pipeline.
//!
//! The [`Indexer`] drives one indexing job through its states:
//!
//! ```text
//! UNINITIALISED -> INITIALISING -> INITIALISED -> INDEXING -> INDEXED
//!   -> POSTPROCESSING -> POSTPROCESSED -> FINALISING -> FINISHED
//! ```
//!
//! Every phase runs to completion on the caller's task. Phases that already
//! happened are no-ops, so [`Indexer::index`] can resume a partially run job.

mod chunk;
mod state;
mod stats;

use std::fmt::Display;
use std::path::PathBuf;
use std::time::Instant;

use tokio::sync::watch;
use tracing::{debug, error, info, instrument, trace, warn};
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::lifecycle::{close_component, initialise_component};
use crate::normaliser::NormaliserChain;
use crate::processor::ProcessorChain;
use crate::source::{
    EntityDataIterator, EntityDataProvider, EntityIterator, EntityScoreProvider, EntitySource,
    SourceMode,
};
use chunk::ChunkWriter;
use entity_indexer_repository::{EntityIdLedger, IndexingDestination, StoreError};
use entity_indexer_shared::{EntityRecord, SCORE_FIELD};

pub use state::IndexingState;
pub use stats::IndexingStats;

/// Chunk size used when none (or a value <= 0) is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Progress is logged every this many entities.
pub const PROGRESS_INTERVAL: u64 = 100_000;

/// Coerce a requested chunk size into the effective one.
pub fn effective_chunk_size(requested: i64) -> usize {
    if requested <= 0 {
        DEFAULT_CHUNK_SIZE
    } else {
        usize::try_from(requested).unwrap_or(usize::MAX)
    }
}

/// Configuration for the indexer.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Number of entities committed to the destination as one batch.
    pub chunk_size: usize,
    /// Index entities with a negative score instead of skipping them.
    pub index_all_entities: bool,
    /// File backing the ledger of committed IDs; in memory when unset.
    pub ledger_path: Option<PathBuf>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            index_all_entities: false,
            ledger_path: None,
        }
    }
}

impl IndexerConfig {
    pub fn with_chunk_size(mut self, chunk_size: i64) -> Self {
        self.chunk_size = effective_chunk_size(chunk_size);
        self
    }

    pub fn with_index_all_entities(mut self, index_all: bool) -> Self {
        self.index_all_entities = index_all;
        self
    }

    pub fn with_ledger_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ledger_path = Some(path.into());
        self
    }
}

/// Drives one indexing job from source to destination.
pub struct Indexer {
    name: String,
    run_id: Uuid,
    state: IndexingState,
    state_tx: watch::Sender<IndexingState>,
    chunk_size: usize,
    index_all_entities: bool,
    source: EntitySource,
    normaliser: NormaliserChain,
    processors: ProcessorChain,
    post_processors: ProcessorChain,
    destination: IndexingDestination,
    ledger: EntityIdLedger,
    stats: IndexingStats,
    closed: bool,
}

impl Indexer {
    /// Create an indexer with the default configuration.
    pub fn new(name: impl Into<String>, source: EntitySource, destination: IndexingDestination) -> Self {
        Self::with_config(name, source, destination, IndexerConfig::default())
    }

    /// Create an indexer with custom configuration.
    pub fn with_config(
        name: impl Into<String>,
        source: EntitySource,
        destination: IndexingDestination,
        config: IndexerConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(IndexingState::Uninitialised);
        let ledger = match config.ledger_path {
            Some(path) => EntityIdLedger::with_file(path),
            None => EntityIdLedger::in_memory(),
        };

        Self {
            name: name.into(),
            run_id: Uuid::new_v4(),
            state: IndexingState::Uninitialised,
            state_tx,
            chunk_size: config.chunk_size.max(1),
            index_all_entities: config.index_all_entities,
            source,
            normaliser: NormaliserChain::identity(),
            processors: ProcessorChain::empty(),
            post_processors: ProcessorChain::empty(),
            destination,
            ledger,
            stats: IndexingStats::default(),
            closed: false,
        }
    }

    pub fn with_normaliser(mut self, normaliser: NormaliserChain) -> Self {
        self.normaliser = normaliser;
        self
    }

    pub fn with_processors(mut self, processors: ProcessorChain) -> Self {
        self.processors = processors;
        self
    }

    pub fn with_post_processors(mut self, post_processors: ProcessorChain) -> Self {
        self.post_processors = post_processors;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier of this run, attached to every log span.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn state(&self) -> IndexingState {
        self.state
    }

    /// Observe state transitions, e.g. while `index()` runs on another task.
    pub fn subscribe_state(&self) -> watch::Receiver<IndexingState> {
        self.state_tx.subscribe()
    }

    pub fn source_mode(&self) -> SourceMode {
        self.source.mode()
    }

    pub fn stats(&self) -> IndexingStats {
        self.stats
    }

    /// IDs committed to the destination by this run (or loaded from an earlier one).
    pub fn ledger(&self) -> &EntityIdLedger {
        &self.ledger
    }

    pub fn destination(&self) -> &IndexingDestination {
        &self.destination
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Set the chunk size. Values <= 0 select the default.
    ///
    /// Only allowed until indexing starts. The chunk size may not exceed the
    /// destination's maximum batch size.
    pub fn set_chunk_size(&mut self, chunk_size: i64) -> Result<(), PipelineError> {
        if self.state > IndexingState::Initialised {
            return Err(PipelineError::illegal_state("set_chunk_size", self.state));
        }
        let chunk_size = effective_chunk_size(chunk_size);
        self.check_chunk_size(chunk_size)?;
        self.chunk_size = chunk_size;
        Ok(())
    }

    fn check_chunk_size(&self, chunk_size: usize) -> Result<(), PipelineError> {
        self.destination
            .config()
            .check_batch_size(chunk_size)
            .map_err(|e| PipelineError::configuration(format!("chunk size {}: {}", chunk_size, e)))
    }

    pub fn is_index_all_entities_state(&self) -> bool {
        self.index_all_entities
    }

    /// Index entities with a negative score instead of skipping them.
    pub fn set_index_all_entities_state(&mut self, index_all: bool) {
        self.index_all_entities = index_all;
    }

    fn set_state(&mut self, state: IndexingState) {
        if state <= self.state {
            return;
        }
        info!(indexer = %self.name, from = %self.state, to = %state, "Indexing state changed");
        self.state = state;
        self.state_tx.send_replace(state);
    }

    /// Run all remaining phases: initialise, index, post-process and finalise.
    #[instrument(skip(self), fields(indexer = %self.name, run_id = %self.run_id))]
    pub async fn index(&mut self) -> Result<(), PipelineError> {
        self.initialise_indexing().await?;
        self.index_entities().await?;
        self.post_process_entities().await?;
        self.finalise_indexing().await?;

        info!(
            read = self.stats.entities_read,
            indexed = self.stats.entities_indexed,
            skipped = self.stats.entities_skipped,
            failed = self.stats.entities_failed,
            post_processed = self.stats.entities_post_processed,
            "Indexing finished"
        );
        Ok(())
    }

    /// Initialise all components. Does nothing unless the indexer is uninitialised.
    #[instrument(skip(self), fields(indexer = %self.name))]
    pub async fn initialise_indexing(&mut self) -> Result<(), PipelineError> {
        if self.state != IndexingState::Uninitialised {
            debug!(state = %self.state, "Indexer already initialised");
            return Ok(());
        }
        self.check_chunk_size(self.chunk_size)?;
        self.set_state(IndexingState::Initialising);
        info!(
            mode = %self.source.mode(),
            chunk_size = self.chunk_size,
            normalisers = ?self.normaliser,
            processors = ?self.processors.names(),
            post_processors = ?self.post_processors.names(),
            "Initialising indexer"
        );

        if let Err(e) = self.initialise_components().await {
            error!(error = %e, "Failed to initialise indexer");
            return Err(e);
        }

        self.set_state(IndexingState::Initialised);
        Ok(())
    }

    async fn initialise_components(&mut self) -> Result<(), PipelineError> {
        self.source.initialise().await?;
        self.processors.initialise().await?;
        self.post_processors.initialise().await?;
        initialise_component(&mut self.destination).await
    }

    /// Drain the source into the destination.
    ///
    /// Per-entity failures are logged and the entity is left out. A failed
    /// chunk commit aborts the run and leaves the indexer in `INDEXING`.
    #[instrument(skip(self), fields(indexer = %self.name, run_id = %self.run_id))]
    pub async fn index_entities(&mut self) -> Result<(), PipelineError> {
        match self.state {
            IndexingState::Uninitialised | IndexingState::Initialising => {
                return Err(PipelineError::illegal_state("index_entities", self.state));
            }
            IndexingState::Indexing => {
                // only reachable after an aborted run; the source is partly consumed
                return Err(PipelineError::illegal_state("index_entities", self.state));
            }
            IndexingState::Initialised => {}
            _ => {
                debug!(state = %self.state, "Entities already indexed");
                return Ok(());
            }
        }
        self.set_state(IndexingState::Indexing);
        self.ledger.start()?;
        info!(mode = %self.source.mode(), chunk_size = self.chunk_size, "Indexing entities");

        let result = {
            let mut run = IndexingRun {
                indexer: &self.name,
                normaliser: &mut self.normaliser,
                processors: &self.processors,
                index_all: self.index_all_entities,
                stats: &mut self.stats,
                writer: ChunkWriter::new(&self.destination, &mut self.ledger, self.chunk_size),
                started: Instant::now(),
            };
            let drained = match &mut self.source {
                EntitySource::DataIterating { iterator, scores } => {
                    run.drain_data(iterator.as_mut(), scores.as_ref()).await
                }
                EntitySource::Adapted { iterator, scores } => {
                    run.drain_data(iterator.as_mut(), &*scores).await
                }
                EntitySource::IdIterating { iterator, data } => {
                    run.drain_ids(iterator.as_mut(), data.as_ref()).await
                }
            };
            match drained {
                Ok(()) => run.finish().await,
                Err(e) => Err(e),
            }
        };
        if let Err(e) = result {
            error!(error = %e, indexed = self.stats.entities_indexed, "Indexing aborted");
            return Err(e);
        }

        self.ledger.finish()?;
        self.processors.close().await;
        info!(
            read = self.stats.entities_read,
            indexed = self.stats.entities_indexed,
            skipped = self.stats.entities_skipped,
            failed = self.stats.entities_failed,
            chunks = self.stats.chunks_committed,
            "Indexed entities"
        );
        self.set_state(IndexingState::Indexed);
        Ok(())
    }

    /// Mark indexing as done without reading the source.
    ///
    /// The ledger is loaded from its file when indexing never started, so a
    /// job can post-process the entities committed by an earlier run.
    pub async fn skip_index_entities(&mut self) -> Result<(), PipelineError> {
        if self.state >= IndexingState::Indexed {
            return Ok(());
        }
        if !self.ledger.is_started() {
            let count = self.ledger.load()?;
            info!(indexer = %self.name, count = count, "Skipped indexing, using stored entity ids");
        } else {
            warn!(indexer = %self.name, state = %self.state, "Skipping remaining indexing");
        }
        self.processors.close().await;
        self.set_state(IndexingState::Indexed);
        Ok(())
    }

    /// Rewrite every committed record through the post-processors.
    #[instrument(skip(self), fields(indexer = %self.name, run_id = %self.run_id))]
    pub async fn post_process_entities(&mut self) -> Result<(), PipelineError> {
        match self.state {
            state if state < IndexingState::Indexed => {
                return Err(PipelineError::illegal_state("post_process_entities", state));
            }
            IndexingState::Indexed => {}
            IndexingState::PostProcessing => {
                return Err(PipelineError::illegal_state("post_process_entities", self.state));
            }
            _ => {
                debug!(state = %self.state, "Entities already post-processed");
                return Ok(());
            }
        }
        self.set_state(IndexingState::PostProcessing);

        if self.post_processors.is_empty() {
            debug!("No post-processors configured");
        } else {
            info!(count = self.ledger.len(), "Post-processing entities");
            let started = Instant::now();
            let ids: Vec<String> = self.ledger.ids().map(String::from).collect();
            for (visited, id) in ids.iter().enumerate() {
                match self.post_process(id).await {
                    Ok(()) => self.stats.entities_post_processed += 1,
                    Err(reason) => {
                        warn!(entity_id = %id, error = %reason, "Failed to post-process entity");
                        self.stats.post_processing_failed += 1;
                    }
                }
                let visited = visited as u64 + 1;
                if visited % PROGRESS_INTERVAL == 0 {
                    info!(
                        visited = visited,
                        total = ids.len(),
                        elapsed_secs = started.elapsed().as_secs(),
                        "Post-processing progress"
                    );
                }
            }
            info!(
                post_processed = self.stats.entities_post_processed,
                failed = self.stats.post_processing_failed,
                "Post-processed entities"
            );
        }

        self.post_processors.close().await;
        self.set_state(IndexingState::PostProcessed);
        Ok(())
    }

    async fn post_process(&self, id: &str) -> Result<(), PipelineError> {
        let record = self
            .destination
            .fetch(id)
            .await?
            .ok_or_else(|| StoreError::not_found(id))?;
        let record = self.post_processors.process(record)?;
        self.destination.write_back(&record).await?;
        Ok(())
    }

    /// Mark post-processing as done without running the post-processors.
    pub async fn skip_post_process_entities(&mut self) -> Result<(), PipelineError> {
        if self.state >= IndexingState::PostProcessed {
            return Ok(());
        }
        self.post_processors.close().await;
        self.set_state(IndexingState::PostProcessed);
        Ok(())
    }

    /// Finalise the destination and release all components.
    #[instrument(skip(self), fields(indexer = %self.name, run_id = %self.run_id))]
    pub async fn finalise_indexing(&mut self) -> Result<(), PipelineError> {
        match self.state {
            state if state < IndexingState::Indexed => {
                return Err(PipelineError::illegal_state("finalise_indexing", state));
            }
            IndexingState::PostProcessing | IndexingState::Finalising => {
                return Err(PipelineError::illegal_state("finalise_indexing", self.state));
            }
            state if state >= IndexingState::Finished => {
                debug!(state = %state, "Indexing already finalised");
                return Ok(());
            }
            _ => {}
        }
        self.set_state(IndexingState::Finalising);

        let result = self.destination.finalise().await;
        self.close().await;
        if let Err(e) = result {
            error!(error = %e, "Failed to finalise destination");
            return Err(e.into());
        }

        self.set_state(IndexingState::Finished);
        Ok(())
    }

    /// Release all components exactly once, whatever the state.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.source.close().await;
        self.processors.close().await;
        self.post_processors.close().await;
        close_component(&mut self.destination).await;
        if let Err(e) = self.ledger.finish() {
            warn!(indexer = %self.name, error = %e, "Failed to flush entity id ledger");
        }
        self.closed = true;
        debug!(indexer = %self.name, "Closed indexer components");
    }
}

/// Borrowed state of one pass over the source.
struct IndexingRun<'a> {
    indexer: &'a str,
    normaliser: &'a mut NormaliserChain,
    processors: &'a ProcessorChain,
    index_all: bool,
    stats: &'a mut IndexingStats,
    writer: ChunkWriter<'a>,
    started: Instant,
}

impl IndexingRun<'_> {
    async fn drain_data(
        &mut self,
        iterator: &mut dyn EntityDataIterator,
        scores: &dyn EntityScoreProvider,
    ) -> Result<(), PipelineError> {
        let needs_data = scores.needs_data();
        loop {
            let record = match iterator.next_entity().await {
                Ok(Some(record)) => record,
                Ok(None) => return Ok(()),
                Err(e) if e.is_recoverable() => {
                    self.read();
                    self.failed(None, &e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            self.read();

            let raw = if needs_data {
                scores.score_for_record(&record).await
            } else {
                scores.score_for_id(record.id()).await
            };
            let raw = match raw {
                Ok(raw) => raw,
                Err(e) => {
                    self.failed(Some(record.id()), &e);
                    continue;
                }
            };
            if let Some(score) = self.normalise(record.id(), raw) {
                self.accept(record, score).await?;
            }
        }
    }

    async fn drain_ids(
        &mut self,
        iterator: &mut dyn EntityIterator,
        data: &dyn EntityDataProvider,
    ) -> Result<(), PipelineError> {
        loop {
            let entry = match iterator.next_score().await {
                Ok(Some(entry)) => entry,
                Ok(None) => return Ok(()),
                Err(e) if e.is_recoverable() => {
                    self.read();
                    self.failed(None, &e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            self.read();

            // excluded entities are never fetched
            let Some(score) = self.normalise(&entry.id, entry.score) else {
                continue;
            };
            match data.entity_data(&entry.id).await {
                Ok(Some(record)) => self.accept(record, score).await?,
                Ok(None) => self.failed(Some(&entry.id), &"no data for entity"),
                Err(e) => self.failed(Some(&entry.id), &e),
            }
        }
    }

    /// Normalise the raw score; `None` if the entity is excluded.
    fn normalise(&mut self, id: &str, raw: Option<f64>) -> Option<Option<f64>> {
        let score = self.normaliser.normalise(raw);
        match score {
            Some(s) if s < 0.0 && !self.index_all => {
                trace!(entity_id = %id, raw = ?raw, score = s, "Skipping entity with negative score");
                self.stats.entities_skipped += 1;
                None
            }
            _ => Some(score),
        }
    }

    async fn accept(&mut self, mut record: EntityRecord, score: Option<f64>) -> Result<(), PipelineError> {
        match score {
            Some(score) => record.set(SCORE_FIELD, score),
            None => {
                record.remove(SCORE_FIELD);
            }
        }
        let id = record.id().to_string();
        let record = match self.processors.process(record) {
            Ok(record) => record,
            Err(e) => {
                self.failed(Some(&id), &e);
                return Ok(());
            }
        };
        // the ledger stores one ID per line
        if !EntityIdLedger::is_recordable(record.id()) {
            self.failed(Some(record.id()), &"entity id is empty or contains a line break");
            return Ok(());
        }
        let committed = self.writer.push(record).await?;
        self.committed(committed);
        Ok(())
    }

    async fn finish(mut self) -> Result<(), PipelineError> {
        let committed = self.writer.flush().await?;
        self.committed(committed);
        Ok(())
    }

    fn committed(&mut self, count: usize) {
        if count > 0 {
            self.stats.entities_indexed += count as u64;
            self.stats.chunks_committed += 1;
        }
    }

    fn read(&mut self) {
        self.stats.entities_read += 1;
        if self.stats.entities_read % PROGRESS_INTERVAL == 0 {
            let elapsed = self.started.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                self.stats.entities_read as f64 / elapsed
            } else {
                0.0
            };
            info!(
                indexer = %self.indexer,
                read = self.stats.entities_read,
                indexed = self.stats.entities_indexed,
                skipped = self.stats.entities_skipped,
                failed = self.stats.entities_failed,
                entities_per_sec = rate as u64,
                "Indexing progress"
            );
        }
    }

    fn failed(&mut self, id: Option<&str>, reason: &dyn Display) {
        self.stats.entities_failed += 1;
        match id {
            Some(id) => warn!(indexer = %self.indexer, entity_id = %id, error = %reason, "Skipping entity"),
            None => warn!(indexer = %self.indexer, error = %reason, "Skipping entity"),
        }
    }
}
