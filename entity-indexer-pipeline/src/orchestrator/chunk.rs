//! Chunked writes to the destination.

use tracing::{debug, error, instrument};

use crate::errors::PipelineError;
use entity_indexer_repository::{EntityIdLedger, IndexingDestination};
use entity_indexer_shared::EntityRecord;

/// Buffers records and commits them to the destination one chunk at a time.
///
/// IDs reach the ledger only after their chunk was committed.
pub(crate) struct ChunkWriter<'a> {
    destination: &'a IndexingDestination,
    ledger: &'a mut EntityIdLedger,
    chunk_size: usize,
    pending: Vec<EntityRecord>,
}

impl<'a> ChunkWriter<'a> {
    pub(crate) fn new(
        destination: &'a IndexingDestination,
        ledger: &'a mut EntityIdLedger,
        chunk_size: usize,
    ) -> Self {
        Self {
            destination,
            ledger,
            chunk_size,
            pending: Vec::with_capacity(chunk_size),
        }
    }

    /// Add a record, committing the chunk once it is full.
    ///
    /// Returns the number of records committed by this call.
    pub(crate) async fn push(&mut self, record: EntityRecord) -> Result<usize, PipelineError> {
        self.pending.push(record);
        if self.pending.len() >= self.chunk_size {
            return self.flush().await;
        }
        Ok(0)
    }

    /// Commit the pending records, if any.
    #[instrument(skip(self), fields(count = self.pending.len()))]
    pub(crate) async fn flush(&mut self) -> Result<usize, PipelineError> {
        if self.pending.is_empty() {
            return Ok(0);
        }
        let count = self.pending.len();

        if let Err(e) = self.destination.commit_chunk(&self.pending).await {
            error!(error = %e, count = count, "Failed to commit chunk");
            return Err(e.into());
        }
        self.ledger
            .record(self.pending.iter().map(EntityRecord::id))?;
        debug!(count = count, "Committed chunk");

        self.pending.clear();
        Ok(count)
    }
}
