/// Counters collected while indexing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexingStats {
    /// Entities pulled from the source.
    pub entities_read: u64,
    /// Entities committed to the destination.
    pub entities_indexed: u64,
    /// Entities excluded by a negative score.
    pub entities_skipped: u64,
    /// Entities dropped because of a per-entity error.
    pub entities_failed: u64,
    /// Chunks committed to the destination.
    pub chunks_committed: u64,
    /// Records rewritten by post-processing.
    pub entities_post_processed: u64,
    /// Records post-processing could not rewrite.
    pub post_processing_failed: u64,
}
