use std::fmt;

/// Lifecycle state of an indexing run.
///
/// States are ordered; an [`Indexer`](super::Indexer) only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexingState {
    Uninitialised,
    Initialising,
    Initialised,
    Indexing,
    Indexed,
    PostProcessing,
    PostProcessed,
    Finalising,
    Finished,
}

impl IndexingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialised => "UNINITIALISED",
            Self::Initialising => "INITIALISING",
            Self::Initialised => "INITIALISED",
            Self::Indexing => "INDEXING",
            Self::Indexed => "INDEXED",
            Self::PostProcessing => "POSTPROCESSING",
            Self::PostProcessed => "POSTPROCESSED",
            Self::Finalising => "FINALISING",
            Self::Finished => "FINISHED",
        }
    }
}

impl fmt::Display for IndexingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
