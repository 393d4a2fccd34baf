//! Ledger error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while recording or reading committed entity IDs.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Failed to create, write or read the ledger file.
    #[error("Ledger IO error on {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IDs were recorded before the ledger was started.
    #[error("Ledger has not been started")]
    NotStarted,

    /// An entity ID cannot be stored in the line based ledger file.
    #[error("Invalid entity id {0:?}: ids must not be empty or contain line breaks")]
    InvalidId(String),
}

impl LedgerError {
    /// Create an IO error for the given ledger path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }
}
