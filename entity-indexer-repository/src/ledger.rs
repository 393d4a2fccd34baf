//! Ledger of committed entity IDs.
//!
//! The ledger records every entity ID that was actually written to the
//! destination during the main indexing phase, so post-processing can revisit
//! exactly that set without draining the original source again.
//!
//! When backed by a file the IDs are stored one per line. The file is
//! truncated when indexing starts and flushed after every recorded chunk, which
//! lets a later run skip indexing and post-process the entities committed by
//! an earlier one.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::LedgerError;

/// Set of entity IDs committed to the destination.
#[derive(Debug, Default)]
pub struct EntityIdLedger {
    path: Option<PathBuf>,
    ids: HashSet<String>,
    writer: Option<BufWriter<File>>,
    started: bool,
}

impl EntityIdLedger {
    /// A ledger living only in memory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A ledger persisted to the given file.
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// The backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Start a new ledger: forget all IDs and truncate the backing file.
    pub fn start(&mut self) -> Result<(), LedgerError> {
        self.ids.clear();
        self.writer = None;
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| LedgerError::io(parent, e))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)
                .map_err(|e| LedgerError::io(path, e))?;
            info!(path = %path.display(), "Started entity id ledger");
            self.writer = Some(BufWriter::new(file));
        }
        self.started = true;
        Ok(())
    }

    /// Whether [`EntityIdLedger::start`] was called.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Load the IDs recorded by an earlier run from the backing file.
    ///
    /// A missing file (or a ledger without file) loads nothing. Returns the
    /// number of IDs now in the ledger.
    pub fn load(&mut self) -> Result<usize, LedgerError> {
        let Some(path) = &self.path else {
            return Ok(self.ids.len());
        };
        if !path.is_file() {
            debug!(path = %path.display(), "No ledger file to load");
            return Ok(self.ids.len());
        }
        let file = File::open(path).map_err(|e| LedgerError::io(path, e))?;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| LedgerError::io(path, e))?;
            let id = line.trim();
            if !id.is_empty() {
                self.ids.insert(id.to_string());
            }
        }
        info!(path = %path.display(), count = self.ids.len(), "Loaded entity id ledger");
        Ok(self.ids.len())
    }

    /// Whether an ID can be stored as one line of the ledger file.
    pub fn is_recordable(id: &str) -> bool {
        !id.is_empty() && !id.contains(['\n', '\r'])
    }

    /// Record the IDs of a successfully committed chunk.
    ///
    /// IDs already present are ignored. Returns the number of newly recorded IDs.
    pub fn record<'a, I>(&mut self, ids: I) -> Result<usize, LedgerError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if !self.started {
            return Err(LedgerError::NotStarted);
        }
        let mut added = 0;
        for id in ids {
            if !Self::is_recordable(id) {
                return Err(LedgerError::InvalidId(id.to_string()));
            }
            if !self.ids.insert(id.to_string()) {
                continue;
            }
            added += 1;
            if let (Some(writer), Some(path)) = (self.writer.as_mut(), self.path.as_ref()) {
                writeln!(writer, "{}", id).map_err(|e| LedgerError::io(path, e))?;
            }
        }
        if let (Some(writer), Some(path)) = (self.writer.as_mut(), self.path.as_ref()) {
            writer.flush().map_err(|e| LedgerError::io(path, e))?;
        }
        Ok(added)
    }

    /// Flush and close the backing file. The IDs stay available in memory.
    pub fn finish(&mut self) -> Result<(), LedgerError> {
        if let Some(mut writer) = self.writer.take() {
            if let Some(path) = &self.path {
                writer.flush().map_err(|e| LedgerError::io(path, e))?;
            }
        }
        Ok(())
    }

    /// Whether the ID was recorded.
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Number of recorded IDs.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True if no ID was recorded.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// All recorded IDs, in no particular order and without duplicates.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}
