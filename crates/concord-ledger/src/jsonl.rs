//! File-backed implementation of `Ledger`.
//!
//! `JsonlLedger` appends one JSON-serialized `Record` per line. Opening a
//! ledger replays the file and re-verifies the whole hash chain, so a file
//! edited outside the ledger is refused rather than silently trusted.
//!
//! A record becomes visible only after its line has been written and
//! flushed. If the write fails, any partial line is cut from the file, the
//! in-memory index is untouched and the key stays free. If the cut itself
//! fails, the ledger refuses every later write.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use concord_contracts::{
    error::{ConcordError, ConcordResult},
    record::{Record, RecordDraft, RecordKey},
};
use concord_core::traits::Ledger;

use crate::{memory::ChainState, snapshot::LedgerSnapshot};

/// The file a ledger appends to.
trait LineSink: Write + Send {
    /// Current length in bytes.
    fn end(&mut self) -> io::Result<u64>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl LineSink for File {
    fn end(&mut self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

enum AppendError {
    /// The file is back to its length before the append.
    RolledBack(io::Error),
    /// Part of the line may still be on disk.
    Torn { write: io::Error, truncate: io::Error },
}

/// Write and flush `line`, cutting the sink back on failure.
fn append_line(sink: &mut dyn LineSink, line: &[u8]) -> Result<(), AppendError> {
    let start = sink.end().map_err(AppendError::RolledBack)?;
    let written = sink.write_all(line).and_then(|()| sink.flush());
    match written {
        Ok(()) => Ok(()),
        Err(write) => match sink.truncate(start) {
            Ok(()) => Err(AppendError::RolledBack(write)),
            Err(truncate) => Err(AppendError::Torn { write, truncate }),
        },
    }
}

struct JsonlState {
    chain: ChainState,
    file: Box<dyn LineSink>,
    /// Set once a failed write could not be undone.
    torn: Option<String>,
}

/// A create-only ledger persisted as JSON Lines.
pub struct JsonlLedger {
    path: PathBuf,
    state: Mutex<JsonlState>,
}

impl JsonlLedger {
    /// Open the ledger at `path`, creating an empty file if none exists.
    ///
    /// Fails with `LedgerWriteFailed` if the file cannot be opened or read,
    /// and with `ConfigError` if any line is malformed, repeats a key, is out
    /// of sequence, or fails its hash check.
    pub fn open(path: impl AsRef<Path>) -> ConcordResult<Self> {
        let path = path.as_ref().to_path_buf();
        let io_err = |action: &str, e: std::io::Error| ConcordError::LedgerWriteFailed {
            reason: format!("cannot {action} ledger '{}': {e}", path.display()),
        };

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_err("open", e))?;

        let mut chain = ChainState::new();
        for (line_no, line) in BufReader::new(&file).lines().enumerate() {
            let line = line.map_err(|e| io_err("read", e))?;
            if line.trim().is_empty() {
                continue;
            }
            let record: Record = serde_json::from_str(&line).map_err(|e| ConcordError::ConfigError {
                reason: format!("ledger '{}' line {}: {e}", path.display(), line_no + 1),
            })?;
            chain.replay(record).map_err(|reason| ConcordError::ConfigError {
                reason: format!("ledger '{}' line {}: {reason}", path.display(), line_no + 1),
            })?;
        }

        info!(path = %path.display(), records = chain.records.len(), "ledger opened");
        Ok(Self { path, state: Mutex::new(JsonlState { chain, file: Box::new(file), torn: None }) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> MutexGuard<'_, JsonlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.read().chain.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn export_snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot::of(self.read().chain.records.clone())
    }
}

impl Ledger for JsonlLedger {
    fn put(&self, draft: RecordDraft) -> ConcordResult<Record> {
        let mut state = self.state.lock().map_err(|e| ConcordError::LedgerWriteFailed {
            reason: format!("ledger lock poisoned: {e}"),
        })?;

        let JsonlState { chain, file, torn } = &mut *state;
        if let Some(reason) = torn {
            return Err(ConcordError::LedgerWriteFailed {
                reason: format!("ledger '{}' is unusable after a torn write: {reason}", self.path.display()),
            });
        }
        let record = chain.seal(draft)?;

        let mut line = serde_json::to_string(&record).map_err(|e| ConcordError::LedgerWriteFailed {
            reason: format!("cannot serialize record '{}': {e}", record.key),
        })?;
        line.push('\n');
        match append_line(file.as_mut(), line.as_bytes()) {
            Ok(()) => {}
            Err(AppendError::RolledBack(e)) => {
                warn!(key = %record.key, error = %e, "append failed, file rolled back");
                return Err(ConcordError::LedgerWriteFailed {
                    reason: format!("cannot append to ledger '{}': {e}", self.path.display()),
                });
            }
            Err(AppendError::Torn { write, truncate }) => {
                let reason = format!("{write}; rollback failed: {truncate}");
                error!(key = %record.key, path = %self.path.display(), reason = %reason, "ledger file left torn");
                *torn = Some(reason.clone());
                return Err(ConcordError::LedgerWriteFailed {
                    reason: format!("cannot append to ledger '{}': {reason}", self.path.display()),
                });
            }
        }

        chain.push(record.clone());
        debug!(key = %record.key, sequence = record.sequence, "record appended to file");
        Ok(record)
    }

    fn get(&self, key: &RecordKey) -> ConcordResult<Record> {
        self.read().chain.get(key)
    }

    fn exists(&self, key: &RecordKey) -> ConcordResult<bool> {
        Ok(self.read().chain.exists(key))
    }

    fn list_keys(&self) -> ConcordResult<Vec<RecordKey>> {
        Ok(self.read().chain.keys())
    }

    fn latest(&self) -> ConcordResult<Option<Record>> {
        Ok(self.read().chain.latest())
    }
}
