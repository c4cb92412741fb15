//! In-memory implementation of `Ledger`.
//!
//! `InMemoryLedger` is the reference implementation of the `Ledger` trait.
//! It keeps all records in a `Vec` protected by a `Mutex`, with a key index
//! for lookups. The duplicate check and the append happen under one lock
//! acquisition, so two concurrent `put`s for the same key can never both
//! succeed.
//!
//! Use `export_snapshot()` to obtain a sealed copy, and `verify_integrity()`
//! at any time to confirm the chain has not been tampered with in memory.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use concord_contracts::{
    error::{ConcordError, ConcordResult},
    record::{Record, RecordDraft, RecordKey},
};
use concord_core::traits::Ledger;

use crate::{
    chain::{check_link, hash_record, verify_chain},
    snapshot::LedgerSnapshot,
};

// ── Chain state shared by every ledger backend ───────────────────────────────

/// Records in append order plus a key index.
#[derive(Debug)]
pub(crate) struct ChainState {
    pub(crate) records: Vec<Record>,
    index: BTreeMap<RecordKey, usize>,
    last_hash: String,
}

impl ChainState {
    pub(crate) fn new() -> Self {
        Self { records: Vec::new(), index: BTreeMap::new(), last_hash: Record::GENESIS_HASH.to_string() }
    }

    /// Seal `draft` at the next position without appending it.
    pub(crate) fn seal(&self, draft: RecordDraft) -> ConcordResult<Record> {
        if self.index.contains_key(&draft.key) {
            return Err(ConcordError::DuplicateKey { key: draft.key.to_string() });
        }
        let sequence = self.records.len() as u64;
        let this_hash = hash_record(sequence, &draft, &self.last_hash);
        Ok(Record::seal(draft, sequence, self.last_hash.clone(), this_hash))
    }

    /// Append a record produced by `seal`.
    pub(crate) fn push(&mut self, record: Record) {
        self.last_hash = record.this_hash.clone();
        self.index.insert(record.key.clone(), self.records.len());
        self.records.push(record);
    }

    /// Append a record read back from storage after checking its links.
    pub(crate) fn replay(&mut self, record: Record) -> Result<(), String> {
        check_link(&record, self.records.len() as u64, &self.last_hash)?;
        if self.index.contains_key(&record.key) {
            return Err(format!("key '{}' appears more than once", record.key));
        }
        self.push(record);
        Ok(())
    }

    pub(crate) fn get(&self, key: &RecordKey) -> ConcordResult<Record> {
        self.index
            .get(key)
            .map(|&idx| self.records[idx].clone())
            .ok_or_else(|| ConcordError::NotFound { key: key.to_string() })
    }

    pub(crate) fn exists(&self, key: &RecordKey) -> bool {
        self.index.contains_key(key)
    }

    pub(crate) fn keys(&self) -> Vec<RecordKey> {
        self.index.keys().cloned().collect()
    }

    pub(crate) fn latest(&self) -> Option<Record> {
        self.records.last().cloned()
    }
}

// ── Public ledger ─────────────────────────────────────────────────────────────

/// An in-memory, create-only ledger backed by a SHA-256 hash chain.
///
/// Clones share the same underlying records.
#[derive(Debug, Clone)]
pub struct InMemoryLedger {
    pub(crate) state: Arc<Mutex<ChainState>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self { state: Arc::new(Mutex::new(ChainState::new())) }
    }

    /// Snapshot reads tolerate a poisoned lock: appends are all-or-nothing,
    /// so the state is consistent even if a holder panicked.
    fn read(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Export a copy of every record written so far.
    pub fn export_snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot::of(self.read().records.clone())
    }

    /// Verify that the in-memory chain has not been tampered with.
    pub fn verify_integrity(&self) -> bool {
        verify_chain(&self.read().records)
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

// ── Ledger impl ───────────────────────────────────────────────────────────────

impl Ledger for InMemoryLedger {
    fn put(&self, draft: RecordDraft) -> ConcordResult<Record> {
        let mut state = self.state.lock().map_err(|e| ConcordError::LedgerWriteFailed {
            reason: format!("ledger lock poisoned: {e}"),
        })?;

        let record = state.seal(draft)?;
        state.push(record.clone());

        debug!(key = %record.key, sequence = record.sequence, "record appended");
        Ok(record)
    }

    fn get(&self, key: &RecordKey) -> ConcordResult<Record> {
        self.read().get(key)
    }

    fn exists(&self, key: &RecordKey) -> ConcordResult<bool> {
        Ok(self.read().exists(key))
    }

    fn list_keys(&self) -> ConcordResult<Vec<RecordKey>> {
        Ok(self.read().keys())
    }

    fn latest(&self) -> ConcordResult<Option<Record>> {
        Ok(self.read().latest())
    }
}
