//! Exported ledger snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use concord_contracts::record::Record;

use crate::chain::verify_chain;

/// A point-in-time copy of a ledger's records.
///
/// The `terminal_hash` is the `this_hash` of the last record and commits to
/// the entire chain; two parties holding the same terminal hash hold the
/// same history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// All records in append order (sequence 0 first).
    pub records: Vec<Record>,

    /// Wall-clock time (UTC) of the export. Never part of any hash.
    pub exported_at: DateTime<Utc>,

    /// The `this_hash` of the last record. Empty if the ledger is empty.
    pub terminal_hash: String,
}

impl LedgerSnapshot {
    pub(crate) fn of(records: Vec<Record>) -> Self {
        let terminal_hash = records.last().map(|r| r.this_hash.clone()).unwrap_or_default();
        Self { records, exported_at: Utc::now(), terminal_hash }
    }

    /// Re-check the exported chain, e.g. after receiving it from a peer.
    pub fn verify(&self) -> bool {
        verify_chain(&self.records)
            && self.records.last().map(|r| r.this_hash.as_str()).unwrap_or_default() == self.terminal_hash
    }
}
