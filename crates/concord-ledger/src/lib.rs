//! # concord-ledger
//!
//! Create-only, SHA-256 hash-chained record ledgers for the Concord
//! pipeline.
//!
//! ## Overview
//!
//! Every committed record carries its append position (`sequence`) and
//! links to the previous record via its SHA-256 hash. Tampering with any
//! record, even a single byte, breaks the chain and is detected by
//! `verify_chain`. There is no update or delete.
//!
//! Two backends are provided:
//! - `InMemoryLedger` for tests and single-process runs
//! - `JsonlLedger`, which persists one record per line and re-verifies the
//!   chain when reopened
//!
//! ## Usage
//!
//! ```rust,ignore
//! use concord_ledger::InMemoryLedger;
//! use concord_core::traits::Ledger;
//!
//! let ledger = InMemoryLedger::new();
//! let record = ledger.put(draft)?;
//!
//! assert!(ledger.verify_integrity());
//! let snapshot = ledger.export_snapshot();
//! ```

pub mod chain;
pub mod jsonl;
pub mod memory;
pub mod snapshot;

pub use chain::{hash_record, verify_chain};
pub use jsonl::JsonlLedger;
pub use memory::InMemoryLedger;
pub use snapshot::LedgerSnapshot;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::io::Write;
    use std::sync::Arc;
    use std::thread;

    use serde_json::json;

    use concord_contracts::{
        error::ConcordError,
        payload::CanonicalPayload,
        record::{PayloadOrigin, Record, RecordDraft, RecordKey},
    };
    use concord_core::traits::Ledger;

    use super::{verify_chain, InMemoryLedger, JsonlLedger};

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// Build a draft with a distinguishable payload.
    fn make_draft(key: &str, status: &str) -> RecordDraft {
        RecordDraft {
            key: RecordKey::new(key),
            schema_id: "moderation-v1".to_string(),
            payload: CanonicalPayload::from_value(json!({ "status": status })).unwrap(),
            origin: PayloadOrigin::Validated,
            subject: BTreeMap::from([("sender".to_string(), "alice".to_string())]),
        }
    }

    // ── InMemoryLedger ────────────────────────────────────────────────────────

    /// Writing three records and verifying produces a valid chain.
    #[test]
    fn test_hash_chain_integrity() {
        let ledger = InMemoryLedger::new();
        ledger.put(make_draft("a", "NO")).unwrap();
        ledger.put(make_draft("b", "NO")).unwrap();
        ledger.put(make_draft("c", "NO")).unwrap();

        assert!(ledger.verify_integrity(), "chain must be valid after sequential writes");
    }

    /// Mutating a stored payload breaks the chain.
    #[test]
    fn test_tamper_detection() {
        let ledger = InMemoryLedger::new();
        ledger.put(make_draft("a", "NO")).unwrap();
        ledger.put(make_draft("b", "NO")).unwrap();

        {
            let mut state = ledger.state.lock().unwrap();
            state.records[0].payload = CanonicalPayload::from_value(json!({ "status": "YES" })).unwrap();
        }

        assert!(!ledger.verify_integrity(), "chain must detect tampering with a stored record");
    }

    /// The first record links to the genesis hash; sequences have no gaps.
    #[test]
    fn test_genesis_and_sequence() {
        let ledger = InMemoryLedger::new();
        for key in ["a", "b", "c"] {
            ledger.put(make_draft(key, "NO")).unwrap();
        }

        let snapshot = ledger.export_snapshot();
        assert_eq!(snapshot.records[0].prev_hash, Record::GENESIS_HASH);
        for (idx, record) in snapshot.records.iter().enumerate() {
            assert_eq!(record.sequence, idx as u64);
        }
    }

    #[test]
    fn test_duplicate_key_leaves_original() {
        let ledger = InMemoryLedger::new();
        let original = ledger.put(make_draft("case-1", "NO")).unwrap();

        match ledger.put(make_draft("case-1", "YES")) {
            Err(ConcordError::DuplicateKey { key }) => assert_eq!(key, "case-1"),
            other => panic!("expected DuplicateKey, got {:?}", other),
        }
        assert_eq!(ledger.get(&RecordKey::new("case-1")).unwrap(), original);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let ledger = InMemoryLedger::new();
        assert!(matches!(ledger.get(&RecordKey::new("nope")), Err(ConcordError::NotFound { .. })));
        assert!(!ledger.exists(&RecordKey::new("nope")).unwrap());
    }

    #[test]
    fn test_list_keys_sorted_and_latest_is_last_written() {
        let ledger = InMemoryLedger::new();
        assert!(ledger.latest().unwrap().is_none());

        ledger.put(make_draft("zeta", "NO")).unwrap();
        ledger.put(make_draft("alpha", "NO")).unwrap();

        assert_eq!(ledger.list_keys().unwrap(), vec![RecordKey::new("alpha"), RecordKey::new("zeta")]);
        assert_eq!(ledger.latest().unwrap().unwrap().key, RecordKey::new("alpha"));
    }

    /// `export_snapshot()` commits to the whole chain via its terminal hash.
    #[test]
    fn test_export_snapshot() {
        let ledger = InMemoryLedger::new();
        assert_eq!(ledger.export_snapshot().terminal_hash, "");

        ledger.put(make_draft("a", "NO")).unwrap();
        ledger.put(make_draft("b", "NO")).unwrap();

        let snapshot = ledger.export_snapshot();
        assert_eq!(snapshot.records.len(), 2);
        assert_eq!(snapshot.terminal_hash, snapshot.records[1].this_hash);
        assert!(snapshot.verify());
        assert!(verify_chain(&snapshot.records));
    }

    /// Concurrent puts for one key: exactly one commits.
    #[test]
    fn test_concurrent_put_same_key() {
        let ledger = Arc::new(InMemoryLedger::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || ledger.put(make_draft("shared", "NO")).is_ok())
            })
            .collect();

        let successes = handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count();
        assert_eq!(successes, 1);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.verify_integrity());
    }

    // ── JsonlLedger ───────────────────────────────────────────────────────────

    #[test]
    fn test_jsonl_replays_on_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");

        let written = {
            let ledger = JsonlLedger::open(&path).unwrap();
            ledger.put(make_draft("a", "NO")).unwrap();
            ledger.put(make_draft("b", "NO")).unwrap()
        };

        let reopened = JsonlLedger::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get(&RecordKey::new("b")).unwrap(), written);
        assert_eq!(reopened.latest().unwrap().unwrap(), written);
        assert!(reopened.export_snapshot().verify());
    }

    #[test]
    fn test_jsonl_duplicate_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        JsonlLedger::open(&path).unwrap().put(make_draft("case-1", "NO")).unwrap();

        let reopened = JsonlLedger::open(&path).unwrap();
        assert!(matches!(
            reopened.put(make_draft("case-1", "YES")),
            Err(ConcordError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn test_jsonl_continues_chain_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        JsonlLedger::open(&path).unwrap().put(make_draft("a", "NO")).unwrap();

        let reopened = JsonlLedger::open(&path).unwrap();
        let second = reopened.put(make_draft("b", "NO")).unwrap();
        assert_eq!(second.sequence, 1);
        assert!(reopened.export_snapshot().verify());
    }

    #[test]
    fn test_jsonl_rejects_tampered_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        JsonlLedger::open(&path).unwrap().put(make_draft("a", "NO")).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, contents.replace("\"NO\"", "\"YES\"")).unwrap();

        match JsonlLedger::open(&path) {
            Err(ConcordError::ConfigError { reason }) => assert!(reason.contains("line 1"), "{reason}"),
            other => panic!("expected ConfigError, got {:?}", other.map(|l| l.len())),
        }
    }

    #[test]
    fn test_jsonl_rejects_garbage_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "not a record").unwrap();

        assert!(matches!(JsonlLedger::open(&path), Err(ConcordError::ConfigError { .. })));
    }
}
