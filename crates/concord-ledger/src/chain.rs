//! Hash-chain primitives: record hashing and chain verification.
//!
//! Every field that contributes to a record's hash is listed explicitly so
//! nothing is accidentally omitted. Variable-length fields are prefixed with
//! their byte length so adjacent fields can never run together.
//!
//! Hash input layout (bytes, in order):
//!   1. sequence as 8-byte little-endian
//!   2. prev_hash (64 ASCII hex chars)
//!   3. key
//!   4. schema_id
//!   5. origin (`validated` or `fallback`)
//!   6. canonical payload serialization
//!   7. subject entry count, then each name and value in key order

use sha2::{Digest, Sha256};

use concord_contracts::record::{Record, RecordDraft};

fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

/// Compute the SHA-256 hash sealing `draft` at `sequence` after `prev_hash`.
///
/// Returns a lowercase 64-character hex string.
pub fn hash_record(sequence: u64, draft: &RecordDraft, prev_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sequence.to_le_bytes());
    update_field(&mut hasher, prev_hash.as_bytes());
    update_field(&mut hasher, draft.key.as_str().as_bytes());
    update_field(&mut hasher, draft.schema_id.as_bytes());
    update_field(&mut hasher, draft.origin.as_str().as_bytes());
    update_field(&mut hasher, draft.payload.as_bytes());

    hasher.update((draft.subject.len() as u64).to_le_bytes());
    for (name, value) in &draft.subject {
        update_field(&mut hasher, name.as_bytes());
        update_field(&mut hasher, value.as_bytes());
    }

    hex::encode(hasher.finalize())
}

/// Check one record against the position it claims in a chain.
///
/// Returns a description of the first mismatch found.
pub fn check_link(record: &Record, expected_sequence: u64, expected_prev: &str) -> Result<(), String> {
    if record.sequence != expected_sequence {
        return Err(format!(
            "record '{}' has sequence {}, expected {expected_sequence}",
            record.key, record.sequence
        ));
    }
    if record.prev_hash != expected_prev {
        return Err(format!("record '{}' does not link to its predecessor", record.key));
    }
    let recomputed = hash_record(record.sequence, &record.draft(), &record.prev_hash);
    if record.this_hash != recomputed {
        return Err(format!("record '{}' hash does not match its contents", record.key));
    }
    Ok(())
}

/// Verify the integrity of a record chain.
///
/// A chain is valid when sequences run 0, 1, 2, ..., every `prev_hash`
/// equals the predecessor's `this_hash` (or `GENESIS_HASH` for the first),
/// and every `this_hash` matches the value recomputed from the record.
/// An empty chain is valid.
pub fn verify_chain(records: &[Record]) -> bool {
    let mut expected_prev = Record::GENESIS_HASH.to_string();

    for (index, record) in records.iter().enumerate() {
        if check_link(record, index as u64, &expected_prev).is_err() {
            return false;
        }
        expected_prev = record.this_hash.clone();
    }

    true
}
