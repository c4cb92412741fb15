//! Ledger keys and records.
//!
//! `RecordDraft` is what the pipeline hands to the ledger. `Record` is what
//! the ledger stores and returns: the draft plus its append position and the
//! hash-chain links that make tampering detectable.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::payload::CanonicalPayload;

/// A ledger key: a content digest or a caller-supplied identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey(pub String);

impl RecordKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a committed payload was genuinely validated or substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadOrigin {
    Validated,
    Fallback,
}

impl PayloadOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadOrigin::Validated => "validated",
            PayloadOrigin::Fallback => "fallback",
        }
    }
}

/// A record ready to be committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDraft {
    pub key: RecordKey,
    pub schema_id: String,
    pub payload: CanonicalPayload,
    pub origin: PayloadOrigin,
    /// Caller-provided descriptive fields stored verbatim (e.g. message and
    /// sender). Never sent through the oracle and never validated.
    #[serde(default)]
    pub subject: BTreeMap<String, String>,
}

/// An immutable, committed ledger record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Append position in the ledger, starting at 0. This is the commit
    /// marker: it is identical on every party that applies the same commits.
    pub sequence: u64,
    pub key: RecordKey,
    pub schema_id: String,
    pub payload: CanonicalPayload,
    pub origin: PayloadOrigin,
    #[serde(default)]
    pub subject: BTreeMap<String, String>,
    /// `this_hash` of the previous record, or `GENESIS_HASH`.
    pub prev_hash: String,
    pub this_hash: String,
}

impl Record {
    /// The `prev_hash` of the first record in every ledger.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";

    /// Seal a draft at the given position.
    pub fn seal(draft: RecordDraft, sequence: u64, prev_hash: String, this_hash: String) -> Self {
        Self {
            sequence,
            key: draft.key,
            schema_id: draft.schema_id,
            payload: draft.payload,
            origin: draft.origin,
            subject: draft.subject,
            prev_hash,
            this_hash,
        }
    }

    /// Recover the draft this record was sealed from.
    pub fn draft(&self) -> RecordDraft {
        RecordDraft {
            key: self.key.clone(),
            schema_id: self.schema_id.clone(),
            payload: self.payload.clone(),
            origin: self.origin,
            subject: self.subject.clone(),
        }
    }
}
