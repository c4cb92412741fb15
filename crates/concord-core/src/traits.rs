//! Capability trait definitions for the Concord pipeline.
//!
//! These traits define the trust boundary:
//!
//! - `OracleInvoker`: untrusted, non-deterministic generator
//! - `EvidenceFetcher`: untrusted external content source
//! - `Validator`: trusted, total response checker
//! - `PolicyHook`: trusted post-consensus veto
//! - `Ledger`: trusted create-only store
//! - `Domain`: per-domain inputs, prompt, schema, and policies
//!
//! The pipeline wires them together. Nothing an oracle returns reaches the
//! ledger without passing the validator, the consensus gate, and the hook.

use std::collections::BTreeMap;

use concord_contracts::{
    consensus::ConsensusMode,
    error::ConcordResult,
    oracle::{OracleFailurePolicy, OutputFormat},
    payload::CanonicalPayload,
    policy::PolicyVerdict,
    record::{Record, RecordDraft, RecordKey},
    schema::{Schema, Validation},
    submission::{IdentifierStrategy, InputRule, Submission},
};

use crate::input::check_input;

/// A single call to an external non-deterministic generator.
///
/// Implementations are **untrusted**: repeated calls with the same prompt may
/// return different text. Any retry, backoff, or timeout policy belongs
/// inside the implementation and surfaces as `OracleInvocation` on failure.
pub trait OracleInvoker: Send + Sync {
    fn invoke(&self, prompt: &str, format: OutputFormat) -> ConcordResult<String>;
}

/// Fetches external evidence text for a URL.
pub trait EvidenceFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> ConcordResult<String>;
}

/// Turns sanitized oracle text into a canonical payload or the fallback.
///
/// Implementations are **trusted** and must be total: any malformed input
/// yields `Validation::Fallback`, never an error or a panic.
pub trait Validator: Send + Sync {
    fn validate(&self, cleaned: &str, schema: &Schema) -> Validation;
}

/// An optional veto over a payload that independent executions agreed on.
///
/// Called after consensus and before the ledger write. Must be
/// deterministic, since every party evaluates it independently.
pub trait PolicyHook: Send + Sync {
    fn review(&self, schema_id: &str, payload: &CanonicalPayload) -> ConcordResult<PolicyVerdict>;
}

/// The append-only, create-only record store.
///
/// There is deliberately no update or delete.
pub trait Ledger: Send + Sync {
    /// Commit a draft. Fails with `DuplicateKey` if the key is occupied.
    ///
    /// The insert must be atomic: a key is either absent or holds a complete
    /// record.
    fn put(&self, draft: RecordDraft) -> ConcordResult<Record>;

    /// Fetch a record, or fail with `NotFound`.
    fn get(&self, key: &RecordKey) -> ConcordResult<Record>;

    fn exists(&self, key: &RecordKey) -> ConcordResult<bool>;

    /// All keys, sorted ascending.
    fn list_keys(&self) -> ConcordResult<Vec<RecordKey>>;

    /// The most recently committed record, if any.
    fn latest(&self) -> ConcordResult<Option<Record>>;
}

/// Everything that varies between domains.
///
/// Implementations declare their identifier strategy, consensus mode, and
/// oracle-failure policy explicitly; none of these has a global default.
pub trait Domain: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &str;

    fn schema(&self) -> &Schema;

    fn identifier_strategy(&self) -> IdentifierStrategy;

    fn consensus_mode(&self) -> ConsensusMode;

    fn oracle_failure_policy(&self) -> OracleFailurePolicy;

    /// Length constraints checked before any oracle call.
    fn input_rules(&self) -> Vec<InputRule>;

    /// Reject a submission before any oracle call.
    ///
    /// The default applies `input_rules`; override to add checks a length
    /// rule cannot express.
    fn validate_input(&self, submission: &Submission) -> ConcordResult<()> {
        check_input(submission, &self.input_rules())
    }

    /// Render the exact prompt sent to the oracle.
    ///
    /// Must be a pure function of the submission.
    fn build_prompt(&self, submission: &Submission) -> ConcordResult<String>;

    /// Descriptive fields stored verbatim alongside the payload.
    fn subject(&self, _submission: &Submission) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}
