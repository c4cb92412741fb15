//! Runtime error types for the Concord pipeline.
//!
//! All fallible operations return `ConcordResult<T>`. Malformed oracle output
//! is deliberately absent from this enum: it is always absorbed by the
//! validator as a fallback payload and never surfaces to callers.

use thiserror::Error;

/// The unified error type for the Concord crates.
#[derive(Debug, Error)]
pub enum ConcordError {
    /// Caller input was missing, too short, too long, or otherwise unusable.
    ///
    /// Always raised before any oracle invocation; no state is mutated.
    #[error("input validation failed: {reason}")]
    InputValidation { reason: String },

    /// The external generator call failed (timeout, transport fault, ...).
    #[error("oracle invocation failed: {reason}")]
    OracleInvocation { reason: String },

    /// Independent executions did not agree on a canonical payload.
    #[error("consensus not reached across {executions} execution(s): {reason}")]
    ConsensusDisagreement { executions: usize, reason: String },

    /// A record already exists under this key.
    #[error("record '{key}' already exists")]
    DuplicateKey { key: String },

    /// No record exists under this key.
    #[error("record '{key}' not found")]
    NotFound { key: String },

    /// The post-consensus policy hook vetoed the agreed payload.
    #[error("policy rejected payload: {reason}")]
    PolicyRejection { reason: String },

    /// Evidence fetching was refused because the host is denylisted.
    #[error("evidence host '{host}' is denied by policy")]
    EvidenceDenied { host: String },

    /// The ledger could not persist a record.
    ///
    /// Treated as fatal: a record that cannot be persisted is not committed.
    #[error("ledger write failed: {reason}")]
    LedgerWriteFailed { reason: String },

    /// A configuration value, template, or schema definition is invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },
}

/// Convenience alias used throughout the Concord crates.
pub type ConcordResult<T> = Result<T, ConcordError>;
