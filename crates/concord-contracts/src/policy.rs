//! Post-consensus policy verdicts.
//!
//! A policy hook sees a payload only after independent executions agreed on
//! it, and may veto the commit. A veto is terminal: the ledger is untouched.

use serde::{Deserialize, Serialize};

/// The decision a policy hook returns for an agreed payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyVerdict {
    /// The payload may be committed.
    Allow,

    /// The payload must not be committed.
    Veto {
        /// Human-readable explanation, surfaced in `PolicyRejection`.
        reason: String,
    },
}
