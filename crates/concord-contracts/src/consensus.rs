//! Consensus modes and outcomes.

use serde::{Deserialize, Serialize};

use crate::{
    error::{ConcordError, ConcordResult},
    payload::CanonicalPayload,
    record::PayloadOrigin,
    schema::Validation,
};

/// How independent executions must agree before a payload may be committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ConsensusMode {
    /// Every canonical payload must be byte-identical.
    Strict,

    /// Only the named fields must agree; the first execution's full payload
    /// is chosen as canonical.
    ///
    /// Used where free-text fields (reasoning, summaries) are expected to
    /// vary in phrasing while the verdict must not.
    Comparative { fields: Vec<String> },
}

/// The canonical result of one independent execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    pub payload: CanonicalPayload,
    pub origin: PayloadOrigin,
}

/// The result of running the agreement check over N executions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusOutcome {
    /// Every execution, in execution order.
    pub executions: Vec<Execution>,
    /// True only if all compared candidates are identical.
    pub agreed: bool,
    /// The payload selected for commit. Present iff `agreed`.
    pub agreed_payload: Option<Execution>,
    /// Number of distinct compared candidates (1 on agreement).
    pub distinct_candidates: usize,
}

impl ConsensusOutcome {
    /// Unwrap the agreed execution, or fail with `ConsensusDisagreement`.
    pub fn into_agreed(self) -> ConcordResult<Execution> {
        let executions = self.executions.len();
        match self.agreed_payload {
            Some(agreed) if self.agreed => Ok(agreed),
            _ => Err(ConcordError::ConsensusDisagreement {
                executions,
                reason: format!(
                    "{} distinct candidate(s) among {} execution(s)",
                    self.distinct_candidates, executions
                ),
            }),
        }
    }
}

impl From<Validation> for Execution {
    fn from(validation: Validation) -> Self {
        match validation {
            Validation::Validated(payload) => Execution { payload, origin: PayloadOrigin::Validated },
            Validation::Fallback { payload, .. } => Execution { payload, origin: PayloadOrigin::Fallback },
        }
    }
}
