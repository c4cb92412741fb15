//! The Concord pipeline: the deterministic submit-to-commit runner.
//!
//! Every submission follows the same order:
//!
//!   Input check → Key → Lookup → Prompt → Consensus → Policy → Ledger
//!
//! Nothing is written unless the input passed, the independent executions
//! agreed, and the policy hook allowed the agreed payload. Every abort leaves
//! the ledger exactly as it was.

use tracing::{debug, info, warn};

use concord_contracts::{
    consensus::ConsensusMode,
    error::{ConcordError, ConcordResult},
    policy::PolicyVerdict,
    record::{Record, RecordDraft, RecordKey},
    submission::{IdentifierStrategy, Submission},
};

use crate::{
    addressor::content_key,
    consensus::{ConsensusGate, ExecutionPlan},
    sanitize::Sanitizer,
    traits::{Domain, Ledger, OracleInvoker, PolicyHook, Validator},
};

/// Executions per submission unless overridden with `with_gate`.
pub const DEFAULT_EXECUTIONS: usize = 3;

/// One domain wired to its untrusted oracle and trusted checkers.
///
/// The pipeline holds no record state; the ledger is passed into every call
/// so the same pipeline can serve any number of ledgers.
pub struct Pipeline {
    domain: Box<dyn Domain>,
    oracle: Box<dyn OracleInvoker>,
    validator: Box<dyn Validator>,
    sanitizer: Sanitizer,
    policy: Option<Box<dyn PolicyHook>>,
    gate: ConsensusGate,
}

impl Pipeline {
    /// Wire `domain` to its oracle and validator.
    ///
    /// The gate uses the domain's consensus mode with `DEFAULT_EXECUTIONS`.
    /// Returns `ConfigError` if a comparative mode judges a field the
    /// domain's schema does not declare.
    pub fn new(
        domain: Box<dyn Domain>,
        oracle: Box<dyn OracleInvoker>,
        validator: Box<dyn Validator>,
    ) -> ConcordResult<Self> {
        let gate = ConsensusGate::new(domain.consensus_mode(), DEFAULT_EXECUTIONS)?;
        check_judged_fields(domain.as_ref(), &gate)?;
        Ok(Self { domain, oracle, validator, sanitizer: Sanitizer::new(), policy: None, gate })
    }

    pub fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn with_policy_hook(mut self, hook: Box<dyn PolicyHook>) -> Self {
        self.policy = Some(hook);
        self
    }

    /// Replace the consensus gate.
    ///
    /// The gate must use the mode the domain declares; anything else is a
    /// `ConfigError`.
    pub fn with_gate(mut self, gate: ConsensusGate) -> ConcordResult<Self> {
        let declared = self.domain.consensus_mode();
        if gate.mode() != &declared {
            return Err(ConcordError::ConfigError {
                reason: format!(
                    "'{}' declares {:?} consensus, gate uses {:?}",
                    self.domain.name(),
                    declared,
                    gate.mode()
                ),
            });
        }
        check_judged_fields(self.domain.as_ref(), &gate)?;
        self.gate = gate;
        Ok(self)
    }

    /// Use the domain's own consensus mode with `executions` runs.
    pub fn with_executions(self, executions: usize) -> ConcordResult<Self> {
        let gate = ConsensusGate::new(self.domain.consensus_mode(), executions)?;
        self.with_gate(gate)
    }

    pub fn domain(&self) -> &dyn Domain {
        self.domain.as_ref()
    }

    pub fn gate(&self) -> &ConsensusGate {
        &self.gate
    }

    /// The ledger key this submission maps to.
    ///
    /// Content-derived domains hash the primary input exactly as given.
    /// Caller-supplied domains require a non-blank `caller_key`.
    pub fn key_for(&self, submission: &Submission) -> ConcordResult<RecordKey> {
        match self.domain.identifier_strategy() {
            IdentifierStrategy::ContentDerived => Ok(content_key(&submission.input)),
            IdentifierStrategy::CallerSupplied => match submission.caller_key.as_deref() {
                Some(key) if !key.trim().is_empty() => Ok(RecordKey::new(key)),
                _ => Err(ConcordError::InputValidation {
                    reason: format!("{} requires a caller-supplied identifier", self.domain.name()),
                }),
            },
        }
    }

    /// Run a submission through the full pipeline and return its record.
    ///
    /// # Errors
    ///
    /// - `InputValidation`: a rule failed; no oracle call was made
    /// - `DuplicateKey`: caller-supplied key already committed; no oracle call
    /// - `OracleInvocation`: oracle failed under an `Abort` policy
    /// - `ConsensusDisagreement`: executions disagreed
    /// - `PolicyRejection`: the hook vetoed the agreed payload
    /// - `LedgerWriteFailed`: the ledger could not persist the record
    ///
    /// A content-derived repeat is not an error: the stored record is
    /// returned and the oracle is not invoked.
    pub fn submit(&self, ledger: &dyn Ledger, submission: &Submission) -> ConcordResult<Record> {
        let domain = self.domain.name();

        // ── Step 1: Input checks ─────────────────────────────────────────────
        self.domain.validate_input(submission)?;
        let key = self.key_for(submission)?;

        debug!(domain = %domain, key = %key, "submission accepted");

        // ── Step 2: Existing record ──────────────────────────────────────────
        if ledger.exists(&key)? {
            return match self.domain.identifier_strategy() {
                IdentifierStrategy::ContentDerived => {
                    info!(domain = %domain, key = %key, "cache hit, returning stored record");
                    ledger.get(&key)
                }
                IdentifierStrategy::CallerSupplied => {
                    warn!(domain = %domain, key = %key, "identifier already committed");
                    Err(ConcordError::DuplicateKey { key: key.to_string() })
                }
            };
        }

        // ── Step 3: Prompt ───────────────────────────────────────────────────
        let prompt = self.domain.build_prompt(submission)?;
        let schema = self.domain.schema();

        // ── Step 4: Independent executions and agreement ─────────────────────
        let plan = ExecutionPlan {
            prompt: &prompt,
            schema,
            sanitizer: &self.sanitizer,
            validator: self.validator.as_ref(),
            failure_policy: self.domain.oracle_failure_policy(),
        };
        let agreed = self.gate.run(&plan, self.oracle.as_ref())?.into_agreed().map_err(|err| {
            warn!(domain = %domain, key = %key, error = %err, "consensus not reached");
            err
        })?;

        // ── Step 5: Policy hook ──────────────────────────────────────────────
        if let Some(policy) = &self.policy {
            if let PolicyVerdict::Veto { reason } = policy.review(schema.schema_id(), &agreed.payload)? {
                warn!(domain = %domain, key = %key, reason = %reason, "policy vetoed payload");
                return Err(ConcordError::PolicyRejection { reason });
            }
        }

        // ── Step 6: Commit ───────────────────────────────────────────────────
        let draft = RecordDraft {
            key: key.clone(),
            schema_id: schema.schema_id().to_string(),
            payload: agreed.payload,
            origin: agreed.origin,
            subject: self.domain.subject(submission),
        };

        match ledger.put(draft) {
            Ok(record) => {
                info!(
                    domain = %domain,
                    key = %record.key,
                    sequence = record.sequence,
                    origin = record.origin.as_str(),
                    "record committed"
                );
                Ok(record)
            }
            // Another caller committed the same content first.
            Err(ConcordError::DuplicateKey { .. })
                if self.domain.identifier_strategy() == IdentifierStrategy::ContentDerived =>
            {
                debug!(domain = %domain, key = %key, "lost commit race, returning stored record");
                ledger.get(&key)
            }
            Err(err) => Err(err),
        }
    }

    pub fn get(&self, ledger: &dyn Ledger, key: &RecordKey) -> ConcordResult<Record> {
        ledger.get(key)
    }

    pub fn exists(&self, ledger: &dyn Ledger, key: &RecordKey) -> ConcordResult<bool> {
        ledger.exists(key)
    }

    pub fn list_keys(&self, ledger: &dyn Ledger) -> ConcordResult<Vec<RecordKey>> {
        ledger.list_keys()
    }
}

fn check_judged_fields(domain: &dyn Domain, gate: &ConsensusGate) -> ConcordResult<()> {
    if let ConsensusMode::Comparative { fields } = gate.mode() {
        let schema = domain.schema();
        if let Some(missing) = fields.iter().find(|f| schema.field(f).is_none()) {
            return Err(ConcordError::ConfigError {
                reason: format!(
                    "consensus for '{}' judges '{missing}', which schema '{}' does not declare",
                    domain.name(),
                    schema.schema_id()
                ),
            });
        }
    }
    Ok(())
}
