//! The consensus gate: independent executions must agree before commit.
//!
//! One execution is the sequence
//!
//!   OracleInvoker::invoke → Sanitizer::sanitize → Validator::validate
//!
//! and yields a canonical payload (validated or fallback). The gate compares
//! the payloads of N executions:
//!
//! - **Strict**: all N canonical serializations must be byte-identical.
//! - **Comparative**: only the projection onto the judged fields must be
//!   byte-identical; the first execution's full payload is selected.
//!
//! In a replicated deployment each validating party performs one execution
//! and the host hands the N results to `decide`. In a single process, `run`
//! performs N sequential executions against one oracle and `run_replicated`
//! performs one execution per supplied oracle.

use tracing::{debug, warn};

use concord_contracts::{
    consensus::{ConsensusMode, ConsensusOutcome, Execution},
    error::{ConcordError, ConcordResult},
    oracle::OracleFailurePolicy,
    schema::{Schema, Validation},
};

use crate::{
    sanitize::Sanitizer,
    traits::{OracleInvoker, Validator},
};

/// Everything one execution needs apart from the oracle itself.
pub struct ExecutionPlan<'a> {
    pub prompt: &'a str,
    pub schema: &'a Schema,
    pub sanitizer: &'a Sanitizer,
    pub validator: &'a dyn Validator,
    pub failure_policy: OracleFailurePolicy,
}

impl ExecutionPlan<'_> {
    /// Run one independent execution against `oracle`.
    ///
    /// An oracle failure either propagates (`Abort`) or becomes the schema
    /// fallback (`Fallback`). Malformed output always becomes the fallback.
    pub fn execute_once(&self, oracle: &dyn OracleInvoker) -> ConcordResult<Execution> {
        let format = self.schema.response_format().output_format();

        let raw = match oracle.invoke(self.prompt, format) {
            Ok(raw) => raw,
            Err(err) => match self.failure_policy {
                OracleFailurePolicy::Abort => {
                    warn!(schema_id = %self.schema.schema_id(), error = %err, "oracle failed, aborting");
                    return Err(err);
                }
                OracleFailurePolicy::Fallback => {
                    warn!(
                        schema_id = %self.schema.schema_id(),
                        error = %err,
                        "oracle failed, substituting fallback"
                    );
                    return Ok(Validation::fallback(self.schema, err.to_string()).into());
                }
            },
        };

        let cleaned = self.sanitizer.sanitize(&raw);
        let validation = self.validator.validate(&cleaned, self.schema);
        if let Validation::Fallback { reason, .. } = &validation {
            debug!(schema_id = %self.schema.schema_id(), %reason, "response replaced by fallback");
        }
        Ok(validation.into())
    }
}

/// Compares independent executions and decides whether they agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusGate {
    mode: ConsensusMode,
    executions: usize,
}

impl ConsensusGate {
    /// Create a gate requiring `executions` agreeing runs.
    ///
    /// Returns `ConfigError` when `executions` is zero or a comparative mode
    /// judges no fields.
    pub fn new(mode: ConsensusMode, executions: usize) -> ConcordResult<Self> {
        if executions == 0 {
            return Err(ConcordError::ConfigError {
                reason: "consensus requires at least one execution".to_string(),
            });
        }
        if let ConsensusMode::Comparative { fields } = &mode {
            if fields.is_empty() {
                return Err(ConcordError::ConfigError {
                    reason: "comparative consensus must judge at least one field".to_string(),
                });
            }
        }
        Ok(Self { mode, executions })
    }

    pub fn mode(&self) -> &ConsensusMode {
        &self.mode
    }

    pub fn executions(&self) -> usize {
        self.executions
    }

    /// Perform `executions` sequential runs against one oracle and decide.
    ///
    /// Stops at the first aborting oracle failure; nothing is decided then.
    pub fn run(&self, plan: &ExecutionPlan<'_>, oracle: &dyn OracleInvoker) -> ConcordResult<ConsensusOutcome> {
        let mut results = Vec::with_capacity(self.executions);
        for index in 0..self.executions {
            debug!(index, total = self.executions, "starting execution");
            results.push(plan.execute_once(oracle)?);
        }
        Ok(self.decide(results))
    }

    /// Perform one run per oracle (one per validating party) and decide.
    pub fn run_replicated(
        &self,
        plan: &ExecutionPlan<'_>,
        oracles: &[&dyn OracleInvoker],
    ) -> ConcordResult<ConsensusOutcome> {
        if oracles.is_empty() {
            return Err(ConcordError::ConfigError {
                reason: "replicated consensus requires at least one oracle".to_string(),
            });
        }
        let results = oracles
            .iter()
            .map(|oracle| plan.execute_once(*oracle))
            .collect::<ConcordResult<Vec<_>>>()?;
        Ok(self.decide(results))
    }

    /// The pure agreement check over already-independent results.
    pub fn decide(&self, executions: Vec<Execution>) -> ConsensusOutcome {
        let compared: Vec<String> = executions
            .iter()
            .map(|e| match &self.mode {
                ConsensusMode::Strict => e.payload.as_str().to_string(),
                ConsensusMode::Comparative { fields } => e.payload.project(fields).as_str().to_string(),
            })
            .collect();

        let mut distinct: Vec<&str> = Vec::new();
        for candidate in &compared {
            if !distinct.contains(&candidate.as_str()) {
                distinct.push(candidate);
            }
        }

        let agreed = distinct.len() == 1;
        let distinct_candidates = distinct.len();
        if agreed {
            debug!(executions = executions.len(), "executions agree");
        } else {
            warn!(
                executions = executions.len(),
                distinct_candidates,
                "executions disagree"
            );
        }

        ConsensusOutcome {
            agreed_payload: if agreed { executions.first().cloned() } else { None },
            agreed,
            executions,
            distinct_candidates,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::{json, Value};

    use concord_contracts::{
        consensus::{ConsensusMode, Execution},
        error::{ConcordError, ConcordResult},
        oracle::{OracleFailurePolicy, OutputFormat},
        payload::CanonicalPayload,
        record::PayloadOrigin,
        schema::{FieldSpec, ResponseFormat, Schema, Validation},
    };

    use super::{ConsensusGate, ExecutionPlan};
    use crate::{
        sanitize::Sanitizer,
        traits::{OracleInvoker, Validator},
    };

    // ── Mock helpers ─────────────────────────────────────────────────────────

    fn schema() -> Schema {
        Schema::new(
            "vibe-v1",
            vec![FieldSpec::one_of("status", &["PASS", "FAIL"]), FieldSpec::text("reasoning")],
            ResponseFormat::Structured,
            json!({ "status": "FAIL", "reasoning": "fallback" }),
        )
        .unwrap()
    }

    fn execution(value: Value) -> Execution {
        Execution {
            payload: CanonicalPayload::from_value(value).unwrap(),
            origin: PayloadOrigin::Validated,
        }
    }

    /// Returns scripted responses in order, cycling on the last one.
    struct ScriptedOracle {
        responses: Vec<ConcordResult<String>>,
        calls: Arc<Mutex<usize>>,
    }

    impl ScriptedOracle {
        fn new(responses: Vec<ConcordResult<String>>) -> Self {
            Self { responses, calls: Arc::new(Mutex::new(0)) }
        }
    }

    impl OracleInvoker for ScriptedOracle {
        fn invoke(&self, _prompt: &str, _format: OutputFormat) -> ConcordResult<String> {
            let mut calls = self.calls.lock().unwrap();
            let idx = (*calls).min(self.responses.len() - 1);
            *calls += 1;
            match &self.responses[idx] {
                Ok(text) => Ok(text.clone()),
                Err(_) => Err(ConcordError::OracleInvocation { reason: "timeout".to_string() }),
            }
        }
    }

    /// Parses JSON and conforms it to the schema; anything else falls back.
    struct ConformingValidator;

    impl Validator for ConformingValidator {
        fn validate(&self, cleaned: &str, schema: &Schema) -> Validation {
            match serde_json::from_str::<Value>(cleaned) {
                Ok(Value::Object(object)) => match schema.conform(&object) {
                    Ok(payload) => Validation::Validated(payload),
                    Err(reason) => Validation::fallback(schema, reason),
                },
                _ => Validation::fallback(schema, "not a JSON object"),
            }
        }
    }

    fn plan<'a>(
        prompt: &'a str,
        schema: &'a Schema,
        sanitizer: &'a Sanitizer,
        policy: OracleFailurePolicy,
    ) -> ExecutionPlan<'a> {
        ExecutionPlan { prompt, schema, sanitizer, validator: &ConformingValidator, failure_policy: policy }
    }

    // ── decide ───────────────────────────────────────────────────────────────

    #[test]
    fn strict_agreement_requires_identical_payloads() {
        let gate = ConsensusGate::new(ConsensusMode::Strict, 3).unwrap();
        let same = json!({ "status": "PASS", "reasoning": "kind" });
        let outcome = gate.decide(vec![execution(same.clone()), execution(same.clone()), execution(same)]);
        assert!(outcome.agreed);
        assert_eq!(outcome.distinct_candidates, 1);
        assert!(outcome.agreed_payload.is_some());
    }

    #[test]
    fn strict_mode_rejects_divergent_phrasing() {
        let gate = ConsensusGate::new(ConsensusMode::Strict, 2).unwrap();
        let outcome = gate.decide(vec![
            execution(json!({ "status": "PASS", "reasoning": "kind" })),
            execution(json!({ "status": "PASS", "reasoning": "friendly" })),
        ]);
        assert!(!outcome.agreed);
        assert_eq!(outcome.distinct_candidates, 2);
        assert!(matches!(outcome.into_agreed(), Err(ConcordError::ConsensusDisagreement { .. })));
    }

    #[test]
    fn comparative_mode_ignores_unjudged_fields_and_picks_first() {
        let gate = ConsensusGate::new(
            ConsensusMode::Comparative { fields: vec!["status".to_string()] },
            2,
        )
        .unwrap();
        let outcome = gate.decide(vec![
            execution(json!({ "status": "PASS", "reasoning": "kind" })),
            execution(json!({ "status": "PASS", "reasoning": "friendly" })),
        ]);
        let agreed = outcome.into_agreed().unwrap();
        assert_eq!(agreed.payload.get_str("reasoning"), Some("kind"));
    }

    #[test]
    fn comparative_mode_rejects_divergent_verdicts() {
        let gate = ConsensusGate::new(
            ConsensusMode::Comparative { fields: vec!["status".to_string()] },
            2,
        )
        .unwrap();
        let outcome = gate.decide(vec![
            execution(json!({ "status": "PASS", "reasoning": "same" })),
            execution(json!({ "status": "FAIL", "reasoning": "same" })),
        ]);
        assert!(!outcome.agreed);
    }

    #[test]
    fn empty_execution_set_never_agrees() {
        let gate = ConsensusGate::new(ConsensusMode::Strict, 1).unwrap();
        let outcome = gate.decide(vec![]);
        assert!(!outcome.agreed);
        assert_eq!(outcome.distinct_candidates, 0);
    }

    #[test]
    fn invalid_gate_configurations_are_rejected() {
        assert!(ConsensusGate::new(ConsensusMode::Strict, 0).is_err());
        assert!(ConsensusGate::new(ConsensusMode::Comparative { fields: vec![] }, 2).is_err());
    }

    // ── run / run_replicated ─────────────────────────────────────────────────

    #[test]
    fn run_invokes_oracle_once_per_execution() {
        let schema = schema();
        let sanitizer = Sanitizer::new();
        let oracle = ScriptedOracle::new(vec![Ok("```json\n{\"status\":\"PASS\",\"reasoning\":\"kind\"}\n```".into())]);
        let calls = oracle.calls.clone();
        let gate = ConsensusGate::new(ConsensusMode::Strict, 3).unwrap();

        let outcome = gate
            .run(&plan("prompt", &schema, &sanitizer, OracleFailurePolicy::Abort), &oracle)
            .unwrap();

        assert_eq!(*calls.lock().unwrap(), 3);
        assert_eq!(outcome.executions.len(), 3);
        assert!(outcome.agreed);
    }

    #[test]
    fn run_detects_divergent_oracle_output() {
        let schema = schema();
        let sanitizer = Sanitizer::new();
        let oracle = ScriptedOracle::new(vec![
            Ok(r#"{"status":"PASS","reasoning":"kind"}"#.into()),
            Ok(r#"{"status":"FAIL","reasoning":"rude"}"#.into()),
        ]);
        let gate = ConsensusGate::new(ConsensusMode::Strict, 2).unwrap();

        let outcome = gate
            .run(&plan("prompt", &schema, &sanitizer, OracleFailurePolicy::Abort), &oracle)
            .unwrap();
        assert!(!outcome.agreed);
    }

    #[test]
    fn all_malformed_outputs_agree_on_fallback() {
        let schema = schema();
        let sanitizer = Sanitizer::new();
        let oracle = ScriptedOracle::new(vec![Ok("not json".into()), Ok("{\"status\": 3}".into())]);
        let gate = ConsensusGate::new(ConsensusMode::Strict, 2).unwrap();

        let agreed = gate
            .run(&plan("prompt", &schema, &sanitizer, OracleFailurePolicy::Abort), &oracle)
            .unwrap()
            .into_agreed()
            .unwrap();
        assert_eq!(agreed.origin, PayloadOrigin::Fallback);
        assert_eq!(&agreed.payload, schema.fallback());
    }

    #[test]
    fn oracle_failure_aborts_under_abort_policy() {
        let schema = schema();
        let sanitizer = Sanitizer::new();
        let oracle = ScriptedOracle::new(vec![Err(ConcordError::OracleInvocation { reason: "x".into() })]);
        let gate = ConsensusGate::new(ConsensusMode::Strict, 2).unwrap();

        let result = gate.run(&plan("prompt", &schema, &sanitizer, OracleFailurePolicy::Abort), &oracle);
        assert!(matches!(result, Err(ConcordError::OracleInvocation { .. })));
        assert_eq!(*oracle.calls.lock().unwrap(), 1, "must stop at the first failure");
    }

    #[test]
    fn oracle_failure_becomes_fallback_under_fallback_policy() {
        let schema = schema();
        let sanitizer = Sanitizer::new();
        let oracle = ScriptedOracle::new(vec![Err(ConcordError::OracleInvocation { reason: "x".into() })]);
        let gate = ConsensusGate::new(ConsensusMode::Strict, 2).unwrap();

        let agreed = gate
            .run(&plan("prompt", &schema, &sanitizer, OracleFailurePolicy::Fallback), &oracle)
            .unwrap()
            .into_agreed()
            .unwrap();
        assert_eq!(agreed.origin, PayloadOrigin::Fallback);
    }

    #[test]
    fn run_replicated_uses_one_execution_per_party() {
        let schema = schema();
        let sanitizer = Sanitizer::new();
        let a = ScriptedOracle::new(vec![Ok(r#"{"status":"PASS","reasoning":"a"}"#.into())]);
        let b = ScriptedOracle::new(vec![Ok(r#"{"reasoning":"a","status":"PASS"}"#.into())]);
        let gate = ConsensusGate::new(ConsensusMode::Strict, 5).unwrap();

        let outcome = gate
            .run_replicated(
                &plan("prompt", &schema, &sanitizer, OracleFailurePolicy::Abort),
                &[&a, &b],
            )
            .unwrap();

        assert_eq!(outcome.executions.len(), 2);
        assert!(outcome.agreed, "key order must not matter");
        assert_eq!(*a.calls.lock().unwrap(), 1);
        assert_eq!(*b.calls.lock().unwrap(), 1);
    }
}
