//! Vibe check: is a statement positive and genuine, or toxic?
//!
//! Executions are compared on `vibe_status` only. A failed oracle call
//! counts as the `FAIL` fallback instead of aborting the check.

use serde_json::json;
use tracing::info;

use concord_contracts::{
    consensus::ConsensusMode,
    error::ConcordResult,
    oracle::OracleFailurePolicy,
    record::{Record, RecordKey},
    schema::{FieldSpec, ResponseFormat, Schema},
    submission::{IdentifierStrategy, InputRule, InputSource, Submission},
};
use concord_core::{
    traits::{Domain, OracleInvoker},
    Pipeline, PromptFields, PromptTemplate,
};
use concord_policy::ConcordConfig;
use concord_verify::SchemaValidator;

use crate::runtime::{SharedLedger, Wiring};

pub const VIBE_SCHEMA_ID: &str = "vibe-v1";

const VIBE_PROMPT: &str = include_str!("../prompts/vibe.txt");

pub fn vibe_schema() -> ConcordResult<Schema> {
    Schema::new(
        VIBE_SCHEMA_ID,
        vec![
            FieldSpec::one_of("vibe_status", &["PASS", "FAIL"]),
            FieldSpec::integer("vibe_score", 0, 10),
            FieldSpec::text("reasoning"),
        ],
        ResponseFormat::Structured,
        json!({
            "vibe_status": "FAIL",
            "vibe_score": 0,
            "reasoning": "Invalid or unparsable model output"
        }),
    )
}

pub struct VibeDomain {
    schema: Schema,
    template: PromptTemplate,
}

impl VibeDomain {
    pub fn new() -> ConcordResult<Self> {
        Ok(Self { schema: vibe_schema()?, template: PromptTemplate::new(VIBE_PROMPT)? })
    }
}

impl Domain for VibeDomain {
    fn name(&self) -> &str {
        "vibe"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn identifier_strategy(&self) -> IdentifierStrategy {
        IdentifierStrategy::ContentDerived
    }

    fn consensus_mode(&self) -> ConsensusMode {
        ConsensusMode::Comparative { fields: vec!["vibe_status".to_string()] }
    }

    fn oracle_failure_policy(&self) -> OracleFailurePolicy {
        OracleFailurePolicy::Fallback
    }

    fn input_rules(&self) -> Vec<InputRule> {
        vec![InputRule::new(InputSource::Primary, "Statement")]
    }

    fn build_prompt(&self, submission: &Submission) -> ConcordResult<String> {
        self.template.render(&PromptFields::new().set("statement", submission.input.as_str()))
    }
}

/// Vibe check runtime over its own ledger.
pub struct VibeCheck {
    pipeline: Pipeline,
    ledger: SharedLedger,
}

impl VibeCheck {
    pub fn new(
        oracle: Box<dyn OracleInvoker>,
        ledger: SharedLedger,
        config: &ConcordConfig,
    ) -> ConcordResult<Self> {
        let pipeline = Wiring::new(SchemaValidator::new()).build(Box::new(VibeDomain::new()?), oracle, config)?;
        Ok(Self { pipeline, ledger })
    }

    /// Check `statement`; repeats return the stored verdict.
    pub fn check(&self, statement: &str) -> ConcordResult<Record> {
        let record = self.pipeline.submit(self.ledger.as_ref(), &Submission::new(statement))?;
        info!(
            key = %record.key,
            vibe_status = record.payload.get_str("vibe_status").unwrap_or("?"),
            "vibe checked"
        );
        Ok(record)
    }

    pub fn get(&self, key: &RecordKey) -> ConcordResult<Record> {
        self.pipeline.get(self.ledger.as_ref(), key)
    }

    pub fn list_keys(&self) -> ConcordResult<Vec<RecordKey>> {
        self.pipeline.list_keys(self.ledger.as_ref())
    }
}
