//! Two-party dispute arbitration.
//!
//! Disputes are filed under a caller-chosen id. An id can be ruled on once:
//! filing it again fails with `DuplicateKey` before the oracle is asked.

use std::collections::BTreeMap;

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

pub const ARBITRATION_SCHEMA_ID: &str = "arbitration-v1";

pub const MIN_ARGUMENT_CHARS: usize = 20;
pub const MAX_ARGUMENT_CHARS: usize = 10_000;

const GENERAL_CONTEXT: &str = "General dispute resolution";

const ARBITRATION_PROMPT: &str = include_str!("../prompts/arbitration.txt");

pub fn arbitration_schema() -> ConcordResult<Schema> {
    Schema::new(
        ARBITRATION_SCHEMA_ID,
        vec![
            FieldSpec::one_of("winner", &["party_a", "party_b", "split"]),
            FieldSpec::one_of("confidence", &["high", "medium", "low", "split"]),
            FieldSpec::integer("party_a_score", 0, 40),
            FieldSpec::integer("party_b_score", 0, 40),
            FieldSpec::text("reasoning"),
            FieldSpec::text_list("key_factors"),
        ],
        ResponseFormat::Structured,
        json!({
            "winner": "split",
            "confidence": "split",
            "party_a_score": 0,
            "party_b_score": 0,
            "reasoning": "Invalid or unparsable model output",
            "key_factors": []
        }),
    )
}

/// A dispute as filed by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisputeFiling {
    pub dispute_id: String,
    pub party_a_name: String,
    pub party_a_argument: String,
    pub party_b_name: String,
    pub party_b_argument: String,
    /// Background for the arbitrator. Blank means general resolution.
    pub context: String,
}

impl DisputeFiling {
    fn to_submission(&self) -> Submission {
        Submission::new(self.context.as_str())
            .with_caller_key(self.dispute_id.as_str())
            .with_field("party_a_name", self.party_a_name.as_str())
            .with_field("party_a_argument", self.party_a_argument.as_str())
            .with_field("party_b_name", self.party_b_name.as_str())
            .with_field("party_b_argument", self.party_b_argument.as_str())
    }
}

// ── Domain ────────────────────────────────────────────────────────────────────

pub struct ArbitrationDomain {
    schema: Schema,
    template: PromptTemplate,
}

impl ArbitrationDomain {
    pub fn new() -> ConcordResult<Self> {
        Ok(Self { schema: arbitration_schema()?, template: PromptTemplate::new(ARBITRATION_PROMPT)? })
    }
}

fn field(name: &str) -> InputSource {
    InputSource::Field(name.to_string())
}

impl Domain for ArbitrationDomain {
    fn name(&self) -> &str {
        "dispute"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn identifier_strategy(&self) -> IdentifierStrategy {
        IdentifierStrategy::CallerSupplied
    }

    fn consensus_mode(&self) -> ConsensusMode {
        ConsensusMode::Strict
    }

    fn oracle_failure_policy(&self) -> OracleFailurePolicy {
        OracleFailurePolicy::Abort
    }

    fn input_rules(&self) -> Vec<InputRule> {
        vec![
            InputRule::new(InputSource::CallerKey, "Dispute ID"),
            InputRule::new(field("party_a_name"), "Party A name"),
            InputRule::new(field("party_b_name"), "Party B name"),
            InputRule::new(field("party_a_argument"), "Party A argument")
                .min_chars(MIN_ARGUMENT_CHARS)
                .max_chars(MAX_ARGUMENT_CHARS),
            InputRule::new(field("party_b_argument"), "Party B argument")
                .min_chars(MIN_ARGUMENT_CHARS)
                .max_chars(MAX_ARGUMENT_CHARS),
        ]
    }

    fn build_prompt(&self, submission: &Submission) -> ConcordResult<String> {
        let get = |name: &str| submission.field(name).unwrap_or_default();
        let fields = PromptFields::new()
            .set("dispute_id", submission.caller_key.as_deref().unwrap_or_default())
            .set_or("context", &submission.input, GENERAL_CONTEXT)
            .set("party_a_name", get("party_a_name"))
            .set("party_a_argument", get("party_a_argument"))
            .set("party_b_name", get("party_b_name"))
            .set("party_b_argument", get("party_b_argument"));
        self.template.render(&fields)
    }

    fn subject(&self, submission: &Submission) -> BTreeMap<String, String> {
        let mut subject = BTreeMap::new();
        if let Some(id) = &submission.caller_key {
            subject.insert("dispute_id".to_string(), id.clone());
        }
        for name in ["party_a_name", "party_b_name"] {
            if let Some(value) = submission.field(name) {
                subject.insert(name.to_string(), value.to_string());
            }
        }
        subject
    }
}

// ── Runtime ───────────────────────────────────────────────────────────────────

/// Dispute arbitration runtime over its own ledger.
pub struct DisputeResolver {
    pipeline: Pipeline,
    ledger: SharedLedger,
}

impl DisputeResolver {
    pub fn new(
        oracle: Box<dyn OracleInvoker>,
        ledger: SharedLedger,
        config: &ConcordConfig,
    ) -> ConcordResult<Self> {
        let pipeline =
            Wiring::new(SchemaValidator::new()).build(Box::new(ArbitrationDomain::new()?), oracle, config)?;
        Ok(Self { pipeline, ledger })
    }

    /// Arbitrate `dispute` and record the ruling under its id.
    pub fn submit(&self, dispute: &DisputeFiling) -> ConcordResult<Record> {
        let record = self.pipeline.submit(self.ledger.as_ref(), &dispute.to_submission())?;
        info!(
            dispute_id = %record.key,
            winner = record.payload.get_str("winner").unwrap_or("?"),
            "dispute ruled"
        );
        Ok(record)
    }

    /// The ruling recorded for `dispute_id`, or `NotFound`.
    pub fn ruling(&self, dispute_id: &str) -> ConcordResult<Record> {
        self.pipeline.get(self.ledger.as_ref(), &RecordKey::new(dispute_id))
    }

    pub fn exists(&self, dispute_id: &str) -> ConcordResult<bool> {
        self.pipeline.exists(self.ledger.as_ref(), &RecordKey::new(dispute_id))
    }

    /// Every ruled dispute id, in key order.
    pub fn list_keys(&self) -> ConcordResult<Vec<RecordKey>> {
        self.pipeline.list_keys(self.ledger.as_ref())
    }
}
