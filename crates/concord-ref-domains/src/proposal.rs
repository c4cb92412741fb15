//! DAO proposal evaluation.
//!
//! The oracle scores a proposal on six rubric dimensions and returns a
//! final score with a verdict. Records are keyed by the proposal text, so
//! evaluating the same text twice returns the stored evaluation without a
//! second oracle round.

use std::collections::BTreeMap;

use serde_json::json;
use tracing::info;

use concord_contracts::{
    consensus::ConsensusMode,
    error::ConcordResult,
    oracle::OracleFailurePolicy,
    payload::CanonicalPayload,
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

pub const PROPOSAL_SCHEMA_ID: &str = "proposal-v1";

pub const MIN_PROPOSAL_CHARS: usize = 20;
pub const MAX_PROPOSAL_CHARS: usize = 50_000;

const NOT_SPECIFIED: &str = "Not specified";
const GENERIC_MISSION: &str = "Generic DAO governance";

const PROPOSAL_PROMPT: &str = include_str!("../prompts/proposal.txt");

/// Rubric dimensions, each scored 0 to 10.
pub const DIMENSIONS: [&str; 6] = ["clarity", "feasibility", "risk", "alignment", "budget", "completeness"];

/// Proposal evaluation schema with the verdict-band rule.
///
/// The fallback scores every dimension 0 and rejects.
pub fn proposal_schema() -> ConcordResult<Schema> {
    let mut fields: Vec<FieldSpec> = DIMENSIONS.iter().map(|d| FieldSpec::integer(*d, 0, 10)).collect();
    fields.push(FieldSpec::integer("final_score", 0, 100));
    fields.push(FieldSpec::one_of("verdict", &["approve", "revise", "reject"]));
    fields.push(FieldSpec::text("summary"));

    let schema = Schema::new(
        PROPOSAL_SCHEMA_ID,
        fields,
        ResponseFormat::Structured,
        json!({
            "clarity": 0,
            "feasibility": 0,
            "risk": 0,
            "alignment": 0,
            "budget": 0,
            "completeness": 0,
            "final_score": 0,
            "verdict": "reject",
            "summary": "Invalid or unparsable model output"
        }),
    )?;
    Ok(schema.with_rule(
        "verdict-band",
        "verdict must match the final score band: approve >= 70, revise 40-69, reject < 40",
        "proposal_verdict_band",
    ))
}

/// The verdict a final score falls into.
pub fn verdict_for(final_score: i64) -> &'static str {
    match final_score {
        s if s >= 70 => "approve",
        s if s >= 40 => "revise",
        _ => "reject",
    }
}

/// Register the proposal schema's custom rules on `validator`.
pub fn register_rules(validator: &mut SchemaValidator) {
    validator.register_rule(
        "proposal_verdict_band",
        Box::new(|payload: &CanonicalPayload| {
            let score = payload.get_i64("final_score")?;
            let verdict = payload.get_str("verdict")?;
            let expected = verdict_for(score);
            (verdict != expected)
                .then(|| format!("final_score {score} requires verdict '{expected}', got '{verdict}'"))
        }),
    );
}

// ── Domain ────────────────────────────────────────────────────────────────────

pub struct ProposalDomain {
    schema: Schema,
    template: PromptTemplate,
}

impl ProposalDomain {
    pub fn new() -> ConcordResult<Self> {
        Ok(Self { schema: proposal_schema()?, template: PromptTemplate::new(PROPOSAL_PROMPT)? })
    }
}

impl Domain for ProposalDomain {
    fn name(&self) -> &str {
        "proposal"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn identifier_strategy(&self) -> IdentifierStrategy {
        IdentifierStrategy::ContentDerived
    }

    fn consensus_mode(&self) -> ConsensusMode {
        ConsensusMode::Strict
    }

    /// A failed call scores as the rejecting fallback instead of aborting.
    fn oracle_failure_policy(&self) -> OracleFailurePolicy {
        OracleFailurePolicy::Fallback
    }

    fn input_rules(&self) -> Vec<InputRule> {
        vec![InputRule::new(InputSource::Primary, "Proposal text")
            .min_chars(MIN_PROPOSAL_CHARS)
            .max_chars(MAX_PROPOSAL_CHARS)]
    }

    fn build_prompt(&self, submission: &Submission) -> ConcordResult<String> {
        let budget = match submission.field("budget") {
            Some("0") | None => "",
            Some(other) => other,
        };
        let fields = PromptFields::new()
            .set("proposal", submission.input.as_str())
            .set_or("budget", budget, NOT_SPECIFIED)
            .set_or("timeline", submission.field("timeline").unwrap_or_default(), NOT_SPECIFIED)
            .set_or("dao_mission", submission.field("dao_mission").unwrap_or_default(), GENERIC_MISSION);
        self.template.render(&fields)
    }

    fn subject(&self, submission: &Submission) -> BTreeMap<String, String> {
        submission
            .fields
            .iter()
            .filter(|(name, _)| matches!(name.as_str(), "budget" | "timeline" | "dao_mission"))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

// ── Runtime ───────────────────────────────────────────────────────────────────

/// Proposal evaluation runtime over its own ledger.
pub struct ProposalEvaluator {
    pipeline: Pipeline,
    ledger: SharedLedger,
}

impl ProposalEvaluator {
    pub fn new(
        oracle: Box<dyn OracleInvoker>,
        ledger: SharedLedger,
        config: &ConcordConfig,
    ) -> ConcordResult<Self> {
        let mut validator = SchemaValidator::new();
        register_rules(&mut validator);
        let pipeline = Wiring::new(validator).build(Box::new(ProposalDomain::new()?), oracle, config)?;
        Ok(Self { pipeline, ledger })
    }

    /// Evaluate a proposal, or return the stored evaluation of the same text.
    ///
    /// A `budget` of 0 and a blank `timeline` are shown to the oracle as
    /// "Not specified"; a blank `dao_mission` as "Generic DAO governance".
    pub fn submit(
        &self,
        proposal_text: &str,
        budget: u64,
        timeline: &str,
        dao_mission: &str,
    ) -> ConcordResult<Record> {
        let submission = Submission::new(proposal_text)
            .with_field("budget", budget.to_string())
            .with_field("timeline", timeline)
            .with_field("dao_mission", dao_mission);
        let record = self.pipeline.submit(self.ledger.as_ref(), &submission)?;
        info!(
            key = %record.key,
            verdict = record.payload.get_str("verdict").unwrap_or("?"),
            final_score = record.payload.get_i64("final_score").unwrap_or_default(),
            "proposal evaluated"
        );
        Ok(record)
    }

    /// The stored evaluation of `proposal_text`, or `NotFound`.
    pub fn evaluation(&self, proposal_text: &str) -> ConcordResult<Record> {
        let key = self.key_for(proposal_text)?;
        self.evaluation_by_key(&key)
    }

    pub fn evaluation_by_key(&self, key: &RecordKey) -> ConcordResult<Record> {
        self.pipeline.get(self.ledger.as_ref(), key)
    }

    pub fn key_for(&self, proposal_text: &str) -> ConcordResult<RecordKey> {
        self.pipeline.key_for(&Submission::new(proposal_text))
    }

    pub fn exists(&self, key: &RecordKey) -> ConcordResult<bool> {
        self.pipeline.exists(self.ledger.as_ref(), key)
    }

    pub fn list_keys(&self) -> ConcordResult<Vec<RecordKey>> {
        self.pipeline.list_keys(self.ledger.as_ref())
    }
}
