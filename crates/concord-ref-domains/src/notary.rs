//! Claim notarization against web or pasted evidence.
//!
//! A claim is checked against the text of a source page, or against
//! evidence the caller pastes in. Executions are compared on `status`
//! alone, since independent runs rarely word their reasoning the same way.
//!
//! Source URLs pass the host denylist before any page is fetched, and page
//! text is cut to the configured evidence limit before prompting.
//!
//! Keys cover the evidence mode, the claim and the source URL or pasted
//! text, so a pasted request never answers for a fetched one.

use std::collections::BTreeMap;

use serde_json::json;
use tracing::{debug, info};

use concord_contracts::{
    consensus::ConsensusMode,
    error::ConcordResult,
    oracle::OracleFailurePolicy,
    record::{Record, RecordKey},
    schema::{FieldSpec, ResponseFormat, Schema},
    submission::{IdentifierStrategy, InputRule, InputSource, Submission},
};
use concord_core::{
    encode_parts,
    input::check_input,
    traits::{Domain, EvidenceFetcher, Ledger, OracleInvoker},
    Pipeline, PromptFields, PromptTemplate,
};
use concord_policy::{ConcordConfig, GuardedFetcher, HostDenylist};
use concord_verify::SchemaValidator;

use crate::runtime::{SharedLedger, Wiring};

pub const NOTARIZATION_SCHEMA_ID: &str = "notarization-v1";

/// The `source` recorded for pasted evidence.
pub const SUBMITTED_EVIDENCE: &str = "Evidence provided by submitter";

const NOTARIZATION_PROMPT: &str = include_str!("../prompts/notarization.txt");

pub fn notarization_schema() -> ConcordResult<Schema> {
    Schema::new(
        NOTARIZATION_SCHEMA_ID,
        vec![
            FieldSpec::one_of("status", &["VERIFIED", "UNVERIFIED"]),
            FieldSpec::integer("confidence", 0, 100),
            FieldSpec::text("reasoning"),
            FieldSpec::text("key_evidence"),
        ],
        ResponseFormat::Structured,
        json!({
            "status": "UNVERIFIED",
            "confidence": 0,
            "reasoning": "Invalid or unparsable model output",
            "key_evidence": ""
        }),
    )
}

// ── Domain ────────────────────────────────────────────────────────────────────

pub struct NotarizationDomain {
    schema: Schema,
    template: PromptTemplate,
    max_evidence_chars: usize,
}

impl NotarizationDomain {
    pub fn new(max_evidence_chars: usize) -> ConcordResult<Self> {
        Ok(Self {
            schema: notarization_schema()?,
            template: PromptTemplate::new(NOTARIZATION_PROMPT)?,
            max_evidence_chars,
        })
    }
}

impl Domain for NotarizationDomain {
    fn name(&self) -> &str {
        "notary"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Keyed by evidence mode, claim and source together.
    fn identifier_strategy(&self) -> IdentifierStrategy {
        IdentifierStrategy::ContentDerived
    }

    fn consensus_mode(&self) -> ConsensusMode {
        ConsensusMode::Comparative { fields: vec!["status".to_string()] }
    }

    fn oracle_failure_policy(&self) -> OracleFailurePolicy {
        OracleFailurePolicy::Abort
    }

    fn input_rules(&self) -> Vec<InputRule> {
        vec![
            InputRule::new(InputSource::Field("claim".into()), "Claim"),
            InputRule::new(InputSource::Field("source".into()), "Source"),
        ]
    }

    fn build_prompt(&self, submission: &Submission) -> ConcordResult<String> {
        let get = |name: &str| submission.field(name).unwrap_or_default();
        let fields = PromptFields::new()
            .set("claim", get("claim"))
            .set("source", get("source"))
            .set_truncated("evidence", get("evidence"), self.max_evidence_chars);
        self.template.render(&fields)
    }

    fn subject(&self, submission: &Submission) -> BTreeMap<String, String> {
        ["claim", "source"]
            .into_iter()
            .filter_map(|name| submission.field(name).map(|v| (name.to_string(), v.to_string())))
            .collect()
    }
}

fn notarization_request(claim: &str, source_url: &str) -> Submission {
    Submission::new(encode_parts(&["url", claim, source_url]))
        .with_field("claim", claim)
        .with_field("source", source_url)
}

fn pasted_request(claim: &str, evidence_text: &str) -> Submission {
    Submission::new(encode_parts(&["pasted", claim, evidence_text]))
        .with_field("claim", claim)
        .with_field("source", SUBMITTED_EVIDENCE)
        .with_field("evidence", evidence_text)
}

// ── Runtime ───────────────────────────────────────────────────────────────────

/// Notary runtime over its own ledger.
pub struct Notary {
    pipeline: Pipeline,
    ledger: SharedLedger,
    fetcher: Box<dyn EvidenceFetcher>,
    denylist: HostDenylist,
}

impl Notary {
    /// Wire the notary. `fetcher` is wrapped with the configured denylist.
    pub fn new<F>(
        oracle: Box<dyn OracleInvoker>,
        fetcher: F,
        ledger: SharedLedger,
        config: &ConcordConfig,
    ) -> ConcordResult<Self>
    where
        F: EvidenceFetcher + 'static,
    {
        let domain = NotarizationDomain::new(config.evidence.max_chars)?;
        let pipeline = Wiring::new(SchemaValidator::new()).build(Box::new(domain), oracle, config)?;
        let denylist = config.denylist();
        Ok(Self {
            pipeline,
            ledger,
            fetcher: Box::new(GuardedFetcher::new(fetcher, denylist.clone())),
            denylist,
        })
    }

    /// Fetch `source_url` and notarize `claim` against its text.
    ///
    /// A denied host fails with `EvidenceDenied` and an already notarized
    /// claim and source return the stored record; neither fetches.
    pub fn notarize(&self, claim: &str, source_url: &str) -> ConcordResult<Record> {
        let request = notarization_request(claim, source_url);
        self.pipeline.domain().validate_input(&request)?;
        self.denylist.check(source_url)?;

        let key = self.pipeline.key_for(&request)?;
        if self.ledger.exists(&key)? {
            debug!(key = %key, "claim already notarized, skipping fetch");
            return self.ledger.get(&key);
        }

        let evidence = self.fetcher.fetch(source_url)?;
        self.commit(request.with_field("evidence", evidence))
    }

    /// Notarize `claim` against pasted `evidence_text`.
    pub fn notarize_with_evidence(&self, claim: &str, evidence_text: &str) -> ConcordResult<Record> {
        let request = pasted_request(claim, evidence_text);
        check_input(&request, &[InputRule::new(InputSource::Field("evidence".into()), "Evidence text")])?;
        self.commit(request)
    }

    fn commit(&self, request: Submission) -> ConcordResult<Record> {
        let record = self.pipeline.submit(self.ledger.as_ref(), &request)?;
        info!(
            key = %record.key,
            status = record.payload.get_str("status").unwrap_or("?"),
            confidence = record.payload.get_i64("confidence").unwrap_or_default(),
            "claim notarized"
        );
        Ok(record)
    }

    /// The record for `claim` notarized against `source_url`, or `NotFound`.
    pub fn notarization(&self, claim: &str, source_url: &str) -> ConcordResult<Record> {
        let key = self.pipeline.key_for(&notarization_request(claim, source_url))?;
        self.pipeline.get(self.ledger.as_ref(), &key)
    }

    pub fn exists(&self, key: &RecordKey) -> ConcordResult<bool> {
        self.pipeline.exists(self.ledger.as_ref(), key)
    }

    pub fn list_keys(&self) -> ConcordResult<Vec<RecordKey>> {
        self.pipeline.list_keys(self.ledger.as_ref())
    }
}
