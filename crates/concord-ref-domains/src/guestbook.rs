//! Guestbook with oracle moderation.
//!
//! Each message is classified by the oracle as flagged (`YES`) or
//! acceptable (`NO`). Flagged messages are vetoed by the guestbook policy and
//! never recorded. An unreadable answer falls back to `YES`, so the
//! guestbook fails closed.

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
    traits::{Domain, Ledger, OracleInvoker},
    CategoricalCase, Pipeline, PromptFields, PromptTemplate, Sanitizer,
};
use concord_policy::{ConcordConfig, TomlPolicyHook};
use concord_verify::SchemaValidator;

use crate::runtime::{SharedLedger, Wiring};

pub const MODERATION_SCHEMA_ID: &str = "moderation-v1";

/// Shown by `latest_entry` before anyone has signed.
pub const WELCOME_MESSAGE: &str = "Welcome to Concord!";
pub const WELCOME_SENDER: &str = "System";

const MODERATION_PROMPT: &str = include_str!("../prompts/moderation.txt");
const GUESTBOOK_POLICY: &str = include_str!("../policies/guestbook.toml");

/// `{status: YES|NO}` read from a one-word answer. Fallback `YES`.
pub fn moderation_schema() -> ConcordResult<Schema> {
    Schema::new(
        MODERATION_SCHEMA_ID,
        vec![FieldSpec::one_of("status", &["YES", "NO"])],
        ResponseFormat::PlainText { field: "status".to_string() },
        json!({ "status": "YES" }),
    )
}

// ── Domain ────────────────────────────────────────────────────────────────────

pub struct ModerationDomain {
    schema: Schema,
    template: PromptTemplate,
}

impl ModerationDomain {
    pub fn new() -> ConcordResult<Self> {
        Ok(Self { schema: moderation_schema()?, template: PromptTemplate::new(MODERATION_PROMPT)? })
    }
}

impl Domain for ModerationDomain {
    fn name(&self) -> &str {
        "guestbook"
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

    fn oracle_failure_policy(&self) -> OracleFailurePolicy {
        OracleFailurePolicy::Abort
    }

    fn input_rules(&self) -> Vec<InputRule> {
        vec![
            InputRule::new(InputSource::Primary, "Message"),
            InputRule::new(InputSource::Field("sender".into()), "Sender"),
        ]
    }

    fn build_prompt(&self, submission: &Submission) -> ConcordResult<String> {
        self.template.render(&PromptFields::new().set("message", submission.input.as_str()))
    }

    fn subject(&self, submission: &Submission) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("message".to_string(), submission.input.clone()),
            ("sender".to_string(), submission.field("sender").unwrap_or_default().to_string()),
        ])
    }
}

// ── Runtime ───────────────────────────────────────────────────────────────────

/// A guestbook entry as shown to visitors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub message: String,
    pub sender: String,
}

/// Guestbook runtime over its own ledger.
///
/// Entries are keyed by the message text, so signing a message that is
/// already recorded returns the existing entry.
pub struct Guestbook {
    pipeline: Pipeline,
    ledger: SharedLedger,
}

impl Guestbook {
    pub fn new(
        oracle: Box<dyn OracleInvoker>,
        ledger: SharedLedger,
        config: &ConcordConfig,
    ) -> ConcordResult<Self> {
        let pipeline = Wiring::new(SchemaValidator::new())
            .sanitizer(Sanitizer::new().with_categorical_case(CategoricalCase::Upper))
            .domain_policy(TomlPolicyHook::from_toml_str(GUESTBOOK_POLICY)?)
            .build(Box::new(ModerationDomain::new()?), oracle, config)?;
        Ok(Self { pipeline, ledger })
    }

    /// Moderate `message` and record it under `sender`.
    ///
    /// A flagged message fails with `PolicyRejection`.
    pub fn sign(&self, message: &str, sender: &str) -> ConcordResult<Record> {
        let submission = Submission::new(message).with_field("sender", sender);
        let record = self.pipeline.submit(self.ledger.as_ref(), &submission)?;
        info!(sender = %sender, key = %record.key, "guestbook signed");
        Ok(record)
    }

    /// The most recently recorded entry, or the welcome entry.
    pub fn latest_entry(&self) -> ConcordResult<Entry> {
        let Some(record) = self.ledger.latest()? else {
            return Ok(Entry { message: WELCOME_MESSAGE.to_string(), sender: WELCOME_SENDER.to_string() });
        };
        let field = |name: &str| record.subject.get(name).cloned().unwrap_or_default();
        Ok(Entry { message: field("message"), sender: field("sender") })
    }

    /// The ledger key a message is recorded under.
    pub fn key_for(&self, message: &str) -> ConcordResult<RecordKey> {
        self.pipeline.key_for(&Submission::new(message))
    }

    pub fn get(&self, key: &RecordKey) -> ConcordResult<Record> {
        self.pipeline.get(self.ledger.as_ref(), key)
    }

    pub fn exists(&self, key: &RecordKey) -> ConcordResult<bool> {
        self.pipeline.exists(self.ledger.as_ref(), key)
    }

    pub fn list_keys(&self) -> ConcordResult<Vec<RecordKey>> {
        self.pipeline.list_keys(self.ledger.as_ref())
    }
}
