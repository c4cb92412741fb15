//! Code review scoring.
//!
//! The oracle rates a snippet on readability, security, efficiency and best
//! practices, gives an overall score from 1 to 10, and lists issues,
//! strengths and suggested improvements. Every execution must return the
//! same review before it is recorded.

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
    encode_parts,
    traits::{Domain, OracleInvoker},
    Pipeline, PromptFields, PromptTemplate,
};
use concord_policy::ConcordConfig;
use concord_verify::SchemaValidator;

use crate::runtime::{SharedLedger, Wiring};

pub const CODE_REVIEW_SCHEMA_ID: &str = "code-review-v1";

pub const MAX_CODE_CHARS: usize = 20_000;

/// Areas scored alongside the overall `score`.
pub const AREAS: [&str; 4] = ["readability", "security", "efficiency", "best_practices"];

const CODE_REVIEW_PROMPT: &str = include_str!("../prompts/code_review.txt");

pub fn code_review_schema() -> ConcordResult<Schema> {
    let mut fields = vec![FieldSpec::integer("score", 1, 10)];
    fields.extend(AREAS.iter().map(|area| FieldSpec::integer(*area, 1, 10)));
    fields.push(FieldSpec::text("summary"));
    fields.extend(["top_issues", "strengths", "improvements"].iter().map(|name| FieldSpec::text_list(*name)));

    Schema::new(
        CODE_REVIEW_SCHEMA_ID,
        fields,
        ResponseFormat::Structured,
        json!({
            "score": 1,
            "readability": 1,
            "security": 1,
            "efficiency": 1,
            "best_practices": 1,
            "summary": "Invalid or unparsable model output",
            "top_issues": [],
            "strengths": [],
            "improvements": []
        }),
    )
}

// ── Domain ────────────────────────────────────────────────────────────────────

pub struct CodeReviewDomain {
    schema: Schema,
    template: PromptTemplate,
}

impl CodeReviewDomain {
    pub fn new() -> ConcordResult<Self> {
        Ok(Self { schema: code_review_schema()?, template: PromptTemplate::new(CODE_REVIEW_PROMPT)? })
    }
}

impl Domain for CodeReviewDomain {
    fn name(&self) -> &str {
        "code-review"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Keyed by language and code together.
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
            InputRule::new(InputSource::Field("language".into()), "Language"),
            InputRule::new(InputSource::Field("code".into()), "Code").max_chars(MAX_CODE_CHARS),
        ]
    }

    fn build_prompt(&self, submission: &Submission) -> ConcordResult<String> {
        let get = |name: &str| submission.field(name).unwrap_or_default();
        self.template.render(&PromptFields::new().set("language", get("language")).set("code", get("code")))
    }

    fn subject(&self, submission: &Submission) -> BTreeMap<String, String> {
        ["language", "code"]
            .into_iter()
            .filter_map(|name| submission.field(name).map(|v| (name.to_string(), v.to_string())))
            .collect()
    }
}

fn review_request(code: &str, language: &str) -> Submission {
    Submission::new(encode_parts(&[language, code])).with_field("language", language).with_field("code", code)
}

// ── Runtime ───────────────────────────────────────────────────────────────────

/// Code review runtime over its own ledger.
///
/// Reviewing the same code in the same language again returns the stored
/// review.
pub struct CodeReviewer {
    pipeline: Pipeline,
    ledger: SharedLedger,
}

impl CodeReviewer {
    pub fn new(
        oracle: Box<dyn OracleInvoker>,
        ledger: SharedLedger,
        config: &ConcordConfig,
    ) -> ConcordResult<Self> {
        let pipeline =
            Wiring::new(SchemaValidator::new()).build(Box::new(CodeReviewDomain::new()?), oracle, config)?;
        Ok(Self { pipeline, ledger })
    }

    /// Review `code` written in `language` and return the full record.
    pub fn review(&self, code: &str, language: &str) -> ConcordResult<Record> {
        let record = self.pipeline.submit(self.ledger.as_ref(), &review_request(code, language))?;
        info!(
            key = %record.key,
            language = %language,
            score = record.payload.get_i64("score").unwrap_or_default(),
            "code reviewed"
        );
        Ok(record)
    }

    /// The overall score alone.
    pub fn score(&self, code: &str, language: &str) -> ConcordResult<i64> {
        let record = self.review(code, language)?;
        Ok(record.payload.get_i64("score").unwrap_or_default())
    }

    /// The stored review for `code` in `language`, or `NotFound`.
    pub fn stored_review(&self, code: &str, language: &str) -> ConcordResult<Record> {
        let key = self.pipeline.key_for(&review_request(code, language))?;
        self.pipeline.get(self.ledger.as_ref(), &key)
    }

    pub fn exists(&self, key: &RecordKey) -> ConcordResult<bool> {
        self.pipeline.exists(self.ledger.as_ref(), key)
    }

    pub fn list_keys(&self) -> ConcordResult<Vec<RecordKey>> {
        self.pipeline.list_keys(self.ledger.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use concord_contracts::{error::ConcordError, record::PayloadOrigin};
    use concord_core::traits::Domain;
    use concord_ledger::InMemoryLedger;

    use super::{review_request, CodeReviewDomain, CodeReviewer};
    use crate::{oracle::ScriptedOracle, runtime::default_config};

    const REVIEW: &str = r#"{"score": 6, "readability": 7, "security": 4, "efficiency": 6,
        "best_practices": 6, "summary": "Works, but builds SQL from user input.",
        "top_issues": ["SQL injection in find_user"], "strengths": ["short and readable"],
        "improvements": ["use a parameterized query"]}"#;

    fn reviewer(oracle: ScriptedOracle) -> (CodeReviewer, Arc<InMemoryLedger>) {
        let ledger = Arc::new(InMemoryLedger::new());
        let reviewer = CodeReviewer::new(Box::new(oracle), ledger.clone(), &default_config().unwrap()).unwrap();
        (reviewer, ledger)
    }

    #[test]
    fn prompt_fences_code_in_its_language() {
        let domain = CodeReviewDomain::new().unwrap();
        let prompt = domain.build_prompt(&review_request("fn main() {}", "rust")).unwrap();
        assert!(prompt.contains("analyzing rust code"));
        assert!(prompt.contains("```rust\nfn main() {}\n```"));
    }

    #[test]
    fn same_code_in_another_language_is_reviewed_separately() {
        let oracle = ScriptedOracle::new().reply("find_user", REVIEW);
        let calls = oracle.call_counter();
        let (reviewer, ledger) = reviewer(oracle);
        let code = "def find_user(name): return db.execute('SELECT * FROM users WHERE name=' + name)";

        let python = reviewer.review(code, "python").unwrap();
        let again = reviewer.review(code, "python").unwrap();
        let other = reviewer.review(code, "ruby").unwrap();

        assert_eq!(python, again);
        assert_ne!(python.key, other.key);
        assert_eq!(*calls.lock().unwrap(), 6);
        assert_eq!(ledger.len(), 2);
        assert_eq!(python.payload.get_i64("security"), Some(4));
        assert_eq!(reviewer.stored_review(code, "python").unwrap(), python);
    }

    #[test]
    fn language_and_code_boundary_is_part_of_the_key() {
        let (code_reviewer, _) = reviewer(ScriptedOracle::new());
        let a = code_reviewer.pipeline.key_for(&review_request("x = 1", "py\n")).unwrap();
        let b = code_reviewer.pipeline.key_for(&review_request("\nx = 1", "py")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn out_of_range_score_falls_back() {
        let oracle = ScriptedOracle::new().reply("add(", REVIEW.replace("\"score\": 6", "\"score\": 11"));
        let (reviewer, _) = reviewer(oracle);
        let record = reviewer.review("fn add(a: i32, b: i32) -> i32 { a + b }", "rust").unwrap();
        assert_eq!(record.origin, PayloadOrigin::Fallback);
        assert_eq!(record.payload.get_i64("score"), Some(1));
    }

    #[test]
    fn blank_language_is_rejected() {
        let (reviewer, _) = reviewer(ScriptedOracle::new());
        match reviewer.review("print('hi')", " ") {
            Err(ConcordError::InputValidation { reason }) => assert_eq!(reason, "Language cannot be empty"),
            other => panic!("expected InputValidation, got {:?}", other),
        }
    }
}
