//! # concord-contracts
//!
//! Shared types, schemas, and contracts for the Concord oracle-consensus
//! record pipeline.
//!
//! All crates in the workspace import from here. Apart from canonical
//! serialization and schema conformance checks, no pipeline logic lives in
//! this crate.

pub mod consensus;
pub mod error;
pub mod oracle;
pub mod payload;
pub mod policy;
pub mod record;
pub mod schema;
pub mod submission;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use consensus::{ConsensusOutcome, Execution};
    use error::ConcordError;
    use payload::{canonical_json, CanonicalPayload};
    use policy::PolicyVerdict;
    use record::{PayloadOrigin, RecordKey};
    use schema::{FieldKind, FieldSpec, ResponseFormat, Schema};
    use submission::{InputSource, Submission};

    fn verdict_schema() -> Schema {
        Schema::new(
            "verdict-v1",
            vec![
                FieldSpec::one_of("verdict", &["approve", "reject"]),
                FieldSpec::integer("score", 0, 10),
                FieldSpec::text("summary"),
                FieldSpec::text_list("factors"),
            ],
            ResponseFormat::Structured,
            json!({ "verdict": "reject", "score": 0, "summary": "n/a", "factors": [] }),
        )
        .unwrap()
    }

    // ── Canonical payloads ───────────────────────────────────────────────────

    #[test]
    fn canonical_form_sorts_keys_at_every_depth() {
        let value = json!({ "b": 1, "a": { "z": true, "y": [3, 2, { "k": "v", "c": null }] } });
        assert_eq!(
            canonical_json(&value),
            r#"{"a":{"y":[3,2,{"c":null,"k":"v"}],"z":true},"b":1}"#
        );
    }

    #[test]
    fn payloads_with_different_key_order_are_equal() {
        let a: serde_json::Value = serde_json::from_str(r#"{"x":1,"y":"two"}"#).unwrap();
        let b: serde_json::Value = serde_json::from_str(r#"{"y":"two","x":1}"#).unwrap();
        let pa = CanonicalPayload::from_value(a).unwrap();
        let pb = CanonicalPayload::from_value(b).unwrap();
        assert_eq!(pa, pb);
        assert_eq!(pa.as_bytes(), pb.as_bytes());
    }

    #[test]
    fn canonical_payload_rejects_non_objects() {
        assert!(matches!(
            CanonicalPayload::from_value(json!([1, 2])),
            Err(ConcordError::ConfigError { .. })
        ));
    }

    #[test]
    fn projection_marks_missing_fields_as_null() {
        let payload = CanonicalPayload::from_value(json!({ "status": "YES", "note": "x" })).unwrap();
        let projected = payload.project(&["status".to_string(), "absent".to_string()]);
        assert_eq!(projected.as_str(), r#"{"absent":null,"status":"YES"}"#);
    }

    #[test]
    fn canonical_payload_survives_serde() {
        let payload = CanonicalPayload::from_value(json!({ "b": [1], "a": "x" })).unwrap();
        let json = serde_json::to_string(&payload).unwrap();
        let decoded: CanonicalPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(payload, decoded);
    }

    // ── Field kinds ──────────────────────────────────────────────────────────

    #[test]
    fn integer_kind_coerces_integral_floats() {
        let kind = FieldKind::Integer { min: 0, max: 10 };
        assert_eq!(kind.check(&json!(8.0)).unwrap(), json!(8));
        assert_eq!(kind.check(&json!(7)).unwrap(), json!(7));
    }

    #[test]
    fn integer_kind_rejects_fractions_ranges_and_strings() {
        let kind = FieldKind::Integer { min: 0, max: 10 };
        assert!(kind.check(&json!(7.5)).is_err());
        assert!(kind.check(&json!(11)).is_err());
        assert!(kind.check(&json!(-1)).is_err());
        assert!(kind.check(&json!("7")).is_err());
    }

    #[test]
    fn enum_kind_is_case_sensitive() {
        let kind = FieldKind::Enum { allowed: vec!["YES".to_string(), "NO".to_string()] };
        assert!(kind.check(&json!("YES")).is_ok());
        assert!(kind.check(&json!("yes")).is_err());
    }

    #[test]
    fn text_list_kind_requires_string_elements() {
        assert!(FieldKind::TextList.check(&json!(["a", "b"])).is_ok());
        assert!(FieldKind::TextList.check(&json!(["a", 1])).is_err());
        assert!(FieldKind::TextList.check(&json!("a")).is_err());
    }

    // ── Schemas ──────────────────────────────────────────────────────────────

    #[test]
    fn schema_fallback_is_canonicalized() {
        let schema = verdict_schema();
        assert_eq!(
            schema.fallback().as_str(),
            r#"{"factors":[],"score":0,"summary":"n/a","verdict":"reject"}"#
        );
    }

    #[test]
    fn schema_with_invalid_fallback_is_a_config_error() {
        let result = Schema::new(
            "bad-v1",
            vec![FieldSpec::integer("score", 0, 10)],
            ResponseFormat::Structured,
            json!({ "score": 99 }),
        );
        match result {
            Err(ConcordError::ConfigError { reason }) => assert!(reason.contains("score")),
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn schema_rejects_plain_text_into_undeclared_field() {
        let result = Schema::new(
            "bad-v1",
            vec![FieldSpec::one_of("status", &["YES", "NO"])],
            ResponseFormat::PlainText { field: "answer".to_string() },
            json!({ "status": "YES" }),
        );
        assert!(matches!(result, Err(ConcordError::ConfigError { .. })));
    }

    #[test]
    fn schema_rejects_duplicate_field_names() {
        let result = Schema::new(
            "bad-v1",
            vec![FieldSpec::text("a"), FieldSpec::text("a")],
            ResponseFormat::Structured,
            json!({ "a": "x" }),
        );
        assert!(matches!(result, Err(ConcordError::ConfigError { .. })));
    }

    #[test]
    fn conform_drops_undeclared_fields() {
        let schema = verdict_schema();
        let object = json!({
            "verdict": "approve", "score": 9, "summary": "ok", "factors": ["a"], "extra": 1
        });
        let payload = schema.conform(object.as_object().unwrap()).unwrap();
        assert!(payload.get("extra").is_none());
        assert_eq!(payload.get_i64("score"), Some(9));
    }

    #[test]
    fn conform_reports_missing_field() {
        let schema = verdict_schema();
        let object = json!({ "verdict": "approve", "score": 9, "summary": "ok" });
        let err = schema.conform(object.as_object().unwrap()).unwrap_err();
        assert!(err.contains("factors"), "unexpected message: {err}");
    }

    // ── Consensus outcomes ───────────────────────────────────────────────────

    #[test]
    fn disagreeing_outcome_converts_to_error() {
        let payload = CanonicalPayload::from_value(json!({ "status": "YES" })).unwrap();
        let outcome = ConsensusOutcome {
            executions: vec![Execution { payload, origin: PayloadOrigin::Validated }],
            agreed: false,
            agreed_payload: None,
            distinct_candidates: 2,
        };
        match outcome.into_agreed() {
            Err(ConcordError::ConsensusDisagreement { executions, reason }) => {
                assert_eq!(executions, 1);
                assert!(reason.contains("2 distinct"));
            }
            other => panic!("expected ConsensusDisagreement, got {:?}", other),
        }
    }

    // ── Submissions ──────────────────────────────────────────────────────────

    #[test]
    fn submission_sources_read_absent_values_as_empty() {
        let submission = Submission::new("text").with_field("timeline", "Q2 2026");
        assert_eq!(submission.source(&InputSource::Primary), "text");
        assert_eq!(submission.source(&InputSource::Field("timeline".into())), "Q2 2026");
        assert_eq!(submission.source(&InputSource::Field("missing".into())), "");
        assert_eq!(submission.source(&InputSource::CallerKey), "");
    }

    // ── PolicyVerdict serde round-trip ───────────────────────────────────────

    #[test]
    fn policy_verdict_veto_round_trips() {
        let original = PolicyVerdict::Veto { reason: "message rejected by moderation".to_string() };
        let json = serde_json::to_string(&original).unwrap();
        let decoded: PolicyVerdict = serde_json::from_str(&json).unwrap();
        assert_eq!(original, decoded);
    }

    // ── ConcordError display messages ────────────────────────────────────────

    #[test]
    fn error_duplicate_key_display() {
        let err = ConcordError::DuplicateKey { key: "dispute_001".to_string() };
        assert!(err.to_string().contains("dispute_001"));
    }

    #[test]
    fn error_consensus_disagreement_display() {
        let err = ConcordError::ConsensusDisagreement {
            executions: 3,
            reason: "2 distinct candidate(s)".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("consensus not reached"));
        assert!(msg.contains('3'));
    }

    #[test]
    fn error_evidence_denied_display() {
        let err = ConcordError::EvidenceDenied { host: "x.com".to_string() };
        assert!(err.to_string().contains("x.com"));
    }

    #[test]
    fn record_key_displays_inner_value() {
        assert_eq!(RecordKey::new("abc").to_string(), "abc");
    }
}
