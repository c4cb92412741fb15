//! # concord-policy
//!
//! TOML-driven policy and runtime configuration for the Concord pipeline.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`TomlPolicyHook`], which implements the
//!   [`PolicyHook`](concord_core::traits::PolicyHook) trait. Rules are
//!   declared in TOML, evaluated in order, and the first matching rule wins.
//!   If no rule matches, the configured default applies (allow).
//! - [`HostDenylist`] and [`GuardedFetcher`], which refuse evidence URLs on
//!   denied hosts before any fetch happens.
//! - [`ConcordConfig`], the deployment configuration file.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use concord_policy::ConcordConfig;
//!
//! let config = ConcordConfig::from_file(Path::new("config/concord.toml"))?;
//! let hook = config.policy_hook()?;
//! // Pass `hook` to `concord_core::Pipeline::with_policy_hook(...)`.
//! ```
//!
//! ## Rule matching
//!
//! Each rule names a `schema` pattern (`"*"` matches any schema) and
//! optionally a payload `field` with the value it must `equals`.

pub mod config;
pub mod engine;
pub mod evidence;
pub mod rule;

pub use config::ConcordConfig;
pub use engine::TomlPolicyHook;
pub use evidence::{GuardedFetcher, HostDenylist};
pub use rule::{PolicyConfig, PolicyRule, RuleVerdict};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use concord_contracts::{error::ConcordError, payload::CanonicalPayload, policy::PolicyVerdict};
    use concord_core::traits::PolicyHook;

    use crate::{ConcordConfig, TomlPolicyHook};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn payload(value: serde_json::Value) -> CanonicalPayload {
        CanonicalPayload::from_value(value).unwrap()
    }

    const MODERATION: &str = r#"
        [[rules]]
        id = "block-flagged"
        description = "Flagged guestbook messages are never stored"
        schema = "moderation-v1"
        field = "status"
        equals = "YES"
        verdict = "veto"
        reason = "message was flagged as inappropriate"
    "#;

    // ── 1. allow-by-default ───────────────────────────────────────────────────

    /// When no rules exist, every payload is allowed.
    #[test]
    fn test_allow_by_default() {
        let hook = TomlPolicyHook::from_toml_str("rules = []").unwrap();
        let verdict = hook.review("proposal-v1", &payload(json!({ "verdict": "reject" }))).unwrap();
        assert_eq!(verdict, PolicyVerdict::Allow);
    }

    // ── 2. explicit veto ──────────────────────────────────────────────────────

    #[test]
    fn test_explicit_veto() {
        let hook = TomlPolicyHook::from_toml_str(MODERATION).unwrap();

        match hook.review("moderation-v1", &payload(json!({ "status": "YES" }))).unwrap() {
            PolicyVerdict::Veto { reason } => assert_eq!(reason, "message was flagged as inappropriate"),
            other => panic!("expected Veto, got {:?}", other),
        }
        assert_eq!(
            hook.review("moderation-v1", &payload(json!({ "status": "NO" }))).unwrap(),
            PolicyVerdict::Allow
        );
    }

    /// A rule for one schema never fires for another.
    #[test]
    fn test_schema_scoping() {
        let hook = TomlPolicyHook::from_toml_str(MODERATION).unwrap();
        let verdict = hook.review("vibe-v1", &payload(json!({ "status": "YES" }))).unwrap();
        assert_eq!(verdict, PolicyVerdict::Allow);
    }

    // ── 3. wildcard and non-string fields ─────────────────────────────────────

    #[test]
    fn test_wildcard_schema_and_integer_field() {
        let toml = r#"
            [[rules]]
            id = "zero-confidence"
            schema = "*"
            field = "confidence"
            equals = "0"
            verdict = "veto"
        "#;
        let hook = TomlPolicyHook::from_toml_str(toml).unwrap();

        match hook.review("notarization-v1", &payload(json!({ "confidence": 0 }))).unwrap() {
            PolicyVerdict::Veto { reason } => assert!(reason.contains("zero-confidence"), "{reason}"),
            other => panic!("expected Veto, got {:?}", other),
        }
        assert_eq!(
            hook.review("notarization-v1", &payload(json!({ "confidence": 40 }))).unwrap(),
            PolicyVerdict::Allow
        );
    }

    // ── 4. first-match wins ───────────────────────────────────────────────────

    #[test]
    fn test_first_match_wins() {
        let toml = r#"
            default = "veto"

            [[rules]]
            id = "first-allow"
            schema = "vibe-v1"
            verdict = "allow"

            [[rules]]
            id = "second-veto"
            schema = "*"
            verdict = "veto"
            reason = "this rule should never fire for vibe-v1"
        "#;
        let hook = TomlPolicyHook::from_toml_str(toml).unwrap();

        assert_eq!(hook.review("vibe-v1", &payload(json!({}))).unwrap(), PolicyVerdict::Allow);
        assert!(matches!(
            hook.review("proposal-v1", &payload(json!({}))).unwrap(),
            PolicyVerdict::Veto { .. }
        ));
    }

    #[test]
    fn test_veto_by_default() {
        let hook = TomlPolicyHook::from_toml_str(r#"default = "veto""#).unwrap();
        match hook.review("proposal-v1", &payload(json!({}))).unwrap() {
            PolicyVerdict::Veto { reason } => assert!(reason.contains("vetoed by default"), "{reason}"),
            other => panic!("expected Veto, got {:?}", other),
        }
    }

    // ── 5. configuration errors ───────────────────────────────────────────────

    /// Malformed TOML must produce a `ConcordError::ConfigError`.
    #[test]
    fn test_toml_parse_error() {
        match TomlPolicyHook::from_toml_str("this is not valid toml ][[[") {
            Err(ConcordError::ConfigError { reason }) => {
                assert!(reason.contains("failed to parse policy TOML"), "got: {reason}")
            }
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_field_without_value_is_rejected() {
        let toml = r#"
            [[rules]]
            id = "half"
            schema = "*"
            field = "status"
            verdict = "veto"
        "#;
        assert!(matches!(TomlPolicyHook::from_toml_str(toml), Err(ConcordError::ConfigError { .. })));
    }

    #[test]
    fn test_duplicate_rule_ids_are_rejected() {
        let toml = r#"
            [[rules]]
            id = "same"
            schema = "*"
            verdict = "allow"

            [[rules]]
            id = "same"
            schema = "*"
            verdict = "veto"
        "#;
        assert!(TomlPolicyHook::from_toml_str(toml).is_err());
    }

    // ── 6. ConcordConfig ──────────────────────────────────────────────────────

    #[test]
    fn test_config_defaults() {
        let config = ConcordConfig::from_toml_str("").unwrap();
        assert_eq!(config.consensus.executions, 3);
        assert_eq!(config.evidence.max_chars, 3000);
        assert!(config.denylist().is_denied("facebook.com"));
        assert!(config.policy.rules.is_empty());
    }

    #[test]
    fn test_config_sections() {
        let toml = r#"
            [consensus]
            executions = 5

            [evidence]
            denied_hosts = ["example.net"]

            [[policy.rules]]
            id = "block-flagged"
            schema = "moderation-v1"
            field = "status"
            equals = "YES"
            verdict = "veto"
        "#;
        let config = ConcordConfig::from_toml_str(toml).unwrap();

        assert_eq!(config.consensus.executions, 5);
        assert_eq!(config.evidence.max_chars, 3000);
        assert!(config.denylist().is_denied("www.example.net"));
        assert!(!config.denylist().is_denied("twitter.com"));

        let hook = config.policy_hook().unwrap();
        assert!(matches!(
            hook.review("moderation-v1", &payload(json!({ "status": "YES" }))).unwrap(),
            PolicyVerdict::Veto { .. }
        ));
    }

    #[test]
    fn test_config_rejects_zero_executions() {
        let result = ConcordConfig::from_toml_str("[consensus]\nexecutions = 0");
        match result {
            Err(ConcordError::ConfigError { reason }) => assert!(reason.contains("executions"), "{reason}"),
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[consensus]\nexecutions = 4").unwrap();

        let config = ConcordConfig::from_file(file.path()).unwrap();
        assert_eq!(config.consensus.executions, 4);

        let missing = ConcordConfig::from_file(std::path::Path::new("/nonexistent/concord.toml"));
        assert!(matches!(missing, Err(ConcordError::ConfigError { .. })));
    }
}
