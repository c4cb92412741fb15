//! Policy rule types and configuration schema.
//!
//! A `PolicyConfig` is deserialized from TOML and holds an ordered list of
//! `PolicyRule`s. Rules are evaluated in declaration order and the first
//! matching rule wins. If no rule matches, the configured `default` applies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use concord_contracts::payload::CanonicalPayload;

/// The decision a rule produces when it matches an agreed payload.
///
/// Example in TOML:
/// ```toml
/// verdict = "allow"
/// verdict = "veto"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleVerdict {
    #[default]
    Allow,
    Veto,
}

/// A single policy rule loaded from TOML.
///
/// A rule matches when its `schema` pattern matches the payload's schema id
/// and, if `field` is set, the payload field equals `equals`. String fields
/// are compared directly; other JSON values by their compact rendering, so
/// `equals = "0"` matches an integer zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Stable identifier used in logs and veto reasons.
    pub id: String,

    #[serde(default)]
    pub description: String,

    /// Schema id to match. Use `"*"` to match any schema.
    pub schema: String,

    /// Payload field to inspect. When absent, the rule matches every
    /// payload of the schema.
    #[serde(default)]
    pub field: Option<String>,

    /// Required value of `field`. Mandatory whenever `field` is set.
    #[serde(default)]
    pub equals: Option<String>,

    pub verdict: RuleVerdict,

    /// Surfaced in `PolicyRejection` when `verdict = "veto"`.
    #[serde(default)]
    pub reason: Option<String>,
}

impl PolicyRule {
    /// Return true if this rule applies to `payload` under `schema_id`.
    pub fn matches(&self, schema_id: &str, payload: &CanonicalPayload) -> bool {
        if self.schema != "*" && self.schema != schema_id {
            return false;
        }
        let (Some(field), Some(expected)) = (&self.field, &self.equals) else {
            return self.field.is_none();
        };
        match payload.get(field) {
            Some(Value::String(actual)) => actual == expected,
            Some(other) => other.to_string() == *expected,
            None => false,
        }
    }
}

/// The policy section of a TOML configuration.
///
/// Example:
/// ```toml
/// default = "allow"
///
/// [[rules]]
/// id = "block-flagged-messages"
/// schema = "moderation-v1"
/// field = "status"
/// equals = "YES"
/// verdict = "veto"
/// reason = "message was flagged as inappropriate"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Applied when no rule matches.
    #[serde(default)]
    pub default: RuleVerdict,

    /// Ordered list of rules. First match wins.
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
}
