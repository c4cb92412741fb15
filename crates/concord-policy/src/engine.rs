//! TOML-driven policy hook implementation.
//!
//! `TomlPolicyHook` loads a `PolicyConfig` from a TOML string or file and
//! implements the `PolicyHook` trait from concord-core.
//!
//! Evaluation algorithm:
//!
//! 1. Iterate rules in declaration order.
//! 2. The first rule matching the schema id and field value decides.
//! 3. If no rule matched, the configured default applies (allow unless set).

use std::path::Path;

use tracing::{debug, warn};

use concord_contracts::{
    error::{ConcordError, ConcordResult},
    payload::CanonicalPayload,
    policy::PolicyVerdict,
};
use concord_core::traits::PolicyHook;

use crate::rule::{PolicyConfig, PolicyRule, RuleVerdict};

/// A `PolicyHook` that reads veto rules from a TOML document.
///
/// ```rust,ignore
/// use concord_policy::engine::TomlPolicyHook;
///
/// let hook = TomlPolicyHook::from_file(Path::new("config/policy.toml"))?;
/// ```
#[derive(Debug, Clone)]
pub struct TomlPolicyHook {
    config: PolicyConfig,
}

impl TomlPolicyHook {
    /// Build a hook from an already-parsed configuration.
    ///
    /// Returns `ConfigError` if a rule sets `field` without `equals` or the
    /// other way round, or if two rules share an id.
    pub fn from_config(config: PolicyConfig) -> ConcordResult<Self> {
        for (idx, rule) in config.rules.iter().enumerate() {
            if rule.field.is_some() != rule.equals.is_some() {
                return Err(ConcordError::ConfigError {
                    reason: format!("policy rule '{}' must set both 'field' and 'equals' or neither", rule.id),
                });
            }
            if config.rules[..idx].iter().any(|r| r.id == rule.id) {
                return Err(ConcordError::ConfigError {
                    reason: format!("policy rule id '{}' is declared twice", rule.id),
                });
            }
        }
        Ok(Self { config })
    }

    /// Parse `s` as TOML and build a `TomlPolicyHook`.
    ///
    /// Returns `ConcordError::ConfigError` if the TOML is malformed or does
    /// not match the expected `PolicyConfig` schema.
    pub fn from_toml_str(s: &str) -> ConcordResult<Self> {
        let config: PolicyConfig = toml::from_str(s).map_err(|e| ConcordError::ConfigError {
            reason: format!("failed to parse policy TOML: {}", e),
        })?;
        Self::from_config(config)
    }

    /// Read the file at `path` and parse it as TOML policy configuration.
    pub fn from_file(path: &Path) -> ConcordResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConcordError::ConfigError {
            reason: format!("failed to read policy file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.config.rules
    }
}

fn veto_reason(rule: &PolicyRule) -> String {
    rule.reason.clone().unwrap_or_else(|| format!("vetoed by rule '{}'", rule.id))
}

impl PolicyHook for TomlPolicyHook {
    fn review(&self, schema_id: &str, payload: &CanonicalPayload) -> ConcordResult<PolicyVerdict> {
        debug!(schema_id = %schema_id, "evaluating policy");

        for rule in &self.config.rules {
            if !rule.matches(schema_id, payload) {
                continue;
            }

            debug!(rule_id = %rule.id, schema_id = %schema_id, "rule matched");

            return Ok(match rule.verdict {
                RuleVerdict::Allow => PolicyVerdict::Allow,
                RuleVerdict::Veto => {
                    warn!(rule_id = %rule.id, schema_id = %schema_id, "payload vetoed");
                    PolicyVerdict::Veto { reason: veto_reason(rule) }
                }
            });
        }

        Ok(match self.config.default {
            RuleVerdict::Allow => PolicyVerdict::Allow,
            RuleVerdict::Veto => {
                warn!(schema_id = %schema_id, "no policy rule matched; vetoing by default");
                PolicyVerdict::Veto {
                    reason: format!("vetoed by default: no policy rule matched schema '{schema_id}'"),
                }
            }
        })
    }
}
