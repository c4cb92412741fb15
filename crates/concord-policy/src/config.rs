//! Runtime configuration for Concord deployments.
//!
//! ```toml
//! [consensus]
//! executions = 3
//!
//! [evidence]
//! denied_hosts = ["x.com", "twitter.com"]
//! max_chars = 3000
//!
//! [policy]
//! default = "allow"
//!
//! [[policy.rules]]
//! id = "block-flagged-messages"
//! schema = "moderation-v1"
//! field = "status"
//! equals = "YES"
//! verdict = "veto"
//! ```
//!
//! Every section is optional; omitted values take the defaults below.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use concord_contracts::error::{ConcordError, ConcordResult};

use crate::{
    engine::TomlPolicyHook,
    evidence::{HostDenylist, DEFAULT_DENIED_HOSTS},
    rule::PolicyConfig,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Independent executions per submission.
    pub executions: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self { executions: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceConfig {
    pub denied_hosts: Vec<String>,
    /// Evidence text beyond this many characters is cut before prompting.
    pub max_chars: usize,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            denied_hosts: DEFAULT_DENIED_HOSTS.iter().map(|h| h.to_string()).collect(),
            max_chars: 3000,
        }
    }
}

/// The top-level structure deserialized from a Concord TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcordConfig {
    pub consensus: ConsensusConfig,
    pub evidence: EvidenceConfig,
    pub policy: PolicyConfig,
}

impl ConcordConfig {
    /// Parse `s` as TOML.
    ///
    /// Returns `ConfigError` if the TOML is malformed, `executions` is zero,
    /// or the policy rules are inconsistent.
    pub fn from_toml_str(s: &str) -> ConcordResult<Self> {
        let config: ConcordConfig = toml::from_str(s).map_err(|e| ConcordError::ConfigError {
            reason: format!("failed to parse Concord TOML: {}", e),
        })?;
        config.validate()?;
        debug!(
            executions = config.consensus.executions,
            denied_hosts = config.evidence.denied_hosts.len(),
            policy_rules = config.policy.rules.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Read the file at `path` and parse it as Concord configuration.
    pub fn from_file(path: &Path) -> ConcordResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConcordError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    fn validate(&self) -> ConcordResult<()> {
        if self.consensus.executions == 0 {
            return Err(ConcordError::ConfigError {
                reason: "consensus.executions must be at least 1".to_string(),
            });
        }
        if self.evidence.max_chars == 0 {
            return Err(ConcordError::ConfigError {
                reason: "evidence.max_chars must be at least 1".to_string(),
            });
        }
        TomlPolicyHook::from_config(self.policy.clone()).map(|_| ())
    }

    pub fn policy_hook(&self) -> ConcordResult<TomlPolicyHook> {
        TomlPolicyHook::from_config(self.policy.clone())
    }

    pub fn denylist(&self) -> HostDenylist {
        HostDenylist::new(&self.evidence.denied_hosts)
    }
}
