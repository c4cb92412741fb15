//! Wiring shared by the reference runtimes.
//!
//! Every runtime is one `Pipeline` plus the ledger it commits to. The
//! deployment configuration supplies the execution count and the
//! deployment-wide policy rules; a domain may add its own policy in front.

use std::sync::Arc;

use tracing::debug;

use concord_contracts::{error::ConcordResult, payload::CanonicalPayload, policy::PolicyVerdict};
use concord_core::{
    traits::{Domain, Ledger, OracleInvoker, PolicyHook},
    Pipeline, Sanitizer,
};
use concord_policy::{ConcordConfig, TomlPolicyHook};
use concord_verify::SchemaValidator;

/// The configuration shipped at `config/concord.toml`.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../../config/concord.toml");

/// Parse the shipped configuration.
pub fn default_config() -> ConcordResult<ConcordConfig> {
    ConcordConfig::from_toml_str(DEFAULT_CONFIG_TOML)
}

// ── Policy chain ──────────────────────────────────────────────────────────────

/// Several policy hooks reviewed in order. The first veto wins.
#[derive(Default)]
pub struct PolicyChain {
    hooks: Vec<Box<dyn PolicyHook>>,
}

impl PolicyChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, hook: Box<dyn PolicyHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl PolicyHook for PolicyChain {
    fn review(&self, schema_id: &str, payload: &CanonicalPayload) -> ConcordResult<PolicyVerdict> {
        for hook in &self.hooks {
            if let veto @ PolicyVerdict::Veto { .. } = hook.review(schema_id, payload)? {
                return Ok(veto);
            }
        }
        Ok(PolicyVerdict::Allow)
    }
}

// ── Pipeline assembly ─────────────────────────────────────────────────────────

/// The parts a runtime needs beyond its domain and oracle.
pub(crate) struct Wiring {
    pub validator: SchemaValidator,
    pub sanitizer: Sanitizer,
    /// Domain policy reviewed before the deployment rules.
    pub domain_policy: Option<TomlPolicyHook>,
}

impl Wiring {
    pub fn new(validator: SchemaValidator) -> Self {
        Self { validator, sanitizer: Sanitizer::new(), domain_policy: None }
    }

    pub fn sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn domain_policy(mut self, hook: TomlPolicyHook) -> Self {
        self.domain_policy = Some(hook);
        self
    }

    /// Build the pipeline for `domain`.
    pub fn build(
        self,
        domain: Box<dyn Domain>,
        oracle: Box<dyn OracleInvoker>,
        config: &ConcordConfig,
    ) -> ConcordResult<Pipeline> {
        let mut chain = PolicyChain::new();
        if let Some(hook) = self.domain_policy {
            chain = chain.with(Box::new(hook));
        }
        chain = chain.with(Box::new(config.policy_hook()?));

        debug!(
            domain = %domain.name(),
            executions = config.consensus.executions,
            policy_hooks = chain.len(),
            "wiring pipeline"
        );

        Ok(Pipeline::new(domain, oracle, Box::new(self.validator))?
            .with_sanitizer(self.sanitizer)
            .with_executions(config.consensus.executions)?
            .with_policy_hook(Box::new(chain)))
    }
}

/// A ledger handle shared between a runtime and its caller.
pub type SharedLedger = Arc<dyn Ledger>;
