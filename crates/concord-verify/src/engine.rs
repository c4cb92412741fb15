//! Schema-based response validator for the Concord pipeline.
//!
//! `SchemaValidator` implements the `Validator` trait from `concord-core`.
//! A cleaned oracle response goes through four phases, and the first
//! violation in any of them replaces the response with the schema fallback:
//!
//! 1. **Parse**: structured responses must be a JSON object; plain-text
//!    responses become `{field: text}`.
//! 2. **Structural**: the candidate is checked against a JSON Schema
//!    document derived from the schema's fields.
//! 3. **Fields**: each declared field is type-checked and coerced, and
//!    undeclared fields are dropped, yielding the canonical payload.
//! 4. **Rules**: cross-field rules delegate to named functions registered
//!    via `register_rule`.
//!
//! Validation is total. It never returns an error and never panics on
//! oracle output.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use concord_contracts::{
    payload::CanonicalPayload,
    schema::{ResponseFormat, Schema, Validation},
};
use concord_core::traits::Validator;

use crate::document::structural_document;

/// A cross-field check over an already field-checked payload.
///
/// Returns `Some(message)` when the check fails, `None` on success.
pub type RuleFn = Box<dyn Fn(&CanonicalPayload) -> Option<String> + Send + Sync>;

/// The Concord response validator.
pub struct SchemaValidator {
    rules: HashMap<String, RuleFn>,
}

impl SchemaValidator {
    /// Create a validator with no cross-field rules registered.
    pub fn new() -> Self {
        Self { rules: HashMap::new() }
    }

    /// Register a rule function under `name`.
    ///
    /// The name must match a `SchemaRule::function_name`. Registering the
    /// same name twice replaces the previous function.
    pub fn register_rule(&mut self, name: impl Into<String>, f: RuleFn) {
        self.rules.insert(name.into(), f);
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    fn parse(cleaned: &str, schema: &Schema) -> Result<Map<String, Value>, String> {
        match schema.response_format() {
            ResponseFormat::PlainText { field } => {
                let mut object = Map::new();
                object.insert(field.clone(), Value::String(cleaned.to_string()));
                Ok(object)
            }
            ResponseFormat::Structured => match serde_json::from_str::<Value>(cleaned) {
                Ok(Value::Object(object)) => Ok(object),
                Ok(_) => Err("response is valid JSON but not an object".to_string()),
                Err(e) => Err(format!("response is not valid JSON: {e}")),
            },
        }
    }

    fn check_structure(candidate: &Value, schema: &Schema) -> Result<(), String> {
        let validator = jsonschema::validator_for(&structural_document(schema))
            .map_err(|e| format!("invalid structural document: {e}"))?;

        let violations: Vec<String> = validator
            .iter_errors(candidate)
            .map(|error| format!("JSON Schema violation at {}: {}", error.instance_path, error))
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations.join("; "))
        }
    }

    fn check_rules(&self, payload: &CanonicalPayload, schema: &Schema) -> Result<(), String> {
        for rule in schema.rules() {
            debug!(rule_id = %rule.rule_id, description = %rule.description, "evaluating schema rule");
            let failure = match self.rules.get(rule.function_name.as_str()) {
                Some(f) => f(payload),
                None => Some(format!("no rule registered for function name '{}'", rule.function_name)),
            };
            if let Some(message) = failure {
                return Err(format!("[{}] {message}", rule.rule_id));
            }
        }
        Ok(())
    }

    fn run(&self, cleaned: &str, schema: &Schema) -> Result<CanonicalPayload, String> {
        let object = Self::parse(cleaned, schema)?;
        Self::check_structure(&Value::Object(object.clone()), schema)?;

        let payload = schema.conform(&object)?;
        self.check_rules(&payload, schema)?;
        Ok(payload)
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for SchemaValidator {
    fn validate(&self, cleaned: &str, schema: &Schema) -> Validation {
        match self.run(cleaned, schema) {
            Ok(payload) => {
                debug!(schema_id = %schema.schema_id(), "response validated");
                Validation::Validated(payload)
            }
            Err(reason) => {
                warn!(schema_id = %schema.schema_id(), %reason, "response rejected, using fallback");
                Validation::fallback(schema, reason)
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
