//! Output schemas for oracle responses.
//!
//! A `Schema` is an explicit, tagged description of the payload a domain
//! expects from its oracle: a list of typed fields, the response format, any
//! cross-field rules, and a fixed fallback instance that is substituted
//! whenever a response cannot be validated.
//!
//! The fallback is checked against the field list when the schema is built,
//! so a stored payload can always be assumed to satisfy its schema.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::{
    error::{ConcordError, ConcordResult},
    oracle::OutputFormat,
    payload::{type_name, CanonicalPayload},
};

/// The type and constraint of a single schema field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// An integer within `[min, max]` inclusive.
    ///
    /// JSON numbers with a zero fractional part (e.g. `8.0`) are coerced to
    /// integers; any other fractional value is a violation.
    Integer { min: i64, max: i64 },

    /// A string that must equal one of `allowed` exactly.
    Enum { allowed: Vec<String> },

    /// Any string.
    Text,

    /// An array whose elements are all strings.
    TextList,
}

impl FieldKind {
    /// Check `value` against this kind and return the coerced value.
    ///
    /// Returns a human-readable message describing the violation on failure.
    pub fn check(&self, value: &Value) -> Result<Value, String> {
        match self {
            FieldKind::Integer { min, max } => {
                let int = match value {
                    Value::Number(n) => integral(n)
                        .ok_or_else(|| format!("expected an integer, got {n}"))?,
                    other => return Err(format!("expected an integer, got {}", type_name(other))),
                };
                if int < *min || int > *max {
                    return Err(format!("{int} is outside the range {min}..={max}"));
                }
                Ok(Value::Number(int.into()))
            }
            FieldKind::Enum { allowed } => match value.as_str() {
                Some(s) if allowed.iter().any(|a| a == s) => Ok(Value::String(s.to_string())),
                Some(s) => Err(format!("'{s}' is not one of [{}]", allowed.join(", "))),
                None => Err(format!("expected a string, got {}", type_name(value))),
            },
            FieldKind::Text => match value {
                Value::String(_) => Ok(value.clone()),
                other => Err(format!("expected a string, got {}", type_name(other))),
            },
            FieldKind::TextList => match value {
                Value::Array(items) if items.iter().all(Value::is_string) => Ok(value.clone()),
                Value::Array(_) => Err("expected every list element to be a string".to_string()),
                other => Err(format!("expected a list, got {}", type_name(other))),
            },
        }
    }
}

fn integral(n: &Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    let f = n.as_f64()?;
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// A single named, typed field in a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn integer(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self { name: name.into(), kind: FieldKind::Integer { min, max } }
    }

    pub fn one_of(name: impl Into<String>, allowed: &[&str]) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Enum { allowed: allowed.iter().map(|s| s.to_string()).collect() },
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: FieldKind::Text }
    }

    pub fn text_list(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: FieldKind::TextList }
    }
}

/// How the oracle is expected to phrase its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum ResponseFormat {
    /// A JSON object carrying the schema fields.
    Structured,

    /// A bare textual answer that becomes the value of `field`.
    PlainText { field: String },
}

impl ResponseFormat {
    /// The format requested from the oracle.
    pub fn output_format(&self) -> OutputFormat {
        match self {
            ResponseFormat::Structured => OutputFormat::Structured,
            ResponseFormat::PlainText { .. } => OutputFormat::PlainText,
        }
    }
}

/// A cross-field rule resolved by name in the validator's registry.
///
/// Field-level constraints live on `FieldKind`; these rules cover relations
/// between fields that a flat field list cannot express.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRule {
    /// Referenced in fallback reasons and logs.
    pub rule_id: String,
    pub description: String,
    /// Name of the function registered with the validator.
    pub function_name: String,
}

/// The full description a response is validated against.
#[derive(Debug, Clone)]
pub struct Schema {
    schema_id: String,
    fields: Vec<FieldSpec>,
    response_format: ResponseFormat,
    rules: Vec<SchemaRule>,
    fallback: CanonicalPayload,
}

impl Schema {
    /// Build a schema and canonicalize its fallback instance.
    ///
    /// Returns `ConfigError` if field names repeat, if a plain-text format
    /// names a field that is not declared, or if `fallback` does not conform
    /// to the declared fields.
    pub fn new(
        schema_id: impl Into<String>,
        fields: Vec<FieldSpec>,
        response_format: ResponseFormat,
        fallback: Value,
    ) -> ConcordResult<Self> {
        let schema_id = schema_id.into();

        for (idx, field) in fields.iter().enumerate() {
            if fields[..idx].iter().any(|f| f.name == field.name) {
                return Err(ConcordError::ConfigError {
                    reason: format!("schema '{schema_id}' declares field '{}' twice", field.name),
                });
            }
        }

        if let ResponseFormat::PlainText { field } = &response_format {
            if !fields.iter().any(|f| &f.name == field) {
                return Err(ConcordError::ConfigError {
                    reason: format!(
                        "schema '{schema_id}' reads plain text into undeclared field '{field}'"
                    ),
                });
            }
        }

        let fallback_object = match fallback {
            Value::Object(map) => map,
            other => {
                return Err(ConcordError::ConfigError {
                    reason: format!(
                        "fallback for schema '{schema_id}' must be an object, got {}",
                        type_name(&other)
                    ),
                })
            }
        };

        let mut schema = Self {
            schema_id,
            fields,
            response_format,
            rules: Vec::new(),
            fallback: CanonicalPayload::from_object(Map::new()),
        };

        schema.fallback = schema.conform(&fallback_object).map_err(|reason| ConcordError::ConfigError {
            reason: format!("fallback for schema '{}' is invalid: {reason}", schema.schema_id),
        })?;

        Ok(schema)
    }

    /// Attach a cross-field rule.
    pub fn with_rule(
        mut self,
        rule_id: impl Into<String>,
        description: impl Into<String>,
        function_name: impl Into<String>,
    ) -> Self {
        self.rules.push(SchemaRule {
            rule_id: rule_id.into(),
            description: description.into(),
            function_name: function_name.into(),
        });
        self
    }

    pub fn schema_id(&self) -> &str {
        &self.schema_id
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn response_format(&self) -> &ResponseFormat {
        &self.response_format
    }

    pub fn rules(&self) -> &[SchemaRule] {
        &self.rules
    }

    /// The documented fallback instance, already canonical.
    pub fn fallback(&self) -> &CanonicalPayload {
        &self.fallback
    }

    /// Check every declared field in `object` and build the canonical payload.
    ///
    /// Only declared fields are carried into the result; undeclared fields
    /// are dropped. The first violation is reported as `Err(message)`.
    pub fn conform(&self, object: &Map<String, Value>) -> Result<CanonicalPayload, String> {
        let mut canonical = Map::new();
        for field in &self.fields {
            let value = object
                .get(&field.name)
                .ok_or_else(|| format!("required field '{}' is missing", field.name))?;
            let coerced = field
                .kind
                .check(value)
                .map_err(|msg| format!("field '{}': {msg}", field.name))?;
            canonical.insert(field.name.clone(), coerced);
        }
        Ok(CanonicalPayload::from_object(canonical))
    }
}

/// The outcome of validating one oracle response.
///
/// Validation never fails outright: a response that cannot be validated is
/// replaced by the schema's fallback and the reason is kept for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Validated(CanonicalPayload),
    Fallback { payload: CanonicalPayload, reason: String },
}

impl Validation {
    /// Substitute the schema fallback for the given reason.
    pub fn fallback(schema: &Schema, reason: impl Into<String>) -> Self {
        Validation::Fallback { payload: schema.fallback().clone(), reason: reason.into() }
    }

    pub fn payload(&self) -> &CanonicalPayload {
        match self {
            Validation::Validated(payload) | Validation::Fallback { payload, .. } => payload,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Validation::Fallback { .. })
    }
}
