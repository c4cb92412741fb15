//! Canonical payloads: the unit compared for consensus.
//!
//! A `CanonicalPayload` is a JSON object together with its canonical
//! serialization. Two payloads are equal iff their canonical serializations
//! are byte-identical.
//!
//! Canonical form: object keys sorted by byte order at every depth, array
//! order preserved, compact separators, scalars rendered by `serde_json`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConcordError, ConcordResult};

/// A normalized JSON object with a cached canonical serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct CanonicalPayload {
    object: Map<String, Value>,
    canonical: String,
}

impl CanonicalPayload {
    /// Build a canonical payload from a JSON object.
    ///
    /// Returns `ConfigError` when `value` is not an object.
    pub fn from_value(value: Value) -> ConcordResult<Self> {
        match value {
            Value::Object(object) => Ok(Self::from_object(object)),
            other => Err(ConcordError::ConfigError {
                reason: format!("canonical payload must be a JSON object, got {}", type_name(&other)),
            }),
        }
    }

    /// Build a canonical payload from an already-parsed object.
    pub fn from_object(object: Map<String, Value>) -> Self {
        let mut canonical = String::new();
        write_canonical(&Value::Object(object.clone()), &mut canonical);
        Self { object, canonical }
    }

    /// The canonical serialization.
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// The canonical serialization as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.canonical.as_bytes()
    }

    /// The underlying object.
    pub fn object(&self) -> &Map<String, Value> {
        &self.object
    }

    /// Look up a top-level field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.object.get(field)
    }

    /// Look up a top-level string field.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.object.get(field).and_then(Value::as_str)
    }

    /// Look up a top-level integer field.
    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.object.get(field).and_then(Value::as_i64)
    }

    /// Project onto a subset of fields.
    ///
    /// Fields absent from this payload appear as `null` in the projection, so
    /// a missing field never compares equal to a present one.
    pub fn project(&self, fields: &[String]) -> CanonicalPayload {
        let object = fields
            .iter()
            .map(|f| (f.clone(), self.object.get(f).cloned().unwrap_or(Value::Null)))
            .collect();
        Self::from_object(object)
    }
}

impl PartialEq for CanonicalPayload {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for CanonicalPayload {}

impl TryFrom<Value> for CanonicalPayload {
    type Error = ConcordError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<CanonicalPayload> for Value {
    fn from(payload: CanonicalPayload) -> Self {
        Value::Object(payload.object)
    }
}

/// Render `value` in canonical form.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (idx, (key, val)) in entries.into_iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(val, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
