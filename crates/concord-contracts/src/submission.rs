//! Caller submissions, identifier strategies, and input rules.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How a domain derives the ledger key for a submission.
///
/// The two strategies are not interchangeable: they differ in what a repeat
/// submission means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierStrategy {
    /// Key is the SHA-256 digest of the primary input. A repeat is an
    /// idempotent cache hit returning the stored record.
    ContentDerived,

    /// Key is supplied by the caller. A repeat is a `DuplicateKey` error.
    CallerSupplied,
}

/// One request to a domain pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// The primary free-form text (proposal, message, claim, ...).
    pub input: String,
    /// The caller-chosen key, for caller-supplied domains.
    pub caller_key: Option<String>,
    /// Additional named inputs used by the prompt and the record subject.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl Submission {
    pub fn new(input: impl Into<String>) -> Self {
        Self { input: input.into(), ..Self::default() }
    }

    pub fn with_caller_key(mut self, key: impl Into<String>) -> Self {
        self.caller_key = Some(key.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// A named field, or `None` when absent.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// The value an input rule applies to. Absent fields read as empty.
    pub fn source(&self, source: &InputSource) -> &str {
        match source {
            InputSource::Primary => &self.input,
            InputSource::CallerKey => self.caller_key.as_deref().unwrap_or(""),
            InputSource::Field(name) => self.field(name).unwrap_or(""),
        }
    }
}

/// Which part of a submission an `InputRule` checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    Primary,
    CallerKey,
    Field(String),
}

/// A length constraint on one part of a submission.
///
/// The minimum is measured on the whitespace-trimmed value, the maximum on
/// the raw value; both count characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRule {
    pub source: InputSource,
    /// Human-readable name used in error messages (e.g. "Party A argument").
    pub label: String,
    pub min_trimmed_chars: usize,
    pub max_chars: Option<usize>,
}

impl InputRule {
    pub fn new(source: InputSource, label: impl Into<String>) -> Self {
        Self { source, label: label.into(), min_trimmed_chars: 1, max_chars: None }
    }

    pub fn min_chars(mut self, min: usize) -> Self {
        self.min_trimmed_chars = min;
        self
    }

    pub fn max_chars(mut self, max: usize) -> Self {
        self.max_chars = Some(max);
        self
    }
}
