//! Deterministic prompt rendering.
//!
//! A `PromptTemplate` is parsed once into literal and placeholder segments.
//! Rendering only substitutes caller-provided values, so identical field
//! values always yield an identical prompt on every party. There is no
//! way for a clock, random value, or caller identity to enter the text
//! except through an explicit field.
//!
//! Syntax: `{name}` is a placeholder; `{{` and `}}` are literal braces.

use std::collections::BTreeMap;

use concord_contracts::error::{ConcordError, ConcordResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Parse `text`.
    ///
    /// Returns `ConfigError` for an unterminated or empty placeholder, or a
    /// stray closing brace.
    pub fn new(text: &str) -> ConcordResult<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) => name.push(ch),
                            None => {
                                return Err(ConcordError::ConfigError {
                                    reason: format!("unterminated placeholder '{{{name}' in prompt template"),
                                })
                            }
                        }
                    }
                    let name = name.trim().to_string();
                    if name.is_empty() {
                        return Err(ConcordError::ConfigError {
                            reason: "empty placeholder '{}' in prompt template".to_string(),
                        });
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(name));
                }
                '}' => {
                    return Err(ConcordError::ConfigError {
                        reason: "unmatched '}' in prompt template; use '}}' for a literal brace"
                            .to_string(),
                    })
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// Placeholder names in order of first appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Placeholder(name) = segment {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Substitute `fields` into the template.
    ///
    /// Every placeholder must have a value; a missing one is a `ConfigError`
    /// because it indicates a domain wiring bug, not bad caller input.
    pub fn render(&self, fields: &PromptFields) -> ConcordResult<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = fields.get(name).ok_or_else(|| ConcordError::ConfigError {
                        reason: format!("prompt placeholder '{name}' has no value"),
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

/// Named values substituted into a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptFields {
    values: BTreeMap<String, String>,
}

impl PromptFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Set `value`, or `default` when `value` is empty after trimming.
    pub fn set_or(self, name: impl Into<String>, value: &str, default: &str) -> Self {
        if value.trim().is_empty() {
            self.set(name, default)
        } else {
            self.set(name, value)
        }
    }

    /// Set at most the first `max_chars` characters of `value`.
    pub fn set_truncated(self, name: impl Into<String>, value: &str, max_chars: usize) -> Self {
        let truncated: String = value.chars().take(max_chars).collect();
        self.set(name, truncated)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}
