//! Textual cleanup of raw oracle output.
//!
//! Strictly textual: no parsing and no validation happen here.

/// Case applied to short categorical answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoricalCase {
    Upper,
    Lower,
}

/// Answers longer than this are never case-normalized.
const CATEGORICAL_MAX_CHARS: usize = 32;

/// Strips whitespace and code-fence wrapping from oracle responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sanitizer {
    categorical_case: Option<CategoricalCase>,
}

impl Sanitizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize the case of short single-token answers such as `yes`.
    pub fn with_categorical_case(mut self, case: CategoricalCase) -> Self {
        self.categorical_case = Some(case);
        self
    }

    /// Clean `raw`.
    ///
    /// 1. Trim surrounding whitespace.
    /// 2. Drop a leading fence line (```` ``` ```` plus optional language tag)
    ///    and a trailing ```` ``` ````.
    /// 3. Trim again.
    /// 4. If configured, change the case of a short answer with no internal
    ///    whitespace.
    pub fn sanitize(&self, raw: &str) -> String {
        let mut text = raw.trim();

        if let Some(rest) = text.strip_prefix("```") {
            // The language tag, if any, runs to the end of the fence line.
            text = match rest.find('\n') {
                Some(newline) if is_fence_tag(&rest[..newline]) => &rest[newline + 1..],
                Some(_) => rest,
                None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
            };
        }
        if let Some(rest) = text.trim_end().strip_suffix("```") {
            text = rest;
        }
        let text = text.trim();

        match self.categorical_case {
            Some(case) if is_categorical(text) => match case {
                CategoricalCase::Upper => text.to_uppercase(),
                CategoricalCase::Lower => text.to_lowercase(),
            },
            _ => text.to_string(),
        }
    }
}

fn is_fence_tag(tag: &str) -> bool {
    tag.trim().chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn is_categorical(text: &str) -> bool {
    !text.is_empty()
        && text.chars().count() <= CATEGORICAL_MAX_CHARS
        && !text.chars().any(char::is_whitespace)
}
