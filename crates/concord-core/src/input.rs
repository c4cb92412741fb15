//! Fail-fast submission checks, run before any oracle call.

use concord_contracts::{
    error::{ConcordError, ConcordResult},
    submission::{InputRule, Submission},
};

/// Apply every rule in order; the first violation is returned.
pub fn check_input(submission: &Submission, rules: &[InputRule]) -> ConcordResult<()> {
    for rule in rules {
        let value = submission.source(&rule.source);
        let trimmed_chars = value.trim().chars().count();

        if trimmed_chars < rule.min_trimmed_chars {
            let reason = if rule.min_trimmed_chars <= 1 {
                format!("{} cannot be empty", rule.label)
            } else {
                format!("{} must be at least {} characters", rule.label, rule.min_trimmed_chars)
            };
            return Err(ConcordError::InputValidation { reason });
        }

        if let Some(max) = rule.max_chars {
            if value.chars().count() > max {
                return Err(ConcordError::InputValidation {
                    reason: format!("{} exceeds maximum length ({} characters)", rule.label, max),
                });
            }
        }
    }
    Ok(())
}
