//! Oracle request types.

use serde::{Deserialize, Serialize};

/// The response shape requested from an oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    #[serde(rename = "text")]
    PlainText,
    #[serde(rename = "structured")]
    Structured,
}

/// What a domain does when its oracle call fails.
///
/// There is no single correct answer across domains, so each one declares
/// its own policy and documents it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleFailurePolicy {
    /// Propagate `OracleInvocation`; nothing is committed.
    Abort,
    /// Treat the failed execution as having produced the schema fallback.
    Fallback,
}
