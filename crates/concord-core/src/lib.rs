//! # concord-core
//!
//! The deterministic oracle-consensus pipeline.
//!
//! This crate provides:
//! - The capability traits (`OracleInvoker`, `Validator`, `PolicyHook`,
//!   `Ledger`, `EvidenceFetcher`, `Domain`)
//! - Content addressing, prompt templates, response sanitizing, input checks
//! - The `ConsensusGate` that compares independent executions
//! - The `Pipeline` that wires them together in commit order
//!
//! ## Usage
//!
//! ```rust,ignore
//! use concord_core::{Pipeline, traits::{Domain, Ledger, OracleInvoker, Validator}};
//! ```

pub mod addressor;
pub mod consensus;
pub mod input;
pub mod pipeline;
pub mod prompt;
pub mod sanitize;
pub mod traits;

pub use addressor::{content_key, encode_parts};
pub use consensus::{ConsensusGate, ExecutionPlan};
pub use pipeline::{Pipeline, DEFAULT_EXECUTIONS};
pub use prompt::{PromptFields, PromptTemplate};
pub use sanitize::{CategoricalCase, Sanitizer};
