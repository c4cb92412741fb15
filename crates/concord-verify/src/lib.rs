//! # concord-verify
//!
//! Oracle response validation for the Concord pipeline.
//!
//! This crate provides [`engine::SchemaValidator`], which implements the
//! [`concord_core::traits::Validator`] trait. A cleaned response either
//! becomes a canonical payload or is replaced by the schema fallback:
//!
//! 1. **Parse**: JSON object, or plain text wrapped into one field.
//! 2. **Structural**: JSON Schema validation via the `jsonschema` crate.
//! 3. **Fields**: type checks, range checks, integer coercion.
//! 4. **Rules**: cross-field functions registered by domain adapters.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use concord_verify::engine::SchemaValidator;
//!
//! let mut validator = SchemaValidator::new();
//! validator.register_rule("score_band", Box::new(|payload| {
//!     match payload.get_i64("final_score") {
//!         Some(score) if score > 100 => Some("score out of band".to_string()),
//!         _ => None,
//!     }
//! }));
//! ```

pub mod document;
pub mod engine;

pub use engine::{RuleFn, SchemaValidator};
