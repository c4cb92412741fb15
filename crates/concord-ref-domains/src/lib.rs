//! # concord-ref-domains
//!
//! Reference domains for the Concord oracle-consensus pipeline.
//!
//! Each module pairs a `Domain` (schema, prompt, input rules, consensus
//! mode) with a small runtime that owns a pipeline and its ledger:
//!
//! 1. **Guestbook**: one-word moderation with a fail-closed fallback and a
//!    policy veto on flagged messages.
//! 2. **Proposal evaluation**: rubric scoring with a verdict-band rule;
//!    repeats of the same text are served from the ledger.
//! 3. **Dispute arbitration**: caller-chosen dispute ids, ruled once.
//! 4. **Claim notary**: evidence fetched through the host denylist, or
//!    pasted by the caller; executions compared on status only.
//! 5. **Vibe check**: PASS or FAIL on a single statement.
//! 6. **Code review**: scores a snippet from 1 to 10, keyed by language
//!    and code together.
//!
//! The `oracle` module provides a scripted oracle and a static evidence
//! fetcher, so the scenarios run offline and reproducibly.

pub mod code_review;
pub mod dispute;
pub mod guestbook;
pub mod notary;
pub mod oracle;
pub mod proposal;
pub mod runtime;
pub mod scenarios;
pub mod vibe;

pub use code_review::CodeReviewer;
pub use dispute::{DisputeFiling, DisputeResolver};
pub use guestbook::{Entry, Guestbook};
pub use notary::Notary;
pub use oracle::{Reply, ScriptedOracle, StaticFetcher};
pub use proposal::ProposalEvaluator;
pub use runtime::{default_config, PolicyChain, SharedLedger};
pub use vibe::VibeCheck;
