//! Reference scenarios.
//!
//! Each scenario wires a reference runtime to a scripted oracle and an
//! in-memory ledger, walks through its accept and reject paths, and ends by
//! verifying the ledger's hash chain.

use concord_contracts::error::ConcordResult;
use concord_ledger::LedgerSnapshot;
use concord_policy::ConcordConfig;

pub mod claim_notary;
pub mod code_review;
pub mod dispute_arbitration;
pub mod guestbook_moderation;
pub mod persistent_ledger;
pub mod proposal_evaluation;
pub mod vibe_check;

/// Run every in-memory scenario in order.
pub fn run_all(config: &ConcordConfig) -> ConcordResult<()> {
    guestbook_moderation::run_scenario(config)?;
    proposal_evaluation::run_scenario(config)?;
    dispute_arbitration::run_scenario(config)?;
    claim_notary::run_scenario(config)?;
    vibe_check::run_scenario(config)?;
    code_review::run_scenario(config)?;
    Ok(())
}

fn print_integrity(snapshot: &LedgerSnapshot) {
    println!(
        "  Ledger chain integrity: {} ({} record(s), terminal hash {})",
        if snapshot.verify() { "VERIFIED" } else { "FAILED" },
        snapshot.records.len(),
        &snapshot.terminal_hash[..snapshot.terminal_hash.len().min(16)]
    );
}
