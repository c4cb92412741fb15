//! Scenario 2: DAO Proposal Evaluation
//!
//! A proposal is scored on the six-dimension rubric and approved with a
//! final score of 82. Submitting the same text again is served from the
//! ledger: the oracle invocation count does not move.

use std::sync::Arc;

use concord_contracts::error::ConcordResult;
use concord_ledger::InMemoryLedger;
use concord_policy::ConcordConfig;

use super::print_integrity;
use crate::{oracle::ScriptedOracle, proposal::ProposalEvaluator};

/// The sample proposal used by the demo and the integration tests.
pub const PROPOSAL: &str = "Fund a six-month community translation program that localizes the \
    protocol documentation into five languages, with milestone-based payouts to contributors.";

/// A well-formed evaluation that approves `PROPOSAL`.
pub const APPROVAL: &str = r#"{
    "clarity": 9,
    "feasibility": 8,
    "risk": 7,
    "alignment": 9,
    "budget": 8,
    "completeness": 8,
    "final_score": 82,
    "verdict": "approve",
    "summary": "Clear scope and milestones with a reasonable budget for the stated outcomes."
}"#;

pub fn run_scenario(config: &ConcordConfig) -> ConcordResult<()> {
    println!("=== Scenario 2: DAO Proposal Evaluation ===");
    println!();

    let oracle = ScriptedOracle::new().reply("community translation program", format!("```json\n{APPROVAL}\n```"));
    let calls = oracle.call_counter();
    let ledger = Arc::new(InMemoryLedger::new());
    let evaluator = ProposalEvaluator::new(Box::new(oracle), ledger.clone(), config)?;
    let invocations = || *calls.lock().unwrap_or_else(|p| p.into_inner());

    println!("  Test: evaluate proposal (budget 50000, timeline Q2 2026)");
    println!("  Executions required:    {}", config.consensus.executions);
    println!();

    let record = evaluator.submit(PROPOSAL, 50_000, "Q2 2026", "Open-source education")?;
    println!("  Verdict:                {}", record.payload.get_str("verdict").unwrap_or("?"));
    println!("  Final score:            {}", record.payload.get_i64("final_score").unwrap_or_default());
    println!("  Payload origin:         {}", record.origin.as_str());
    println!("  Oracle invocations:     {}", invocations());
    println!();

    println!("  Test: resubmit the identical text");
    let again = evaluator.submit(PROPOSAL, 50_000, "Q2 2026", "Open-source education")?;
    println!(
        "  Same record returned:   {} (sequence {})",
        if again == record { "YES" } else { "NO" },
        again.sequence
    );
    println!("  Oracle invocations:     {} (unchanged)", invocations());
    println!();

    let by_text = evaluator.evaluation(PROPOSAL)?;
    println!("  Lookup by text:         {}", by_text.key);
    println!("  Evaluations on ledger:  {}", evaluator.list_keys()?.len());
    print_integrity(&ledger.export_snapshot());
    println!();
    println!("  Scenario 2 complete.");
    println!();

    Ok(())
}
