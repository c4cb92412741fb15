//! Scenario 5: Vibe Check
//!
//! A kind statement passes on every execution and is recorded. A statement
//! the executions split on never reaches the ledger.

use std::sync::Arc;

use concord_contracts::error::ConcordResult;
use concord_ledger::InMemoryLedger;
use concord_policy::ConcordConfig;

use super::print_integrity;
use crate::{oracle::ScriptedOracle, vibe::VibeCheck};

const KIND: &str = "Thanks for staying late to help me fix the build";
const AMBIGUOUS: &str = "Well, that was certainly a choice";

pub fn run_scenario(config: &ConcordConfig) -> ConcordResult<()> {
    println!("=== Scenario 5: Vibe Check ===");
    println!();

    let oracle = ScriptedOracle::new()
        .reply(KIND, r#"{"vibe_status": "PASS", "vibe_score": 9, "reasoning": "Grateful and warm."}"#)
        .replies(
            AMBIGUOUS,
            [
                r#"{"vibe_status": "PASS", "vibe_score": 5, "reasoning": "Neutral remark."}"#,
                r#"{"vibe_status": "FAIL", "vibe_score": 3, "reasoning": "Reads as sarcastic."}"#,
            ],
        );
    let ledger = Arc::new(InMemoryLedger::new());
    let vibe = VibeCheck::new(Box::new(oracle), ledger.clone(), config)?;

    println!("  Test A: \"{}\"", KIND);
    let record = vibe.check(KIND)?;
    println!("  Vibe status:            {}", record.payload.get_str("vibe_status").unwrap_or("?"));
    println!("  Vibe score:             {}", record.payload.get_i64("vibe_score").unwrap_or_default());
    println!();

    println!("  Test B: \"{}\"", AMBIGUOUS);
    match vibe.check(AMBIGUOUS) {
        Ok(record) => println!("  Vibe status:            {}", record.payload.get_str("vibe_status").unwrap_or("?")),
        Err(e) => println!("  NOT RECORDED: {}", e),
    }
    println!("  Checks on ledger:       {}", ledger.len());
    print_integrity(&ledger.export_snapshot());
    println!();
    println!("  Scenario 5 complete.");
    println!();

    Ok(())
}
