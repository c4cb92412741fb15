//! Scenario 1: Guestbook Moderation
//!
//! A polite message is classified `NO` by every execution and recorded. A
//! spam message is classified `YES`; the guestbook policy vetoes it and the
//! ledger is left untouched. The latest entry still shows the polite one.

use std::sync::Arc;

use concord_contracts::error::ConcordResult;
use concord_ledger::InMemoryLedger;
use concord_policy::ConcordConfig;

use super::print_integrity;
use crate::{guestbook::Guestbook, oracle::ScriptedOracle};

const POLITE: &str = "Great job everyone, thanks for your help!";
const SPAM: &str = "BUY CHEAP FOLLOWERS NOW!!! click my link";

pub fn run_scenario(config: &ConcordConfig) -> ConcordResult<()> {
    println!("=== Scenario 1: Guestbook Moderation ===");
    println!();

    let oracle = ScriptedOracle::new().reply(POLITE, "NO").reply(SPAM, "yes");
    let calls = oracle.call_counter();
    let ledger = Arc::new(InMemoryLedger::new());
    let guestbook = Guestbook::new(Box::new(oracle), ledger.clone(), config)?;

    let welcome = guestbook.latest_entry()?;
    println!("  Empty guestbook shows:  \"{}\" by {}", welcome.message, welcome.sender);
    println!();

    // ── Sub-case A: polite message ───────────────────────────────────────────

    println!("  Test A: sign \"{}\"", POLITE);
    let record = guestbook.sign(POLITE, "0x5eed")?;
    println!("  Moderation status:      {}", record.payload.get_str("status").unwrap_or("?"));
    println!("  Recorded at sequence:   {}", record.sequence);
    println!("  Record key:             {}", record.key);
    println!();

    // ── Sub-case B: spam message ─────────────────────────────────────────────

    println!("  Test B: sign \"{}\"", SPAM);
    match guestbook.sign(SPAM, "0xbad") {
        Ok(record) => println!("  UNEXPECTED: recorded at sequence {}", record.sequence),
        Err(e) => println!("  REJECTED: {}", e),
    }
    println!();

    let latest = guestbook.latest_entry()?;
    println!("  Latest entry:           \"{}\" by {}", latest.message, latest.sender);
    println!("  Oracle invocations:     {}", *calls.lock().unwrap_or_else(|p| p.into_inner()));
    print_integrity(&ledger.export_snapshot());
    println!();
    println!("  Scenario 1 complete.");
    println!();

    Ok(())
}
