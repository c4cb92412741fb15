//! Scenario 7: Persistent Ledger
//!
//! The guestbook commits to a JSON Lines ledger file. The file is reopened,
//! its hash chain replayed and re-verified, and the latest entry survives
//! the restart.

use std::{path::Path, sync::Arc};

use concord_contracts::error::ConcordResult;
use concord_ledger::JsonlLedger;
use concord_policy::ConcordConfig;

use super::print_integrity;
use crate::{guestbook::Guestbook, oracle::ScriptedOracle};

const MESSAGES: [(&str, &str); 2] = [
    ("Lovely meetup, see you all next month", "0xa11ce"),
    ("Thanks for organizing the workshop", "0xb0b"),
];

fn oracle() -> ScriptedOracle {
    MESSAGES.iter().fold(ScriptedOracle::new(), |oracle, (message, _)| oracle.reply(*message, "NO"))
}

pub fn run_scenario(config: &ConcordConfig, path: &Path) -> ConcordResult<()> {
    println!("=== Scenario 7: Persistent Ledger ===");
    println!();
    println!("  Ledger file:            {}", path.display());

    {
        let ledger = Arc::new(JsonlLedger::open(path)?);
        println!("  Records before run:     {}", ledger.len());
        let guestbook = Guestbook::new(Box::new(oracle()), ledger.clone(), config)?;
        for (message, sender) in MESSAGES {
            let record = guestbook.sign(message, sender)?;
            println!("  Signed (sequence {}):   \"{}\"", record.sequence, message);
        }
    }
    println!();

    let reopened = Arc::new(JsonlLedger::open(path)?);
    println!("  Reopened, records:      {}", reopened.len());
    let guestbook = Guestbook::new(Box::new(ScriptedOracle::new()), reopened.clone(), config)?;
    let latest = guestbook.latest_entry()?;
    println!("  Latest entry:           \"{}\" by {}", latest.message, latest.sender);
    print_integrity(&reopened.export_snapshot());
    println!();
    println!("  Scenario 7 complete.");
    println!();

    Ok(())
}
