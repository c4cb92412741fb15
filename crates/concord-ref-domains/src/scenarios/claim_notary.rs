//! Scenario 4: Claim Notary
//!
//! A claim is verified against a fetched page, a social-media source is
//! refused before any fetch, and a claim with pasted evidence is verified
//! without fetching at all.

use std::sync::Arc;

use concord_contracts::error::ConcordResult;
use concord_ledger::InMemoryLedger;
use concord_policy::ConcordConfig;

use super::print_integrity;
use crate::{
    notary::Notary,
    oracle::{ScriptedOracle, StaticFetcher},
};

const REPORT_URL: &str = "https://www.example.org/reports/2025-water-quality";
const REPORT_PAGE: &str = "Annual water quality report. All 48 samples collected in 2025 met the \
    national drinking water standard. No lead above the action level was detected.";

const CLAIM: &str = "All 2025 water samples met the drinking water standard";
const PASTED_CLAIM: &str = "The library extended its weekend hours";

pub fn run_scenario(config: &ConcordConfig) -> ConcordResult<()> {
    println!("=== Scenario 4: Claim Notary ===");
    println!();

    let oracle = ScriptedOracle::new()
        .replies(
            CLAIM,
            [
                r#"{"status": "VERIFIED", "confidence": 92, "reasoning": "The report states all 48 samples met the standard.", "key_evidence": "All 48 samples met the standard."}"#,
                r#"{"status": "VERIFIED", "confidence": 88, "reasoning": "Every sample passed according to the report.", "key_evidence": "48 of 48 samples passed."}"#,
            ],
        )
        .reply(
            PASTED_CLAIM,
            r#"{"status": "VERIFIED", "confidence": 75, "reasoning": "The notice announces Saturday and Sunday opening until 8pm.", "key_evidence": "open Saturday and Sunday until 8pm"}"#,
        );
    let fetcher = StaticFetcher::new().page(REPORT_URL, REPORT_PAGE);
    let fetches = fetcher.call_counter();
    let ledger = Arc::new(InMemoryLedger::new());
    let notary = Notary::new(Box::new(oracle), fetcher, ledger.clone(), config)?;
    let fetch_count = || *fetches.lock().unwrap_or_else(|p| p.into_inner());

    // ── Sub-case A: fetched evidence ─────────────────────────────────────────

    println!("  Test A: \"{}\"", CLAIM);
    println!("  Source:                 {}", REPORT_URL);
    let record = notary.notarize(CLAIM, REPORT_URL)?;
    println!("  Status:                 {}", record.payload.get_str("status").unwrap_or("?"));
    println!("  Confidence:             {}", record.payload.get_i64("confidence").unwrap_or_default());
    println!("  Judged on:              status only (reasoning wording may differ)");
    println!();

    // ── Sub-case B: denied host ──────────────────────────────────────────────

    let denied_url = "https://twitter.com/waterboard/status/1";
    println!("  Test B: same claim, source {}", denied_url);
    match notary.notarize(CLAIM, denied_url) {
        Ok(_) => println!("  UNEXPECTED: notarized"),
        Err(e) => println!("  REJECTED: {}", e),
    }
    println!("  Pages fetched so far:   {}", fetch_count());
    println!();

    // ── Sub-case C: pasted evidence ──────────────────────────────────────────

    println!("  Test C: \"{}\" with pasted evidence", PASTED_CLAIM);
    let pasted = notary.notarize_with_evidence(
        PASTED_CLAIM,
        "Notice: starting in May the library is open Saturday and Sunday until 8pm.",
    )?;
    println!("  Status:                 {}", pasted.payload.get_str("status").unwrap_or("?"));
    println!("  Pages fetched so far:   {}", fetch_count());
    print_integrity(&ledger.export_snapshot());
    println!();
    println!("  Scenario 4 complete.");
    println!();

    Ok(())
}
