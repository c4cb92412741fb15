//! Scenario 6: Code Review
//!
//! A snippet with an injection flaw is reviewed and recorded; asking again
//! costs no oracle call. A snippet whose executions disagree on the review
//! is not recorded.

use std::sync::Arc;

use concord_contracts::error::ConcordResult;
use concord_ledger::InMemoryLedger;
use concord_policy::ConcordConfig;

use super::print_integrity;
use crate::{code_review::CodeReviewer, oracle::ScriptedOracle};

pub const LOOKUP: &str = "def find_user(name):\n    return db.execute(\"SELECT * FROM users WHERE name = '\" + name + \"'\")";

pub const LOOKUP_REVIEW: &str = r#"{
    "score": 4,
    "readability": 7,
    "security": 2,
    "efficiency": 6,
    "best_practices": 4,
    "summary": "Readable, but the query is built by string concatenation and is open to SQL injection.",
    "top_issues": ["SQL injection through the name parameter"],
    "strengths": ["short and focused"],
    "improvements": ["use a parameterized query", "select only the needed columns"]
}"#;

const SORT: &str = "function sortScores(xs) { return xs.sort(); }";

pub fn run_scenario(config: &ConcordConfig) -> ConcordResult<()> {
    println!("=== Scenario 6: Code Review ===");
    println!();

    let oracle = ScriptedOracle::new().reply("find_user", LOOKUP_REVIEW).replies(
        "sortScores",
        [
            LOOKUP_REVIEW.replace("\"score\": 4", "\"score\": 5"),
            LOOKUP_REVIEW.replace("\"score\": 4", "\"score\": 3"),
        ],
    );
    let calls = oracle.call_counter();
    let ledger = Arc::new(InMemoryLedger::new());
    let reviewer = CodeReviewer::new(Box::new(oracle), ledger.clone(), config)?;
    let call_count = || *calls.lock().unwrap_or_else(|p| p.into_inner());

    println!("  Test A: python lookup helper");
    let review = reviewer.review(LOOKUP, "python")?;
    println!("  Score:                  {}/10", review.payload.get_i64("score").unwrap_or_default());
    println!("  Security:               {}/10", review.payload.get_i64("security").unwrap_or_default());
    println!("  Summary:                {}", review.payload.get_str("summary").unwrap_or("?"));
    println!("  Oracle calls:           {}", call_count());
    println!();

    println!("  Test B: same snippet again");
    let score = reviewer.score(LOOKUP, "python")?;
    println!("  Score:                  {}/10 (served from ledger)", score);
    println!("  Oracle calls:           {}", call_count());
    println!();

    println!("  Test C: javascript sort with split reviews");
    match reviewer.review(SORT, "javascript") {
        Ok(_) => println!("  UNEXPECTED: recorded"),
        Err(e) => println!("  NOT RECORDED: {}", e),
    }
    println!("  Reviews on ledger:      {}", ledger.len());
    print_integrity(&ledger.export_snapshot());
    println!();
    println!("  Scenario 6 complete.");
    println!();

    Ok(())
}
