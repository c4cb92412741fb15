//! Concord Reference Domains: Demo CLI
//!
//! Runs one or all of the reference scenarios. Each scenario uses the real
//! Concord components (pipeline, consensus gate, validator, policy hook,
//! hash-chained ledger) wired to a scripted oracle, so runs are offline and
//! reproducible.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- guestbook
//!   cargo run -p demo -- --executions 5 proposal
//!   cargo run -p demo -- --config config/concord.toml notary
//!   cargo run -p demo -- code-review
//!   cargo run -p demo -- persistent --ledger /tmp/guestbook.jsonl

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use concord_contracts::error::ConcordResult;
use concord_policy::ConcordConfig;
use concord_ref_domains::{
    default_config,
    scenarios::{
        self, claim_notary, code_review, dispute_arbitration, guestbook_moderation, persistent_ledger,
        proposal_evaluation, vibe_check,
    },
};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Concord: oracle-consensus record pipeline demo.
///
/// Each subcommand runs one or all of the reference scenarios, showing
/// input checks, independent executions, agreement, policy vetoes, and
/// ledger integrity.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "Concord reference domains demo",
    long_about = "Runs Concord reference scenarios showing input validation, consensus\n\
                  across independent executions, policy vetoes, and ledger chain integrity."
)]
struct Cli {
    /// Configuration file. Defaults to the shipped config/concord.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the number of independent executions per submission.
    #[arg(long, global = true)]
    executions: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the six in-memory scenarios in sequence.
    RunAll,
    /// Scenario 1: Guestbook Moderation (fail-closed fallback, policy veto).
    Guestbook,
    /// Scenario 2: DAO Proposal Evaluation (verdict band, cached repeats).
    Proposal,
    /// Scenario 3: Dispute Arbitration (input checks, duplicate ids).
    Dispute,
    /// Scenario 4: Claim Notary (host denylist, pasted evidence).
    Notary,
    /// Scenario 5: Vibe Check (comparative consensus, disagreement).
    Vibe,
    /// Scenario 6: Code Review (strict consensus, cached repeats).
    CodeReview,
    /// Scenario 7: Persistent Ledger (JSON Lines file, replay on reopen).
    Persistent {
        /// Ledger file to create or extend.
        #[arg(long, default_value = "concord-guestbook.jsonl")]
        ledger: PathBuf,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Initialize structured logging. Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = load_config(&cli).and_then(|config| run(cli.command, &config));

    match result {
        Ok(()) => {
            println!("All selected scenarios completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

fn load_config(cli: &Cli) -> ConcordResult<ConcordConfig> {
    let mut config = match &cli.config {
        Some(path) => ConcordConfig::from_file(path)?,
        None => default_config()?,
    };
    if let Some(executions) = cli.executions {
        config.consensus.executions = executions;
    }
    info!(executions = config.consensus.executions, "configuration ready");
    Ok(config)
}

// ── Scenario dispatch ─────────────────────────────────────────────────────────

fn run(command: Command, config: &ConcordConfig) -> ConcordResult<()> {
    match command {
        Command::RunAll => scenarios::run_all(config),
        Command::Guestbook => guestbook_moderation::run_scenario(config),
        Command::Proposal => proposal_evaluation::run_scenario(config),
        Command::Dispute => dispute_arbitration::run_scenario(config),
        Command::Notary => claim_notary::run_scenario(config),
        Command::Vibe => vibe_check::run_scenario(config),
        Command::CodeReview => code_review::run_scenario(config),
        Command::Persistent { ledger } => persistent_ledger::run_scenario(config, &ledger),
    }
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("CONCORD: Oracle-Consensus Record Pipeline");
    println!("Reference Domains Demo");
    println!("=========================================");
    println!();
    println!("Concord pipeline per submission:");
    println!("  [1] Input rules checked; nothing reaches the oracle on failure");
    println!("  [2] Key derived from content (or supplied by caller); existing records short-circuit");
    println!("  [3] Prompt rendered and sent to the oracle in N independent executions");
    println!("  [4] Each response sanitized, validated, and canonicalized (or replaced by the fallback)");
    println!("  [5] Executions must agree; the policy hook may still veto");
    println!("  [6] Agreed record appended to the SHA-256 hash-chained ledger");
    println!();
}
