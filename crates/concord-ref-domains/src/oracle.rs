//! Deterministic stand-ins for the external generator and the web.
//!
//! `ScriptedOracle` answers prompts from a fixed script so every demo run
//! and test is reproducible. `StaticFetcher` serves evidence pages from an
//! in-memory map. Neither makes a network call.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use tracing::debug;

use concord_contracts::{
    error::{ConcordError, ConcordResult},
    oracle::OutputFormat,
};
use concord_core::traits::{EvidenceFetcher, OracleInvoker};

/// One scripted reply: a response text or an invocation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Fail(String),
}

struct Script {
    needle: String,
    replies: Vec<Reply>,
    served: Mutex<usize>,
}

/// An `OracleInvoker` driven by a script of `needle → replies` entries.
///
/// A prompt is answered by the first entry whose needle occurs in it. An
/// entry with several replies serves them in turn and wraps around, which
/// is how divergent executions are simulated. A prompt no entry matches
/// fails with `OracleInvocation`.
///
/// ```rust,ignore
/// let oracle = ScriptedOracle::new()
///     .reply("thanks for your help", "NO")
///     .replies("coin flip", ["PASS", "FAIL"]);
/// ```
pub struct ScriptedOracle {
    scripts: Vec<Script>,
    calls: Arc<Mutex<usize>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self { scripts: Vec::new(), calls: Arc::new(Mutex::new(0)) }
    }

    /// Always answer prompts containing `needle` with `text`.
    pub fn reply(self, needle: impl Into<String>, text: impl Into<String>) -> Self {
        self.script(needle, vec![Reply::Text(text.into())])
    }

    /// Answer prompts containing `needle` with each of `texts` in turn.
    pub fn replies<I, S>(self, needle: impl Into<String>, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let replies = texts.into_iter().map(|t| Reply::Text(t.into())).collect();
        self.script(needle, replies)
    }

    /// Fail every invocation whose prompt contains `needle`.
    pub fn fail(self, needle: impl Into<String>, reason: impl Into<String>) -> Self {
        self.script(needle, vec![Reply::Fail(reason.into())])
    }

    pub fn script(mut self, needle: impl Into<String>, replies: Vec<Reply>) -> Self {
        self.scripts.push(Script { needle: needle.into(), replies, served: Mutex::new(0) });
        self
    }

    /// Shared handle on the number of invocations so far.
    ///
    /// Stays readable after the oracle is boxed into a pipeline.
    pub fn call_counter(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.calls)
    }
}

impl Default for ScriptedOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl OracleInvoker for ScriptedOracle {
    fn invoke(&self, prompt: &str, format: OutputFormat) -> ConcordResult<String> {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner) += 1;

        let script = self
            .scripts
            .iter()
            .find(|s| prompt.contains(&s.needle))
            .filter(|s| !s.replies.is_empty())
            .ok_or_else(|| ConcordError::OracleInvocation {
                reason: "no scripted reply matches the prompt".to_string(),
            })?;

        let mut served = script.served.lock().unwrap_or_else(PoisonError::into_inner);
        let reply = &script.replies[*served % script.replies.len()];
        *served += 1;

        debug!(needle = %script.needle, ?format, turn = *served, "scripted oracle replied");
        match reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Fail(reason) => Err(ConcordError::OracleInvocation { reason: reason.clone() }),
        }
    }
}

/// An `EvidenceFetcher` over a fixed set of pages.
///
/// Fetching a URL that has no page fails with `OracleInvocation`, the same
/// variant a failed external call produces.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
    calls: Arc<Mutex<usize>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: impl Into<String>, text: impl Into<String>) -> Self {
        self.pages.insert(url.into(), text.into());
        self
    }

    pub fn call_counter(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.calls)
    }
}

impl EvidenceFetcher for StaticFetcher {
    fn fetch(&self, url: &str) -> ConcordResult<String> {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        self.pages.get(url).cloned().ok_or_else(|| ConcordError::OracleInvocation {
            reason: format!("could not fetch evidence from '{url}'"),
        })
    }
}
