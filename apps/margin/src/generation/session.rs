//! Generation Loop — drives producer rounds until the constraints hold or the
//! token budget runs out.
//!
//! Per round:
//! 1. stop if the (non-empty) constraint set is satisfied or the budget is spent
//! 2. snapshot the tracker and render the margin
//! 3. call the producer with `min(chunk_size, remaining)` tokens
//! 4. append + ingest the fragment, charge its cost against the budget
//!
//! A session owns its tracker outright, so two sessions can never share one.
//! The producer call in step 3 is the only suspension point; [`run`] awaits it
//! and [`run_blocking`] blocks on it, and both share every other step.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::constraints::{extract, ConstraintSet};
use crate::generation::producer::{
    BlockingProducer, Fragment, FragmentProducer, ProducerError, RoundRequest,
};
use crate::margin::render_margin;
use crate::tracker::{Snapshot, StructureTracker};

/// Tokens per whitespace-delimited word, used when a producer cannot report cost.
pub const TOKENS_PER_WORD_ESTIMATE: f64 = 1.33;

pub const DEFAULT_MAX_TOKENS: u64 = 2048;
pub const DEFAULT_CHUNK_SIZE: u64 = 50;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBudget {
    /// Total tokens the session may spend.
    pub max_tokens: u64,
    /// Upper bound on tokens requested per round.
    pub chunk_size: u64,
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Why a session ended. Every variant keeps the text produced so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopReason {
    ConstraintsSatisfied,
    BudgetExhausted,
    /// The producer returned an empty fragment.
    EndOfOutput,
    /// The producer failed; the partial text is still returned.
    ProducerFailed { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub text: String,
    pub stop_reason: StopReason,
    /// Rounds that produced a fragment.
    pub rounds: u32,
    pub tokens_spent: u64,
    /// Rounds whose reported cost exceeded the requested budget and was capped.
    pub clamp_events: u32,
    pub snapshot: Snapshot,
}

/// Inputs for one producer call, prepared before the suspension point.
struct PreparedRound {
    max_tokens: u64,
    snapshot: Snapshot,
    margin: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Session state machine
// ────────────────────────────────────────────────────────────────────────────

pub struct GenerationSession {
    instruction: String,
    tracker: StructureTracker,
    text: String,
    remaining_tokens: u64,
    chunk_size: u64,
    rounds: u32,
    tokens_spent: u64,
    clamp_events: u32,
}

impl GenerationSession {
    /// Resolves constraints (extracting them from `instruction` when none are
    /// given) and starts from a fresh tracker.
    pub fn new(instruction: &str, constraints: Option<ConstraintSet>, budget: TokenBudget) -> Self {
        let constraints = constraints.unwrap_or_else(|| extract(instruction));

        let mut tracker = StructureTracker::new();
        tracker.set_constraints(constraints);

        let chunk_size = if budget.chunk_size == 0 {
            warn!("chunk_size of 0 would never make progress; using 1");
            1
        } else {
            budget.chunk_size
        };

        info!(
            dimensions = ?tracker.constraints().dimensions(),
            max_tokens = budget.max_tokens,
            chunk_size,
            "Generation session started"
        );

        Self {
            instruction: instruction.to_string(),
            tracker,
            text: String::new(),
            remaining_tokens: budget.max_tokens,
            chunk_size,
            rounds: 0,
            tokens_spent: 0,
            clamp_events: 0,
        }
    }

    pub fn tracker(&self) -> &StructureTracker {
        &self.tracker
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn remaining_tokens(&self) -> u64 {
        self.remaining_tokens
    }

    /// An empty constraint set is never "done" here; only the budget ends it.
    fn constraints_satisfied(&self) -> bool {
        !self.tracker.constraints().is_empty() && self.tracker.is_complete()
    }

    fn begin_round(&self) -> Result<PreparedRound, StopReason> {
        if self.constraints_satisfied() {
            return Err(StopReason::ConstraintsSatisfied);
        }
        if self.remaining_tokens == 0 {
            return Err(StopReason::BudgetExhausted);
        }

        let snapshot = self.tracker.snapshot();
        let margin = render_margin(&snapshot);
        Ok(PreparedRound {
            max_tokens: self.chunk_size.min(self.remaining_tokens),
            snapshot,
            margin,
        })
    }

    fn request<'a>(&'a self, round: &'a PreparedRound) -> RoundRequest<'a> {
        RoundRequest {
            instruction: &self.instruction,
            generated_so_far: &self.text,
            snapshot: &round.snapshot,
            margin: &round.margin,
            constraints: self.tracker.constraints(),
            max_tokens: round.max_tokens,
        }
    }

    /// Applies one producer result. Returns the stop reason if the session ends here.
    fn record(
        &mut self,
        requested: u64,
        result: Result<Fragment, ProducerError>,
    ) -> Option<StopReason> {
        let fragment = match result {
            Ok(fragment) => fragment,
            Err(e) => {
                warn!(
                    round = self.rounds + 1,
                    "Producer failed, ending session with partial output: {e}"
                );
                return Some(StopReason::ProducerFailed {
                    message: e.to_string(),
                });
            }
        };

        if fragment.text.is_empty() {
            debug!(round = self.rounds + 1, "Producer signalled end of output");
            return Some(StopReason::EndOfOutput);
        }

        let reported = fragment
            .tokens_used
            .unwrap_or_else(|| estimate_tokens(&fragment.text));
        let charged = if reported > requested {
            warn!(
                reported,
                requested, "Producer reported more tokens than requested; capping"
            );
            self.clamp_events += 1;
            requested
        } else {
            reported
        };

        self.text.push_str(&fragment.text);
        self.tracker.ingest(&fragment.text, Some(charged));

        self.rounds += 1;
        self.tokens_spent += charged;
        self.remaining_tokens = self.remaining_tokens.saturating_sub(charged);

        debug!(
            round = self.rounds,
            charged,
            remaining = self.remaining_tokens,
            complete = self.tracker.is_complete(),
            "Round ingested"
        );
        None
    }

    pub fn finish(self, stop_reason: StopReason) -> GenerationOutcome {
        info!(
            rounds = self.rounds,
            tokens_spent = self.tokens_spent,
            clamp_events = self.clamp_events,
            stop_reason = ?stop_reason,
            "Generation session finished"
        );
        GenerationOutcome {
            snapshot: self.tracker.snapshot(),
            text: self.text,
            stop_reason,
            rounds: self.rounds,
            tokens_spent: self.tokens_spent,
            clamp_events: self.clamp_events,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Drivers
// ────────────────────────────────────────────────────────────────────────────

/// Runs a session against an awaitable producer.
pub async fn run<P>(
    instruction: &str,
    constraints: Option<ConstraintSet>,
    budget: TokenBudget,
    producer: &P,
) -> GenerationOutcome
where
    P: FragmentProducer + ?Sized,
{
    let mut session = GenerationSession::new(instruction, constraints, budget);
    let stop_reason = loop {
        let round = match session.begin_round() {
            Ok(round) => round,
            Err(stop) => break stop,
        };
        let result = producer.produce(&session.request(&round)).await;
        if let Some(stop) = session.record(round.max_tokens, result) {
            break stop;
        }
    };
    session.finish(stop_reason)
}

/// Runs a session against a thread-blocking producer.
pub fn run_blocking<P>(
    instruction: &str,
    constraints: Option<ConstraintSet>,
    budget: TokenBudget,
    producer: &mut P,
) -> GenerationOutcome
where
    P: BlockingProducer + ?Sized,
{
    let mut session = GenerationSession::new(instruction, constraints, budget);
    let stop_reason = loop {
        let round = match session.begin_round() {
            Ok(round) => round,
            Err(stop) => break stop,
        };
        let result = producer.produce(&session.request(&round));
        if let Some(stop) = session.record(round.max_tokens, result) {
            break stop;
        }
    };
    session.finish(stop_reason)
}

/// `round(words × 1.33)`.
pub fn estimate_tokens(text: &str) -> u64 {
    let words = text.split_whitespace().count();
    (words as f64 * TOKENS_PER_WORD_ESTIMATE).round() as u64
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
