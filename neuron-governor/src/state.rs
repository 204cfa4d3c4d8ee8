//! The immutable loop-state model.
//!
//! [`LoopState`] carries one run's progress. Every update operation takes
//! `&self` and returns a new `LoopState` — there is no interior mutability
//! here, so a `LoopState` handed to a listener can never be mutated out
//! from under it, and concurrent runs on the same [`crate::Governor`]
//! never share a state value.

use std::fmt;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Opaque identifier unique to one governed invocation.
///
/// Backed by a v4 UUID for process-wide, cryptographically random
/// uniqueness. Never reused within a process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    /// Generate a fresh run identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A completed turn's contribution to the run, recorded once and never
/// revised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnSnapshot {
    /// 1-indexed position of this turn within the run.
    pub turn_number: u32,
    /// Tokens consumed by this turn alone (not cumulative).
    pub tokens_this_turn: u64,
    /// Cost incurred by this turn alone (not cumulative).
    pub cost_this_turn: Decimal,
    /// Whether the model requested any tool calls this turn.
    pub had_tool_calls: bool,
    /// Stable hash of the turn's textual output, used for stuck detection.
    pub output_signature: u64,
}

/// Immutable record of one run's progress.
///
/// `started_at` is excluded from `Serialize`/`Deserialize` derives' concerns
/// on purpose: wall-clock instants aren't meaningfully portable across a
/// process boundary, and this type is never checkpointed (the system does
/// not persist loop state — see the crate-level non-goals).
#[derive(Debug, Clone)]
pub struct LoopState {
    run_id: RunId,
    current_turn: u32,
    started_at: Instant,
    total_tokens_used: u64,
    estimated_cost: Decimal,
    abort_signalled: bool,
    turn_history: Vec<TurnSnapshot>,
    consecutive_same_output_count: u32,
}

impl LoopState {
    /// Construct the zero-state for a fresh run.
    #[must_use]
    pub fn initial(run_id: RunId) -> Self {
        Self {
            run_id,
            current_turn: 0,
            started_at: Instant::now(),
            total_tokens_used: 0,
            estimated_cost: Decimal::ZERO,
            abort_signalled: false,
            turn_history: Vec::new(),
            consecutive_same_output_count: 0,
        }
    }

    /// The run this state belongs to.
    #[must_use]
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Number of turns completed so far.
    #[must_use]
    pub fn current_turn(&self) -> u32 {
        self.current_turn
    }

    /// When this run started.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Wall-clock time elapsed since the run started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Cumulative tokens consumed across all completed turns.
    #[must_use]
    pub fn total_tokens_used(&self) -> u64 {
        self.total_tokens_used
    }

    /// Cumulative estimated cost across all completed turns, in USD.
    #[must_use]
    pub fn estimated_cost(&self) -> Decimal {
        self.estimated_cost
    }

    /// Whether an external abort has been signalled for this run.
    #[must_use]
    pub fn abort_signalled(&self) -> bool {
        self.abort_signalled
    }

    /// The ordered history of completed turns.
    #[must_use]
    pub fn turn_history(&self) -> &[TurnSnapshot] {
        &self.turn_history
    }

    /// How many turns in a row produced the same output signature,
    /// including the current one.
    #[must_use]
    pub fn consecutive_same_output_count(&self) -> u32 {
        self.consecutive_same_output_count
    }

    /// Record one completed turn, returning a new state.
    ///
    /// `consecutive_same_output_count` is recomputed by comparing
    /// `output_signature` against the previous turn's signature: a match
    /// increments the run, a difference resets it to 1 (the current turn
    /// is always the first of whatever run it starts).
    #[must_use]
    pub fn complete_turn(
        &self,
        tokens_this_turn: u64,
        cost_this_turn: Decimal,
        had_tool_calls: bool,
        output_signature: u64,
    ) -> Self {
        assert!(
            cost_this_turn >= Decimal::ZERO,
            "cost_this_turn must be non-negative"
        );

        let consecutive_same_output_count = match self.turn_history.last() {
            Some(prev) if prev.output_signature == output_signature => {
                self.consecutive_same_output_count + 1
            }
            _ => 1,
        };

        let mut turn_history = self.turn_history.clone();
        turn_history.push(TurnSnapshot {
            turn_number: self.current_turn + 1,
            tokens_this_turn,
            cost_this_turn,
            had_tool_calls,
            output_signature,
        });

        Self {
            run_id: self.run_id.clone(),
            current_turn: self.current_turn + 1,
            started_at: self.started_at,
            total_tokens_used: self.total_tokens_used + tokens_this_turn,
            estimated_cost: self.estimated_cost + cost_this_turn,
            abort_signalled: self.abort_signalled,
            turn_history,
            consecutive_same_output_count,
        }
    }

    /// Signal an external abort, returning a new state. Idempotent:
    /// aborting an already-aborted state returns an equivalent state.
    #[must_use]
    pub fn abort(&self) -> Self {
        Self {
            abort_signalled: true,
            ..self.clone()
        }
    }

    /// Whether the turn counter has reached `limit`.
    #[must_use]
    pub fn max_turns_reached(&self, limit: u32) -> bool {
        self.current_turn >= limit
    }

    /// Whether `duration` has elapsed since the run started.
    #[must_use]
    pub fn timeout_exceeded(&self, duration: Duration) -> bool {
        self.elapsed() >= duration
    }

    /// Whether accumulated cost has strictly exceeded `limit`.
    #[must_use]
    pub fn cost_exceeded(&self, limit: Decimal) -> bool {
        self.estimated_cost > limit
    }

    /// Whether the model has produced `threshold` or more identical
    /// outputs in a row. A `threshold` of zero disables stuck detection.
    #[must_use]
    pub fn is_stuck(&self, threshold: u32) -> bool {
        threshold > 0 && self.consecutive_same_output_count >= threshold
    }
}

/// Stable hash of a text blob for stuck-detection signatures. The empty
/// string hashes to a deterministic sentinel like any other input — it is
/// not special-cased, so repeated empty outputs still count toward
/// stuck detection.
#[must_use]
pub fn output_signature(text: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}
