//! The outcome of a governed run.

use std::time::Duration;

use layer0::Content;
use rust_decimal::Decimal;

use crate::judge::Verdict;
use crate::reason::{LoopStatus, TerminationReason};
use crate::state::{LoopState, RunId};

/// The fields every governed run's result shares, regardless of which
/// concrete loop pattern produced it.
///
/// Patterns built on top of [`crate::Governor`] (a graph node wrapping a
/// loop, say) are expected to carry their own richer result type and
/// implement this trait over it rather than being forced into
/// [`TurnLimitedResult`] directly.
pub trait LoopResultContract {
    /// The run this result belongs to.
    fn run_id(&self) -> &RunId;

    /// Coarse success/stopped/failed classification.
    fn status(&self) -> LoopStatus;

    /// The specific reason the run stopped.
    fn reason(&self) -> &TerminationReason;

    /// How many turns were completed before the run stopped.
    fn turns_completed(&self) -> u32;

    /// Cumulative tokens consumed across the run.
    fn total_tokens_used(&self) -> u64;

    /// Cumulative estimated cost across the run.
    fn estimated_cost(&self) -> Decimal;

    /// Wall-clock time the run took.
    fn elapsed(&self) -> Duration;
}

/// The result of a plain turn-bounded governed run: the common contract
/// plus the model's final message and the full state trace, when
/// produced.
#[derive(Debug, Clone)]
pub struct TurnLimitedResult {
    run_id: RunId,
    reason: TerminationReason,
    turns_completed: u32,
    total_tokens_used: u64,
    estimated_cost: Decimal,
    elapsed: Duration,
    final_state: LoopState,
    /// The judge's verdict on the turn that ended the run, present only
    /// when a judge was consulted for that turn (whether or not it
    /// tripped [`TerminationReason::ScoreThresholdMet`]).
    pub last_verdict: Option<Verdict>,
    /// The model's last message, present even when the run was stopped
    /// rather than completed naturally — callers that want a best-effort
    /// answer under a budget trip can still read it.
    pub final_message: Option<Content>,
}

impl TurnLimitedResult {
    #[must_use]
    pub(crate) fn new(
        run_id: RunId,
        reason: TerminationReason,
        turns_completed: u32,
        total_tokens_used: u64,
        estimated_cost: Decimal,
        elapsed: Duration,
        final_state: LoopState,
        last_verdict: Option<Verdict>,
        final_message: Option<Content>,
    ) -> Self {
        Self {
            run_id,
            reason,
            turns_completed,
            total_tokens_used,
            estimated_cost,
            elapsed,
            final_state,
            last_verdict,
            final_message,
        }
    }

    /// Whether this run was stopped by stuck detection — a convenience
    /// over matching on [`Self::reason`] directly.
    #[must_use]
    pub fn was_stuck(&self) -> bool {
        self.reason == TerminationReason::Stuck
    }

    /// The full state the run ended in, including its per-turn history.
    #[must_use]
    pub fn final_state(&self) -> &LoopState {
        &self.final_state
    }
}

impl LoopResultContract for TurnLimitedResult {
    fn run_id(&self) -> &RunId {
        &self.run_id
    }

    fn status(&self) -> LoopStatus {
        LoopStatus::from(&self.reason)
    }

    fn reason(&self) -> &TerminationReason {
        &self.reason
    }

    fn turns_completed(&self) -> u32 {
        self.turns_completed
    }

    fn total_tokens_used(&self) -> u64 {
        self.total_tokens_used
    }

    fn estimated_cost(&self) -> Decimal {
        self.estimated_cost
    }

    fn elapsed(&self) -> Duration {
        self.elapsed
    }
}
