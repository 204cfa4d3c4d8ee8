//! The termination taxonomy.

use serde::{Deserialize, Serialize};

/// Why a governed run stopped.
///
/// Variants are ordered the way [`crate::config::LoopConfig`] evaluates
/// them: an external abort always wins, budget predicates come next, and
/// a judge-based success verdict is checked last, after the model itself
/// has signalled it is done. See [`crate::governor::Governor::run`] for
/// the evaluation order this enum documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// The model produced a final answer with no further tool calls (or
    /// explicitly invoked the configured finish tool).
    NaturalCompletion,
    /// An external caller flipped the abort flag for this run.
    Aborted,
    /// The configured turn cap was reached before natural completion.
    MaxTurnsReached,
    /// The configured wall-clock timeout elapsed.
    TimedOut,
    /// The configured cost ceiling was exceeded.
    CostBudgetExhausted,
    /// The model repeated the same output enough times in a row to trip
    /// stuck detection.
    Stuck,
    /// A registered judge scored an in-progress answer at or above the
    /// configured threshold before the model itself finished.
    ScoreThresholdMet,
    /// The underlying operator or a hook reported an unrecoverable error.
    Error {
        /// A human-readable description of the failure.
        message: String,
    },
    /// The run reached a terminal condition recognized directly on its
    /// state rather than through any of the above predicates — for
    /// example, a graph-wrapped loop whose wrapping node was itself
    /// the traversal's finish node.
    StateTerminal,
}

impl TerminationReason {
    /// Whether this reason represents a successful, intended stop rather
    /// than a budget trip or failure.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            TerminationReason::NaturalCompletion
                | TerminationReason::ScoreThresholdMet
                | TerminationReason::StateTerminal
        )
    }
}

/// Coarse status derived from a [`TerminationReason`], useful for
/// dashboards and logs that don't need the full detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopStatus {
    /// The run finished with a usable answer.
    Succeeded,
    /// The run was stopped by a budget or a judge before finishing.
    Stopped,
    /// The run failed outright.
    Failed,
}

impl From<&TerminationReason> for LoopStatus {
    fn from(reason: &TerminationReason) -> Self {
        match reason {
            TerminationReason::NaturalCompletion
            | TerminationReason::ScoreThresholdMet
            | TerminationReason::StateTerminal => LoopStatus::Succeeded,
            TerminationReason::Error { .. } => LoopStatus::Failed,
            TerminationReason::Aborted
            | TerminationReason::MaxTurnsReached
            | TerminationReason::TimedOut
            | TerminationReason::CostBudgetExhausted
            | TerminationReason::Stuck => LoopStatus::Stopped,
        }
    }
}
