//! Optional judge-based success evaluation.
//!
//! A [`Judge`] is an external collaborator, consumed through a trait
//! exactly the way [`layer0::Orchestrator`] and [`layer0::Operator`] are:
//! the governor never constructs one, it only calls `evaluate` on
//! whatever `Arc<dyn Judge>` it was configured with.

use std::path::Path;

use async_trait::async_trait;
use layer0::Content;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::LoopState;

/// Failure raised when a [`Judge`] cannot produce a verdict.
///
/// Propagates out of [`crate::governor::Governor::run`] as
/// [`crate::error::GovernorError::Judge`] and surfaces as a FAILED result,
/// per the judge-execution-failure row of the error taxonomy — a judge
/// that cannot grade an answer is a run failure, not a non-passing verdict.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct JudgeError(pub String);

impl JudgeError {
    /// Wrap any displayable failure as a `JudgeError`.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// One judge's opinion of a proposed final answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether this judge considers the answer acceptable.
    pub pass: bool,
    /// A score in `[0.0, 1.0]`, for judges that grade rather than gate.
    pub score: f64,
    /// Free-text feedback, surfaced via [`AggregatedVerdict::rejection_feedback`]
    /// when the verdict fails.
    pub feedback: String,
}

impl Verdict {
    /// Construct a passing verdict with a perfect score and no feedback.
    #[must_use]
    pub fn pass() -> Self {
        Self {
            pass: true,
            score: 1.0,
            feedback: String::new(),
        }
    }

    /// Construct a failing verdict carrying `feedback`.
    #[must_use]
    pub fn fail(feedback: impl Into<String>) -> Self {
        Self {
            pass: false,
            score: 0.0,
            feedback: feedback.into(),
        }
    }
}

/// The combined opinion of every judge consulted for one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedVerdict {
    individual: Vec<Verdict>,
}

impl AggregatedVerdict {
    /// Wrap the individual verdicts collected for one answer.
    #[must_use]
    pub fn new(individual: Vec<Verdict>) -> Self {
        Self { individual }
    }

    /// Whether every consulted judge passed the answer. An empty verdict
    /// list (no judges configured) passes vacuously.
    #[must_use]
    pub fn pass(&self) -> bool {
        self.individual.iter().all(|v| v.pass)
    }

    /// The mean score across all consulted judges, or `1.0` if none were
    /// consulted.
    #[must_use]
    pub fn score(&self) -> f64 {
        if self.individual.is_empty() {
            return 1.0;
        }
        self.individual.iter().map(|v| v.score).sum::<f64>() / self.individual.len() as f64
    }

    /// Feedback from every judge that rejected the answer, joined with
    /// `"; "`.
    #[must_use]
    pub fn rejection_feedback(&self) -> String {
        self.individual
            .iter()
            .filter(|v| !v.pass)
            .map(|v| v.feedback.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// The individual verdicts, in the order they were collected.
    #[must_use]
    pub fn individual(&self) -> &[Verdict] {
        &self.individual
    }

    /// Whether every judge passed the answer AND the aggregated score
    /// meets or exceeds `threshold`. This is the single predicate
    /// [`crate::governor::Governor`] uses to decide
    /// [`crate::reason::TerminationReason::ScoreThresholdMet`].
    #[must_use]
    pub fn meets_threshold(&self, threshold: f64) -> bool {
        self.pass() && self.score() >= threshold
    }
}

/// An external evaluator consulted periodically (every
/// `judge_evaluation_interval` turns) on the model's latest answer, ahead
/// of natural completion. A passing, threshold-meeting verdict trips
/// [`crate::reason::TerminationReason::ScoreThresholdMet`] and ends the
/// run early.
#[async_trait]
pub trait Judge: Send + Sync {
    /// Evaluate `answer`, in light of the run's current `state`, the
    /// original `task`, and the working directory the run was scoped to
    /// (tests, repro repos, and similar grading artifacts typically live
    /// there). Returns `Err` when the judge itself cannot produce a
    /// verdict (a grading tool crashed, a sandbox timed out, …) — distinct
    /// from a `Verdict` that merely fails the answer.
    async fn evaluate(
        &self,
        state: &LoopState,
        task: &Content,
        answer: &Content,
        working_directory: &Path,
    ) -> Result<Verdict, JudgeError>;
}
