//! Errors raised while configuring or running a [`crate::Governor`].

use thiserror::Error;

use crate::judge::JudgeError;

/// Failures raised while building a [`crate::config::LoopConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `max_turns` was set to zero, which would never allow a single turn.
    #[error("max_turns must be at least 1")]
    ZeroMaxTurns,
    /// `score_threshold` fell outside `[0.0, 1.0]`.
    #[error("score_threshold must be within [0.0, 1.0]")]
    ScoreThresholdOutOfRange,
    /// `finish_tool_name` was empty or all whitespace.
    #[error("finish_tool_name must not be blank")]
    BlankFinishToolName,
}

/// Failures raised while a [`crate::Governor`] drives a run.
#[derive(Debug, Error)]
pub enum GovernorError {
    /// The wrapped operator reported an error.
    #[error("operator failed: {0}")]
    Operator(#[from] layer0::OperatorError),
    /// A registered judge failed to produce a verdict.
    #[error("judge failed: {0}")]
    Judge(#[from] JudgeError),
    /// The calling thread already has a run in progress.
    #[error("thread already has an in-flight governed run")]
    ReentrantRun,
}
