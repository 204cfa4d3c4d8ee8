//! Declarative budgets for a governed run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rust_decimal::Decimal;

use crate::error::ConfigError;

/// The composite termination policy for one [`crate::Governor`].
///
/// `LoopConfig` is built once via [`LoopConfigBuilder`] and then shared
/// (cheaply cloned) across every run the governor drives; it does not
/// carry per-run state, only the thresholds that [`crate::state::LoopState`]
/// is checked against.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    max_turns: u32,
    timeout: Option<Duration>,
    max_cost: Option<Decimal>,
    stuck_after: Option<u32>,
    judge_evaluation_interval: u32,
    score_threshold: f64,
    working_directory: PathBuf,
    allowed_tools: HashSet<String>,
    finish_tool_name: String,
}

/// Default turn cap used by [`LoopConfig::default_preset`].
pub const DEFAULT_MAX_TURNS: u32 = 20;

/// Default wall-clock timeout used by [`LoopConfig::default_preset`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Default stuck-detection threshold used by [`LoopConfig::default_preset`].
pub const DEFAULT_STUCK_AFTER: u32 = 3;

/// Default name of the tool whose invocation the operator interprets as
/// natural completion, used whenever a builder doesn't override it.
pub const DEFAULT_FINISH_TOOL_NAME: &str = "complete_task";

impl LoopConfig {
    /// The reference defaults: 20 turns, a 10 minute timeout, a $5 cost
    /// ceiling, and stuck detection after 3 repeats. Cost is tracked in
    /// USD via [`rust_decimal::Decimal`]. Judge evaluation is disabled
    /// (interval 0) and the finish tool name is `"complete_task"`.
    #[must_use]
    pub fn default_preset() -> LoopConfig {
        LoopConfig::builder(DEFAULT_MAX_TURNS)
            .timeout(DEFAULT_TIMEOUT)
            .max_cost(Decimal::new(5, 0))
            .stuck_after(DEFAULT_STUCK_AFTER)
            .build()
            .expect("default preset is always valid")
    }

    /// Start building a config with the required turn cap.
    #[must_use]
    pub fn builder(max_turns: u32) -> LoopConfigBuilder {
        LoopConfigBuilder {
            max_turns,
            timeout: None,
            max_cost: None,
            stuck_after: None,
            judge_evaluation_interval: 0,
            score_threshold: 1.0,
            working_directory: None,
            allowed_tools: HashSet::new(),
            finish_tool_name: DEFAULT_FINISH_TOOL_NAME.to_string(),
        }
    }

    /// Start building a config from `self`'s current values, to produce a
    /// modified copy without re-specifying every field.
    #[must_use]
    pub fn to_builder(&self) -> LoopConfigBuilder {
        LoopConfigBuilder {
            max_turns: self.max_turns,
            timeout: self.timeout,
            max_cost: self.max_cost,
            stuck_after: self.stuck_after,
            judge_evaluation_interval: self.judge_evaluation_interval,
            score_threshold: self.score_threshold,
            working_directory: Some(self.working_directory.clone()),
            allowed_tools: self.allowed_tools.clone(),
            finish_tool_name: self.finish_tool_name.clone(),
        }
    }

    /// The turn cap.
    #[must_use]
    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    /// The wall-clock timeout, if configured.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The cost ceiling, if configured.
    #[must_use]
    pub fn max_cost(&self) -> Option<Decimal> {
        self.max_cost
    }

    /// The stuck-detection threshold, if configured.
    #[must_use]
    pub fn stuck_after(&self) -> Option<u32> {
        self.stuck_after
    }

    /// How many turns elapse between judge evaluations. Zero disables
    /// periodic judging entirely (a judge may still be configured on the
    /// governor but is then consulted only implicitly never — callers
    /// that want a judge at all must set a nonzero interval).
    #[must_use]
    pub fn judge_evaluation_interval(&self) -> u32 {
        self.judge_evaluation_interval
    }

    /// The minimum aggregated judge score that counts as a pass, in
    /// `[0.0, 1.0]`.
    #[must_use]
    pub fn score_threshold(&self) -> f64 {
        self.score_threshold
    }

    /// The working directory this run is scoped to, passed to the judge
    /// and available to the operator for tool execution.
    #[must_use]
    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    /// The tool names this run is restricted to. An empty set means "no
    /// restriction" — every tool the operator knows about is allowed.
    #[must_use]
    pub fn allowed_tools(&self) -> &HashSet<String> {
        &self.allowed_tools
    }

    /// The tool name the operator interprets as natural completion.
    #[must_use]
    pub fn finish_tool_name(&self) -> &str {
        &self.finish_tool_name
    }
}

/// Builder for [`LoopConfig`], validating thresholds at `build()` time
/// rather than letting an unreachable config surface only once a run
/// starts misbehaving.
#[derive(Debug, Clone)]
pub struct LoopConfigBuilder {
    max_turns: u32,
    timeout: Option<Duration>,
    max_cost: Option<Decimal>,
    stuck_after: Option<u32>,
    judge_evaluation_interval: u32,
    score_threshold: f64,
    working_directory: Option<PathBuf>,
    allowed_tools: HashSet<String>,
    finish_tool_name: String,
}

impl LoopConfigBuilder {
    /// Cap the run at `turns` model invocations.
    #[must_use]
    pub fn max_turns(mut self, turns: u32) -> Self {
        self.max_turns = turns;
        self
    }

    /// Stop the run once `timeout` has elapsed since it started.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Stop the run once accumulated cost exceeds `limit`.
    #[must_use]
    pub fn max_cost(mut self, limit: Decimal) -> Self {
        self.max_cost = Some(limit);
        self
    }

    /// Stop the run after `count` consecutive turns with identical output.
    #[must_use]
    pub fn stuck_after(mut self, count: u32) -> Self {
        self.stuck_after = Some(count);
        self
    }

    /// Consult the configured judge every `interval` turns. Zero (the
    /// default) disables periodic judging.
    #[must_use]
    pub fn judge_evaluation_interval(mut self, interval: u32) -> Self {
        self.judge_evaluation_interval = interval;
        self
    }

    /// Require an aggregated judge score of at least `threshold` to count
    /// as a pass. Must land in `[0.0, 1.0]`.
    #[must_use]
    pub fn score_threshold(mut self, threshold: f64) -> Self {
        self.score_threshold = threshold;
        self
    }

    /// Scope the run to `dir` — passed to the judge and readable back by
    /// the operator.
    #[must_use]
    pub fn working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// Restrict the run to exactly `tools`. Called repeatedly to allow
    /// additional tools; an empty set (the default) allows everything.
    #[must_use]
    pub fn allowed_tools(mut self, tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.allowed_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    /// Override the tool name that signals natural completion.
    #[must_use]
    pub fn finish_tool_name(mut self, name: impl Into<String>) -> Self {
        self.finish_tool_name = name.into();
        self
    }

    /// Validate and construct the config.
    pub fn build(self) -> Result<LoopConfig, ConfigError> {
        if self.max_turns == 0 {
            return Err(ConfigError::ZeroMaxTurns);
        }
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(ConfigError::ScoreThresholdOutOfRange);
        }
        if self.finish_tool_name.trim().is_empty() {
            return Err(ConfigError::BlankFinishToolName);
        }
        Ok(LoopConfig {
            max_turns: self.max_turns,
            timeout: self.timeout,
            max_cost: self.max_cost,
            stuck_after: self.stuck_after,
            judge_evaluation_interval: self.judge_evaluation_interval,
            score_threshold: self.score_threshold,
            working_directory: self.working_directory.unwrap_or_default(),
            allowed_tools: self.allowed_tools,
            finish_tool_name: self.finish_tool_name,
        })
    }
}
