//! The outcome of one traversal, distinct from loop termination reasons.

use std::time::Duration;

use serde_json::Value;

/// Coarse classification of how a traversal ended.
///
/// Deliberately a different vocabulary from
/// [`neuron_governor::TerminationReason`]: a loop-node's loop can fail or
/// terminate non-successfully while the *graph* result is still
/// `Completed`, if a later edge routes around it. These are two separate
/// failure taxonomies by design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphStatus {
    /// The traversal reached the finish node.
    Completed,
    /// No outgoing edge matched the current (non-finish) node's output.
    StuckInNode,
    /// The traversal exceeded the configured iteration ceiling.
    MaxIterations,
    /// A node's `execute` returned an error.
    Error,
}

/// The result of one [`crate::strategy::GraphStrategy::execute`] call.
#[derive(Debug, Clone)]
pub struct GraphResult {
    status: GraphStatus,
    output: Option<Value>,
    path_taken: Vec<String>,
    stuck_node_name: Option<String>,
    iterations: u32,
    duration: Duration,
    error: Option<String>,
}

impl GraphResult {
    /// Construct a successful result. `output` is present only here.
    #[must_use]
    pub(crate) fn completed(
        output: Value,
        path_taken: Vec<String>,
        iterations: u32,
        duration: Duration,
    ) -> Self {
        Self {
            status: GraphStatus::Completed,
            output: Some(output),
            path_taken,
            stuck_node_name: None,
            iterations,
            duration,
            error: None,
        }
    }

    /// Construct a stuck-in-node result.
    #[must_use]
    pub(crate) fn stuck_in_node(
        node_name: String,
        path_taken: Vec<String>,
        iterations: u32,
        duration: Duration,
    ) -> Self {
        Self {
            status: GraphStatus::StuckInNode,
            output: None,
            path_taken,
            stuck_node_name: Some(node_name),
            iterations,
            duration,
            error: None,
        }
    }

    /// Construct a max-iterations result.
    #[must_use]
    pub(crate) fn max_iterations_exceeded(
        path_taken: Vec<String>,
        iterations: u32,
        duration: Duration,
    ) -> Self {
        Self {
            status: GraphStatus::MaxIterations,
            output: None,
            path_taken,
            stuck_node_name: None,
            iterations,
            duration,
            error: None,
        }
    }

    /// Construct an error result.
    #[must_use]
    pub(crate) fn error(
        error: impl ToString,
        path_taken: Vec<String>,
        iterations: u32,
        duration: Duration,
    ) -> Self {
        Self {
            status: GraphStatus::Error,
            output: None,
            path_taken,
            stuck_node_name: None,
            iterations,
            duration,
            error: Some(error.to_string()),
        }
    }

    /// How the traversal ended.
    #[must_use]
    pub fn status(&self) -> GraphStatus {
        self.status
    }

    /// The finish node's output, present only when `status` is `Completed`.
    #[must_use]
    pub fn output(&self) -> Option<&Value> {
        self.output.as_ref()
    }

    /// The sequence of node names visited, in order, including cycles.
    /// `path_taken.first()` is always the start node; on `Completed`,
    /// `path_taken.last()` is always the finish node.
    #[must_use]
    pub fn path_taken(&self) -> &[String] {
        &self.path_taken
    }

    /// The node the traversal got stuck in, present only when `status` is
    /// `StuckInNode`.
    #[must_use]
    pub fn stuck_node_name(&self) -> Option<&str> {
        self.stuck_node_name.as_deref()
    }

    /// How many node executions were attempted.
    #[must_use]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Wall-clock time the traversal took.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// The error message, present only when `status` is `Error`.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
