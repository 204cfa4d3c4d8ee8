//! Errors raised while building or executing a [`crate::strategy::GraphStrategy`].

use thiserror::Error;

/// A node's `execute` failed. Distinct from [`InvalidGraphError`], which is
/// a build-time topology problem rather than a runtime one.
#[derive(Debug, Error)]
pub enum NodeError {
    /// The node's own logic failed.
    #[error("node failed: {0}")]
    Failed(String),
    /// A loop-wrapping node's underlying governed run could not be driven
    /// to a result at all (the operator itself errored, not merely
    /// terminated non-successfully).
    #[error("loop node failed: {0}")]
    Loop(String),
}

/// Topology violations caught at [`crate::strategy::GraphStrategyBuilder::build`]
/// time, before any traversal runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidGraphError {
    /// No start node name was given to the builder.
    #[error("strategy has no start node configured")]
    NoStartNode,
    /// No finish node name was given to the builder.
    #[error("strategy has no finish node configured")]
    NoFinishNode,
    /// The declared start node was never added via `.node()`/`.loop_node()`.
    #[error("start node {0:?} is not declared")]
    MissingStart(String),
    /// The declared finish node was never added.
    #[error("finish node {0:?} is not declared")]
    MissingFinish(String),
    /// Two nodes were added under the same name.
    #[error("duplicate node name {0:?}")]
    DuplicateNode(String),
    /// An edge pointed at a node name that was never added.
    #[error("edge from {source:?} targets undeclared node {target:?}")]
    DanglingEdgeTarget {
        /// The edge's source node.
        source: String,
        /// The missing target node.
        target: String,
    },
}
