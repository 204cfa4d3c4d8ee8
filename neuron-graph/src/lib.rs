//! Typed-node graph composition over [`neuron_governor::Governor`]-bounded
//! loops and plain function steps.
//!
//! A [`strategy::GraphStrategy`] is a directed graph of named
//! [`node::GraphNode`]s connected by conditional [`edge::Edge`]s. Traversal
//! (`execute`) walks from a reserved start node to a reserved finish node,
//! taking the first matching outgoing edge at each step, and reports a
//! [`result::GraphResult`] whose failure modes — stuck node, iteration
//! ceiling, node error — are deliberately a different taxonomy from
//! [`neuron_governor::TerminationReason`]: a loop-wrapping node's governed
//! run can terminate non-successfully while the graph traversal around it
//! still completes, if later edges route around the setback.
#![deny(missing_docs)]

pub mod context;
pub mod edge;
pub mod error;
pub mod node;
pub mod result;
pub mod strategy;

pub use context::{GraphContext, GraphRunId};
pub use edge::Edge;
pub use error::{InvalidGraphError, NodeError};
pub use node::{FunctionNode, GraphNode, LoopNode};
pub use result::{GraphResult, GraphStatus};
pub use strategy::{GraphStrategy, GraphStrategyBuilder, DEFAULT_MAX_ITERATIONS};
