//! Typed nodes: plain functions and loop-wrapping nodes, behind one
//! uniform `execute(context, input) -> output` contract.

use std::sync::Arc;

use async_trait::async_trait;
use layer0::{Content, Operator, OperatorInput, TriggerType};
use neuron_governor::{Governor, LoopResultContract};
use serde_json::Value;

use crate::context::GraphContext;
use crate::error::NodeError;

/// A node in a [`crate::strategy::GraphStrategy`].
///
/// Function nodes and loop-wrapping nodes both implement this trait so the
/// traversal engine never needs to distinguish them: it calls `execute` and
/// routes on whatever comes back. A loop-node whose internal run failed
/// outright returns `Err` here (an operator error, not merely a non-success
/// termination reason — see [`crate::node::LoopNode`]).
#[async_trait]
pub trait GraphNode: Send + Sync {
    /// Run this node against `input`, with read/write access to the
    /// traversal's shared context.
    async fn execute(&self, ctx: &mut GraphContext, input: Value) -> Result<Value, NodeError>;
}

type NodeFn = dyn Fn(&mut GraphContext, Value) -> Result<Value, NodeError> + Send + Sync;

/// A node wrapping a pure `(context, input) -> output` function.
///
/// The function itself is synchronous — most graph steps are cheap
/// transforms or routing decisions, not I/O — but the surrounding trait is
/// async so a `FunctionNode` composes with [`LoopNode`] in the same
/// `Vec<Arc<dyn GraphNode>>` without the builder needing two collections.
pub struct FunctionNode {
    f: Arc<NodeFn>,
}

impl FunctionNode {
    /// Wrap `f` as a graph node.
    pub fn new(f: impl Fn(&mut GraphContext, Value) -> Result<Value, NodeError> + Send + Sync + 'static) -> Self {
        Self { f: Arc::new(f) }
    }
}

#[async_trait]
impl GraphNode for FunctionNode {
    async fn execute(&self, ctx: &mut GraphContext, input: Value) -> Result<Value, NodeError> {
        (self.f)(ctx, input)
    }
}

/// A node that runs an [`Operator`] under a [`Governor`]'s budgets and
/// surfaces the governed run's result as the node's output.
///
/// This is the composition point that matters: the graph
/// layer does not flatten a wrapped loop into itself, it invokes the
/// governor exactly the way a top-level caller would
/// ([`Governor::run`]) and hands the resulting
/// [`neuron_governor::TurnLimitedResult`], reshaped into JSON, onward as
/// this node's output. Downstream edge predicates can inspect
/// `status`/`reason` to route around a loop that didn't finish naturally.
pub struct LoopNode {
    governor: Arc<Governor>,
    operator: Arc<dyn Operator>,
}

impl LoopNode {
    /// Wrap `operator` to run under `governor`'s budgets each time this
    /// node executes.
    #[must_use]
    pub fn new(governor: Arc<Governor>, operator: Arc<dyn Operator>) -> Self {
        Self { governor, operator }
    }
}

#[async_trait]
impl GraphNode for LoopNode {
    async fn execute(&self, _ctx: &mut GraphContext, input: Value) -> Result<Value, NodeError> {
        let message = value_to_content(&input);
        let op_input = OperatorInput::new(message, TriggerType::Task);
        let result = self
            .governor
            .run(self.operator.as_ref(), op_input)
            .await
            .map_err(|e| NodeError::Loop(e.to_string()))?;

        let output_text = result
            .final_message
            .as_ref()
            .and_then(Content::as_text)
            .unwrap_or_default()
            .to_string();

        Ok(serde_json::json!({
            "status": result.status(),
            "reason": result.reason(),
            "turns_completed": result.turns_completed(),
            "total_tokens_used": result.total_tokens_used(),
            "estimated_cost": result.estimated_cost().to_string(),
            "elapsed_ms": result.elapsed().as_millis() as u64,
            "output": output_text,
        }))
    }
}

/// Turn a graph value into the [`Content`] a wrapped operator expects as
/// its triggering message. Strings pass through verbatim; anything else is
/// serialized so no information is silently dropped at this seam.
fn value_to_content(value: &Value) -> Content {
    match value {
        Value::String(s) => Content::text(s.clone()),
        other => Content::text(other.to_string()),
    }
}
