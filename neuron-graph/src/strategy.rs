//! Build-time topology validation and the single-threaded traversal engine.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::context::GraphContext;
use crate::edge::Edge;
use crate::error::{InvalidGraphError, NodeError};
use crate::node::{FunctionNode, GraphNode, LoopNode};
use crate::result::GraphResult;

/// Safety bound applied when a builder never calls `.max_iterations(...)`.
/// Chosen to be generous enough for real cyclic strategies while still
/// catching a genuinely unbounded topology before it spins forever.
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// A directed composition of named nodes and conditional edges.
///
/// Built once via [`GraphStrategyBuilder::build`], which validates topology
/// up front, then traversed any number of times via [`GraphStrategy::execute`].
/// Each `execute()` call gets its own exclusive [`GraphContext`] — a
/// strategy itself carries no per-run state.
pub struct GraphStrategy {
    name: String,
    start: String,
    finish: String,
    nodes: HashMap<String, Arc<dyn GraphNode>>,
    edges: HashMap<String, Vec<Edge>>,
    max_iterations: u32,
}

impl GraphStrategy {
    /// Start building a strategy named `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> GraphStrategyBuilder {
        GraphStrategyBuilder {
            name: name.into(),
            start: None,
            finish: None,
            nodes: Vec::new(),
            edges: Vec::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// The strategy's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Traverse the graph from `start` to `finish`, beginning with
    /// `input` as the start node's input.
    ///
    /// Single-threaded: the returned future drives one node at a time in
    /// declaration order of outgoing edges, taking the first whose
    /// predicate matches. Mirrors the iteration bookkeeping in
    /// `neuron-orch-kit`'s `OrchestratedRunner::run` — a safety-bounded
    /// loop over a work queue, except here the "queue" is always exactly
    /// one current node and the bound is `max_iterations` rather than
    /// `max_followups`.
    pub async fn execute(&self, input: Value) -> GraphResult {
        let mut context = GraphContext::new(self.name.clone());
        let mut current = self.start.clone();
        let mut input = input;
        let mut path = vec![current.clone()];
        let mut iterations = 0u32;
        let started = Instant::now();

        while current != self.finish {
            iterations += 1;
            if iterations > self.max_iterations {
                return GraphResult::max_iterations_exceeded(path, iterations, started.elapsed());
            }

            let node = self
                .nodes
                .get(&current)
                .expect("topology validated at build time");
            let output = match node.execute(&mut context, input.clone()).await {
                Ok(output) => output,
                Err(err) => return GraphResult::error(err, path, iterations, started.elapsed()),
            };

            let taken = self
                .edges
                .get(&current)
                .into_iter()
                .flatten()
                .find(|edge| edge.matches(&output));

            match taken {
                None => {
                    return GraphResult::stuck_in_node(current, path, iterations, started.elapsed())
                }
                Some(edge) => {
                    input = edge.apply(output);
                    current = edge.target().to_string();
                    path.push(current.clone());
                }
            }
        }

        let node = self
            .nodes
            .get(&current)
            .expect("topology validated at build time");
        match node.execute(&mut context, input).await {
            Ok(output) => GraphResult::completed(output, path, iterations, started.elapsed()),
            Err(err) => GraphResult::error(err, path, iterations, started.elapsed()),
        }
    }
}

/// Builder for [`GraphStrategy`], validating topology at `build()` time.
pub struct GraphStrategyBuilder {
    name: String,
    start: Option<String>,
    finish: Option<String>,
    nodes: Vec<(String, Arc<dyn GraphNode>)>,
    edges: Vec<Edge>,
    max_iterations: u32,
}

impl GraphStrategyBuilder {
    /// Name the reserved start node. Must match a name later added via
    /// `.node()`/`.loop_node()`/`.custom_node()`.
    #[must_use]
    pub fn start_node(mut self, name: impl Into<String>) -> Self {
        self.start = Some(name.into());
        self
    }

    /// Name the reserved finish node.
    #[must_use]
    pub fn finish_node(mut self, name: impl Into<String>) -> Self {
        self.finish = Some(name.into());
        self
    }

    /// Add a pure function node.
    #[must_use]
    pub fn node(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&mut GraphContext, Value) -> Result<Value, NodeError> + Send + Sync + 'static,
    ) -> Self {
        self.nodes.push((name.into(), Arc::new(FunctionNode::new(f))));
        self
    }

    /// Add a node that wraps `operator` under `governor`'s budgets.
    #[must_use]
    pub fn loop_node(
        mut self,
        name: impl Into<String>,
        governor: Arc<neuron_governor::Governor>,
        operator: Arc<dyn layer0::Operator>,
    ) -> Self {
        self.nodes
            .push((name.into(), Arc::new(LoopNode::new(governor, operator))));
        self
    }

    /// Add a node with a hand-rolled [`GraphNode`] implementation, for
    /// anything `.node()`/`.loop_node()` don't cover.
    #[must_use]
    pub fn custom_node(mut self, name: impl Into<String>, node: Arc<dyn GraphNode>) -> Self {
        self.nodes.push((name.into(), node));
        self
    }

    /// Add an edge, built via [`Edge::new`] and its `.when()`/`.transform()`.
    #[must_use]
    pub fn edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    /// Cap the number of node executions a traversal may attempt before
    /// reporting `MaxIterations`. Defaults to [`DEFAULT_MAX_ITERATIONS`].
    #[must_use]
    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Validate topology and construct the strategy.
    ///
    /// Checks, in order: a start node was named and declared, a finish
    /// node was named and declared, no two nodes share a name, and every
    /// edge's target resolves to a declared node.
    pub fn build(self) -> Result<GraphStrategy, InvalidGraphError> {
        let start = self.start.ok_or(InvalidGraphError::NoStartNode)?;
        let finish = self.finish.ok_or(InvalidGraphError::NoFinishNode)?;

        let mut nodes: HashMap<String, Arc<dyn GraphNode>> = HashMap::new();
        for (name, node) in self.nodes {
            if nodes.insert(name.clone(), node).is_some() {
                return Err(InvalidGraphError::DuplicateNode(name));
            }
        }

        if !nodes.contains_key(&start) {
            return Err(InvalidGraphError::MissingStart(start));
        }
        if !nodes.contains_key(&finish) {
            return Err(InvalidGraphError::MissingFinish(finish));
        }

        let mut edges: HashMap<String, Vec<Edge>> = HashMap::new();
        for edge in self.edges {
            if !nodes.contains_key(edge.target()) {
                return Err(InvalidGraphError::DanglingEdgeTarget {
                    source: edge.source().to_string(),
                    target: edge.target().to_string(),
                });
            }
            edges.entry(edge.source().to_string()).or_default().push(edge);
        }

        Ok(GraphStrategy {
            name: self.name,
            start,
            finish,
            nodes,
            edges,
            max_iterations: self.max_iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::GraphStatus;

    fn pass_through(_ctx: &mut GraphContext, input: Value) -> Result<Value, NodeError> {
        Ok(input)
    }

    #[test]
    fn build_rejects_missing_start() {
        let err = GraphStrategy::builder("s")
            .finish_node("finish")
            .node("finish", pass_through)
            .build()
            .unwrap_err();
        assert_eq!(err, InvalidGraphError::NoStartNode);
    }

    #[test]
    fn build_rejects_undeclared_start() {
        let err = GraphStrategy::builder("s")
            .start_node("start")
            .finish_node("finish")
            .node("finish", pass_through)
            .build()
            .unwrap_err();
        assert_eq!(err, InvalidGraphError::MissingStart("start".to_string()));
    }

    #[test]
    fn build_rejects_duplicate_node_names() {
        let err = GraphStrategy::builder("s")
            .start_node("a")
            .finish_node("a")
            .node("a", pass_through)
            .node("a", pass_through)
            .build()
            .unwrap_err();
        assert_eq!(err, InvalidGraphError::DuplicateNode("a".to_string()));
    }

    #[test]
    fn build_rejects_dangling_edge_target() {
        let err = GraphStrategy::builder("s")
            .start_node("start")
            .finish_node("finish")
            .node("start", pass_through)
            .node("finish", pass_through)
            .edge(Edge::new("start", "nowhere"))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            InvalidGraphError::DanglingEdgeTarget { source, target }
                if source == "start" && target == "nowhere"
        ));
    }

    #[tokio::test]
    async fn single_node_strategy_completes_immediately() {
        let strategy = GraphStrategy::builder("s")
            .start_node("only")
            .finish_node("only")
            .node("only", |_ctx, input| {
                let n = input.as_u64().unwrap_or(0);
                Ok(Value::from(n * 2))
            })
            .build()
            .unwrap();

        let result = strategy.execute(Value::from(21u64)).await;
        assert_eq!(result.status(), GraphStatus::Completed);
        assert_eq!(result.output(), Some(&Value::from(42u64)));
        assert_eq!(result.path_taken(), &["only"]);
        assert_eq!(result.iterations(), 1);
    }

    #[tokio::test]
    async fn cycle_with_exit_condition_completes() {
        let strategy = GraphStrategy::builder("counter")
            .start_node("start")
            .finish_node("finish")
            .node("start", pass_through)
            .node("counter", |_ctx, input| {
                let n = input.as_i64().unwrap_or(0);
                Ok(Value::from(n + 1))
            })
            .node("finish", pass_through)
            .edge(Edge::new("start", "counter"))
            .edge(Edge::new("counter", "counter").when(|v| v.as_i64().unwrap_or(0) < 3))
            .edge(Edge::new("counter", "finish").when(|v| v.as_i64().unwrap_or(0) >= 3))
            .build()
            .unwrap();

        let result = strategy.execute(Value::from(0)).await;
        assert_eq!(result.status(), GraphStatus::Completed);
        assert_eq!(result.output(), Some(&Value::from(3)));
        assert_eq!(
            result.path_taken(),
            &["start", "counter", "counter", "counter", "finish"]
        );
    }

    #[tokio::test]
    async fn node_with_no_satisfied_edge_is_stuck() {
        let strategy = GraphStrategy::builder("s")
            .start_node("start")
            .finish_node("finish")
            .node("start", pass_through)
            .node("node", pass_through)
            .node("finish", pass_through)
            .edge(Edge::new("start", "node"))
            .edge(Edge::new("node", "finish").when(|_| false))
            .build()
            .unwrap();

        let result = strategy.execute(Value::Null).await;
        assert_eq!(result.status(), GraphStatus::StuckInNode);
        assert_eq!(result.stuck_node_name(), Some("node"));
    }

    #[tokio::test]
    async fn unbounded_cycle_trips_max_iterations() {
        let strategy = GraphStrategy::builder("s")
            .start_node("start")
            .finish_node("finish")
            .node("start", pass_through)
            .node("loop", pass_through)
            .node("finish", pass_through)
            .edge(Edge::new("start", "loop"))
            .edge(Edge::new("loop", "loop"))
            .max_iterations(5)
            .build()
            .unwrap();

        let result = strategy.execute(Value::Null).await;
        assert_eq!(result.status(), GraphStatus::MaxIterations);
        // Deliberate off-by-one: iterations increments before the bound
        // check, so a limit of 5 permits exactly 5 node executions past
        // start and reports iterations=6 on overflow.
        assert_eq!(result.iterations(), 6);
    }

    #[tokio::test]
    async fn failing_node_yields_error_result() {
        let strategy = GraphStrategy::builder("s")
            .start_node("start")
            .finish_node("finish")
            .node("start", |_ctx, _input| {
                Err(NodeError::Failed("boom".to_string()))
            })
            .node("finish", pass_through)
            .edge(Edge::new("start", "finish"))
            .build()
            .unwrap();

        let result = strategy.execute(Value::Null).await;
        assert_eq!(result.status(), GraphStatus::Error);
        assert_eq!(result.error(), Some("node failed: boom"));
    }
}
