//! Directed, conditionally-taken edges between nodes.

use std::sync::Arc;

use serde_json::Value;

type Predicate = dyn Fn(&Value) -> bool + Send + Sync;
type Transform = dyn Fn(Value) -> Value + Send + Sync;

/// A directed edge from one node to another, gated by an optional
/// predicate over the source node's output and applying an optional
/// transform to that output before it becomes the target's input.
///
/// Edges with no `.when(...)` always match — the degenerate unconditional
/// edge. Edges with no `.transform(...)` pass the output through unchanged.
#[derive(Clone)]
pub struct Edge {
    pub(crate) source: String,
    pub(crate) target: String,
    predicate: Arc<Predicate>,
    transform: Arc<Transform>,
}

impl Edge {
    /// Declare an edge from `source` to `target`. Unconditional and
    /// identity-transformed until `.when()`/`.transform()` narrow it.
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            predicate: Arc::new(|_| true),
            transform: Arc::new(|v| v),
        }
    }

    /// Only take this edge when `predicate` matches the source node's
    /// output.
    #[must_use]
    pub fn when(mut self, predicate: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        self.predicate = Arc::new(predicate);
        self
    }

    /// Apply `transform` to the output when this edge is taken, before it
    /// becomes the next node's input.
    #[must_use]
    pub fn transform(mut self, transform: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.transform = Arc::new(transform);
        self
    }

    /// The node this edge originates from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The node this edge leads to.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Whether this edge's predicate matches `output`.
    #[must_use]
    pub(crate) fn matches(&self, output: &Value) -> bool {
        (self.predicate)(output)
    }

    /// Apply this edge's transform to `output`.
    #[must_use]
    pub(crate) fn apply(&self, output: Value) -> Value {
        (self.transform)(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconditional_edge_always_matches() {
        let edge = Edge::new("a", "b");
        assert!(edge.matches(&Value::Null));
        assert!(edge.matches(&Value::from(42)));
    }

    #[test]
    fn when_narrows_the_match() {
        let edge = Edge::new("a", "b").when(|v| v.as_u64() == Some(3));
        assert!(!edge.matches(&Value::from(2u64)));
        assert!(edge.matches(&Value::from(3u64)));
    }

    #[test]
    fn transform_defaults_to_identity() {
        let edge = Edge::new("a", "b");
        assert_eq!(edge.apply(Value::from(5)), Value::from(5));
    }

    #[test]
    fn transform_is_applied_when_set() {
        let edge = Edge::new("a", "b").transform(|v| Value::from(v.as_i64().unwrap_or(0) + 1));
        assert_eq!(edge.apply(Value::from(5)), Value::from(6));
    }
}
