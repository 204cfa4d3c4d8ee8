//! The per-run, mutable key-value store threaded through one traversal.

use std::collections::HashMap;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Opaque identifier for one [`crate::strategy::GraphStrategy::execute`] call.
///
/// Mirrors [`neuron_governor::RunId`] — a v4 UUID, never reused, never
/// meaningfully portable across a process boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GraphRunId(String);

impl GraphRunId {
    /// Generate a fresh run identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for GraphRunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GraphRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Exclusive, mutable scratch space for one traversal.
///
/// Type-checked reads: [`GraphContext::get`] returns `None` for an absent
/// key or one whose stored value doesn't deserialize as `T`, rather than
/// panicking. Not `Send`-shared across concurrent traversals — each call
/// to `execute()` owns its own context for the lifetime of that call.
#[derive(Debug)]
pub struct GraphContext {
    run_id: GraphRunId,
    strategy_name: String,
    started_at: Instant,
    values: HashMap<String, Value>,
}

impl GraphContext {
    /// Create a fresh, empty context for one run of `strategy_name`.
    #[must_use]
    pub(crate) fn new(strategy_name: impl Into<String>) -> Self {
        Self {
            run_id: GraphRunId::new(),
            strategy_name: strategy_name.into(),
            started_at: Instant::now(),
            values: HashMap::new(),
        }
    }

    /// The run this context belongs to.
    #[must_use]
    pub fn run_id(&self) -> &GraphRunId {
        &self.run_id
    }

    /// The strategy being traversed.
    #[must_use]
    pub fn strategy_name(&self) -> &str {
        &self.strategy_name
    }

    /// When this traversal started.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Store `value` under `key`, overwriting whatever was there.
    pub fn set(&mut self, key: impl Into<String>, value: impl Serialize) {
        let encoded = serde_json::to_value(value).unwrap_or(Value::Null);
        self.values.insert(key.into(), encoded);
    }

    /// Read the value stored under `key`, typed as `T`.
    ///
    /// Returns `None` when the key is absent or its value can't be
    /// deserialized as `T` — callers never see a panic from a type
    /// mismatch, only an absent read.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Whether any value is stored under `key`, regardless of its type.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let mut ctx = GraphContext::new("demo");
        ctx.set("count", 3u32);
        assert_eq!(ctx.get::<u32>("count"), Some(3));
    }

    #[test]
    fn missing_key_reads_as_absent() {
        let ctx = GraphContext::new("demo");
        assert_eq!(ctx.get::<u32>("nope"), None);
    }

    #[test]
    fn type_mismatch_reads_as_absent_not_panic() {
        let mut ctx = GraphContext::new("demo");
        ctx.set("name", "not a number");
        assert_eq!(ctx.get::<u32>("name"), None);
    }

    #[test]
    fn each_context_gets_a_distinct_run_id() {
        let a = GraphContext::new("demo");
        let b = GraphContext::new("demo");
        assert_ne!(a.run_id(), b.run_id());
    }
}
