//! Best-effort observers for a governed run.
//!
//! Listeners never influence control flow — that is what
//! [`layer0::Hook`]/[`neuron_hooks::HookRegistry`] are for. A listener
//! that panics is caught and logged rather than allowed to unwind into
//! the governor's run loop, the same "observer can't break the run"
//! guarantee [`layer0::test_utils::LoggingHook`] gives hooks.

use std::panic::{self, AssertUnwindSafe};

use layer0::Content;

use crate::reason::TerminationReason;
use crate::state::{LoopState, TurnSnapshot};

/// Observes the lifecycle of a governed run.
///
/// Every method has a no-op default so implementors only override the
/// events they care about. Methods fire, in order, on the thread driving
/// the run: `on_loop_started` once, then `on_turn_started` /
/// `on_turn_completed` alternating per turn, then exactly one of
/// `on_loop_completed` or `on_loop_failed`.
pub trait LoopListener: Send + Sync {
    /// Called once, before the first turn, with the triggering message.
    fn on_loop_started(&self, _state: &LoopState, _user_message: &Content) {}

    /// Called before each model round. `turn_index` is 0-indexed.
    fn on_turn_started(&self, _state: &LoopState, _turn_index: u32) {}

    /// Called once a turn has been recorded into the run's state.
    /// `reason` is present only when this turn caused the run to stop.
    fn on_turn_completed(
        &self,
        _state: &LoopState,
        _snapshot: &TurnSnapshot,
        _reason: Option<&TerminationReason>,
    ) {
    }

    /// Called once the run stops with any reason other than an
    /// unrecoverable error (covers both the successful subset and the
    /// budget/abort trips).
    fn on_loop_completed(&self, _final_state: &LoopState, _reason: &TerminationReason) {}

    /// Called once the run stops because the operator, a hook, or the
    /// judge reported an unrecoverable error.
    fn on_loop_failed(&self, _state: &LoopState, _error: &str) {}
}

/// Observes individual tool invocations within a turn.
///
/// Distinct from [`LoopListener`] because tool traffic is often higher
/// volume and routed to a different sink (e.g. an audit log) than
/// turn-level lifecycle events.
pub trait ToolObserver: Send + Sync {
    /// Called before a tool call is dispatched.
    fn on_tool_call_start(&self, _tool_name: &str, _input: &serde_json::Value) {}

    /// Called after a tool call returns successfully. `result` may be
    /// truncated by the caller before it reaches the observer.
    fn on_tool_call_complete(&self, _tool_name: &str, _result: &serde_json::Value) {}

    /// Called when a tool call itself errors (distinct from a successful
    /// call that merely reports `is_error` in its result payload).
    fn on_tool_call_error(&self, _tool_name: &str, _error: &str) {}
}

/// Invoke `f` against `listener`, catching and logging any panic instead
/// of propagating it.
pub(crate) fn dispatch_listener(listener: &dyn LoopListener, f: impl FnOnce(&dyn LoopListener)) {
    let result = panic::catch_unwind(AssertUnwindSafe(|| f(listener)));
    if let Err(payload) = result {
        let message = panic_message(&payload);
        tracing::warn!(panic = %message, "loop listener panicked, suppressing");
    }
}

/// Invoke `f` against `observer`, catching and logging any panic instead
/// of propagating it.
pub(crate) fn dispatch_observer(observer: &dyn ToolObserver, f: impl FnOnce(&dyn ToolObserver)) {
    let result = panic::catch_unwind(AssertUnwindSafe(|| f(observer)));
    if let Err(payload) = result {
        let message = panic_message(&payload);
        tracing::warn!(panic = %message, "tool observer panicked, suppressing");
    }
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
