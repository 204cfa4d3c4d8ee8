//! Acceptance tests for the Layer 0 trait crate.
//!
//! Tests cover trait object safety, typed ID conversions, content helpers,
//! and the Operator/Hook/Orchestrator scaffolding used by the loop-control
//! layer built on top of this crate.

use layer0::*;

fn _assert_send_sync<T: Send + Sync>() {}

#[test]
fn operator_is_object_safe_send_sync() {
    _assert_send_sync::<Box<dyn Operator>>();
}

#[test]
fn arc_operator_is_send_sync() {
    _assert_send_sync::<std::sync::Arc<dyn Operator>>();
}

#[test]
fn arc_orchestrator_is_send_sync() {
    _assert_send_sync::<std::sync::Arc<dyn Orchestrator>>();
}

#[test]
fn arc_hook_is_send_sync() {
    _assert_send_sync::<std::sync::Arc<dyn Hook>>();
}

#[test]
fn typed_id_from_str_and_display() {
    let agent = AgentId::from("planner");
    assert_eq!(agent.as_str(), "planner");
    assert_eq!(agent.to_string(), "planner");

    let session = SessionId::new(String::from("sess-1"));
    assert_eq!(session.as_str(), "sess-1");
}

#[test]
fn content_as_text_prefers_first_text_block() {
    let c = Content::Blocks(vec![
        ContentBlock::ToolUse {
            id: "1".into(),
            name: "search".into(),
            input: serde_json::json!({}),
        },
        ContentBlock::Text {
            text: "hello".into(),
        },
    ]);
    assert_eq!(c.as_text(), Some("hello"));
}

#[test]
fn content_text_variant_as_text() {
    let c = Content::text("plain");
    assert_eq!(c.as_text(), Some("plain"));
}

#[test]
fn duration_ms_round_trips_through_json() {
    let d = DurationMs::from_millis(2500);
    let json = serde_json::to_string(&d).unwrap();
    assert_eq!(json, "2500");
    let back: DurationMs = serde_json::from_str(&json).unwrap();
    assert_eq!(back, d);
}

#[test]
fn operator_error_display_is_stable() {
    let e = OperatorError::Retryable("provider timeout".into());
    assert_eq!(e.to_string(), "retryable: provider timeout");
}

#[tokio::test]
async fn echo_operator_returns_input_as_complete() {
    use layer0::test_utils::EchoOperator;

    let op = EchoOperator;
    let input = OperatorInput::new(Content::text("ping"), TriggerType::User);
    let out = op.execute(input).await.unwrap();
    assert_eq!(out.exit_reason, ExitReason::Complete);
    assert_eq!(out.message.as_text(), Some("ping"));
}

#[tokio::test]
async fn local_orchestrator_dispatches_to_registered_agent() {
    use layer0::test_utils::{EchoOperator, LocalOrchestrator};
    use std::sync::Arc;

    let mut orch = LocalOrchestrator::new();
    orch.register(AgentId::from("echo"), Arc::new(EchoOperator));

    let input = OperatorInput::new(Content::text("hi"), TriggerType::User);
    let out = orch.dispatch(&AgentId::from("echo"), input).await.unwrap();
    assert_eq!(out.message.as_text(), Some("hi"));
}

#[tokio::test]
async fn local_orchestrator_reports_missing_agent() {
    use layer0::test_utils::LocalOrchestrator;

    let orch = LocalOrchestrator::new();
    let input = OperatorInput::new(Content::text("hi"), TriggerType::User);
    let err = orch
        .dispatch(&AgentId::from("missing"), input)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchError::AgentNotFound(_)));
}
