//! # layer0 — Protocol traits for composable agentic AI systems
//!
//! This crate defines the protocol boundaries that a bounded, observable
//! loop-control layer sits on top of.
//!
//! ## The Protocols
//!
//! | Protocol | Trait | What it does |
//! |----------|-------|-------------|
//! | ① Operator | [`Operator`] | What one agent does per invocation (the external tool-calling driver) |
//! | ② Orchestration | [`Orchestrator`] | How agents/nodes compose |
//!
//! ## The Interfaces
//!
//! | Interface | Types | What it does |
//! |-----------|-------|-------------|
//! | ③ Hooks | [`Hook`], [`HookPoint`], [`HookAction`] | Observation + intervention inside an invocation |
//!
//! ## Design Principle
//!
//! Every protocol trait is operation-defined, not mechanism-defined.
//! [`Operator::execute`] means "cause this agent to process one invocation" —
//! not "make an API call" or "run a subprocess." This is what makes
//! implementations swappable: a hand-rolled ReAct loop, a single model call,
//! and a human-in-the-loop adapter all implement the same trait.
//!
//! ## Scope note
//!
//! This crate intentionally does not define state persistence, secrets,
//! or environment isolation protocols — those belong to the surrounding
//! system, not to the loop-control layer built on top of this crate.

#![deny(missing_docs)]

pub mod content;
pub mod duration;
pub mod effect;
pub mod error;
pub mod hook;
pub mod id;
pub mod operator;
pub mod orchestrator;

#[cfg(feature = "test-utils")]
pub mod test_utils;

// Re-exports for convenience
pub use content::{Content, ContentBlock};
pub use duration::DurationMs;
pub use effect::{Effect, LogLevel, SignalPayload};
pub use error::{HookError, OperatorError, OrchError};
pub use hook::{Hook, HookAction, HookContext, HookPoint};
pub use id::{AgentId, ScopeId, SessionId, WorkflowId};
pub use operator::{
    ExitReason, Operator, OperatorConfig, OperatorInput, OperatorMetadata, OperatorOutput,
    ToolCallRecord, TriggerType,
};
pub use orchestrator::{Orchestrator, QueryPayload};
