//! Bounded, observable governor for agentic tool-calling loops.
//!
//! This crate does not drive model calls or tool execution itself — that
//! remains the job of a [`layer0::Operator`]. [`Governor`] is the
//! composite termination policy and event stream that sits beside one:
//! register it as a [`layer0::Hook`] on the operator's hook pipeline, and
//! wrap the top-level call with [`Governor::run`].
#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod events;
pub mod governor;
pub mod judge;
pub mod reason;
pub mod result;
pub mod state;

pub use config::{LoopConfig, LoopConfigBuilder};
pub use error::{ConfigError, GovernorError};
pub use events::{LoopListener, ToolObserver};
pub use governor::{AbortHandle, Governor, GovernorBuilder};
pub use judge::{AggregatedVerdict, Judge, JudgeError, Verdict};
pub use reason::{LoopStatus, TerminationReason};
pub use result::{LoopResultContract, TurnLimitedResult};
pub use state::{output_signature, LoopState, RunId, TurnSnapshot};
