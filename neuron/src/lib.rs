#![deny(missing_docs)]
//! # neuron — umbrella crate
//!
//! A single import surface for the bounded, observable agent loop-control
//! layer: re-exports the protocol traits, the hook registry, the loop
//! governor, and the graph composition layer behind feature flags, plus a
//! `prelude` for the happy path.
//!
//! This crate does not add behavior of its own — every type it re-exports
//! is defined in [`layer0`], [`neuron_hooks`], [`neuron_governor`], or
//! [`neuron_graph`]. Its only job is wiring.

#[cfg(feature = "core")]
pub use layer0;
#[cfg(feature = "graph")]
pub use neuron_graph;
#[cfg(feature = "governor")]
pub use neuron_governor;
#[cfg(feature = "hooks")]
pub use neuron_hooks;

/// Happy-path imports for composing a governed agent loop, optionally
/// wrapped into a graph strategy.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use layer0::{
        Content, ContentBlock, DurationMs, ExitReason, Hook, HookAction, HookContext, HookPoint,
        Operator, OperatorConfig, OperatorError, OperatorInput, OperatorMetadata, OperatorOutput,
        TriggerType,
    };

    #[cfg(feature = "hooks")]
    pub use neuron_hooks::HookRegistry;

    #[cfg(feature = "governor")]
    pub use neuron_governor::{
        AbortHandle, Governor, GovernorBuilder, Judge, LoopConfig, LoopConfigBuilder,
        LoopListener, LoopResultContract, LoopState, LoopStatus, TerminationReason,
        ToolObserver, TurnLimitedResult, Verdict,
    };

    #[cfg(feature = "graph")]
    pub use neuron_graph::{
        Edge, GraphContext, GraphNode, GraphResult, GraphStatus, GraphStrategy,
        GraphStrategyBuilder, LoopNode,
    };
}
