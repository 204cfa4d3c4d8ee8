//! In-memory implementations for testing.
//!
//! Available behind the `test-utils` feature flag. These are minimal
//! implementations that prove the trait APIs are usable.

mod echo_operator;
mod local_orchestrator;
mod logging_hook;

pub use echo_operator::EchoOperator;
pub use local_orchestrator::LocalOrchestrator;
pub use logging_hook::{LoggingHook, RecordedEvent};
