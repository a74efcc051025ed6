//! Per-user detection runs against the order and chain stores.

pub mod orchestrator;

pub use orchestrator::{OrchestrationError, Orchestrator, RunMode, RunRequest, RunSummary};
