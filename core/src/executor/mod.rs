//! Unit execution and scheduling.
//!
//! ```text
//! Vec<UnitSpec>
//!   ↓
//! DependencyGraph::build()          → layers, or CycleError with the unresolved units
//!   ↓
//! Scheduler::dispatch_ready()       → ready units in queue order, up to the free slots
//!   ↓
//! ExecutionHost::launch()           → tokio task, stable execution id
//!   ↓
//! UnitExecutor::execute()           → build → test → quality → remediate* → publish
//!   ↓
//! Completion → Scheduler::complete() → terminal status unlocks dependents
//! ```

mod graph;
mod host;
mod output;
mod progress;
pub mod remediation;
mod retry;
mod scheduler;
pub mod traits;
pub mod types;
mod unit;

#[cfg(test)]
pub(crate) mod test_support;

pub use graph::{DependencyGraph, UnitNode};
pub use host::{Completion, ExecutionHost};
pub use output::EventSink;
pub use progress::ProgressMonitor;
pub use remediation::FixerRegistry;
pub use retry::{call_with_retry, CallResult, CancelSignal};
pub use scheduler::{CompletionOutcome, Dispatched, RestoreOutcome, Scheduler};
pub use types::{UnitReport, UnitSpec, UnitStatus};
pub use unit::{PhaseTimeouts, UnitExecutor};
