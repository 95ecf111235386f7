//! Run controller: top-level phase sequence, the serial control loop, control
//! signals and state compaction.

mod compaction;
mod orchestrator;
mod signals;
mod system;

pub use compaction::CompactionPolicy;
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use signals::{ControlHandle, ControlSignal};
pub use system::sample_concurrency_context;
