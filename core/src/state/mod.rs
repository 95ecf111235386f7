//! Orchestrator state: the single mutable record owned by the control loop,
//! unit lifecycle transition rules, and compaction snapshots.

pub mod snapshot;
pub mod transitions;
pub mod types;

pub use snapshot::{ActiveRef, CompactionSnapshot, SnapshotManager};
pub use transitions::{StateTransition, TransitionError};
pub use types::{
    ActiveUnit, ControlFlag, OrchestratorState, RunPhase, RunStatistics, StateSummary,
};
