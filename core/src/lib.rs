//! suiteflow core: dependency-ordered build orchestration.
//!
//! ```text
//! Vec<UnitSpec>
//!   ↓
//! DependencyGraph::build()        (layering, CycleError)
//!   ↓
//! Orchestrator::run()             (INITIALIZE → PLAN → BUILD → VERIFY → COMPLETE)
//!   ├─ Scheduler                  (ready queue, active set, concurrency bound)
//!   │    └─ ExecutionHost         (tokio tasks addressed by execution id)
//!   │         └─ UnitExecutor     (build → test → quality → remediate* → publish)
//!   ├─ CompactionPolicy           (minimal snapshot + restart of the control loop)
//!   └─ report::aggregate()        (RunReport)
//! ```

pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod executor;
pub mod quality;
pub mod report;
pub mod state;

pub use context::Collaborators;
pub use controller::{ControlHandle, ControlSignal, Orchestrator, OrchestratorBuilder};
pub use error::{CollaboratorError, CycleError, GraphError, OrchestratorError};
pub use executor::types::{UnitReport, UnitSpec, UnitStatus};
pub use report::{RunReport, RunStatus};
pub use state::{ControlFlag, RunPhase, StateSummary};
