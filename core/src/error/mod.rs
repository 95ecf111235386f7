#[allow(clippy::module_inception)]
pub mod error;
pub mod executor;
pub mod graph;
pub mod orchestrator;

pub use error::CliError;
pub use executor::CollaboratorError;
pub use graph::{CycleError, GraphError};
pub use orchestrator::OrchestratorError;
