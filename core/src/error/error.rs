use thiserror::Error;

use super::graph::GraphError;
use super::orchestrator::OrchestratorError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("orchestrator failed: {0}")]
    Orchestrator(#[from] OrchestratorError),
    #[error("catalog error: {0}")]
    Catalog(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl From<GraphError> for CliError {
    fn from(err: GraphError) -> Self {
        Self::Orchestrator(OrchestratorError::Graph(err))
    }
}

impl CliError {
    // 11: config / catalog error
    // 12: graph error (cycle, unknown dependency, duplicate id)
    // 20: IO error
    // 50: internal/uncategorized
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Catalog(_) => 11,
            Self::Orchestrator(OrchestratorError::Graph(_)) => 12,
            Self::Orchestrator(OrchestratorError::Config(_)) => 11,
            Self::Orchestrator(_) => 50,
            Self::Io(_) => 20,
            Self::Anyhow(_) => 50,
        }
    }
}
