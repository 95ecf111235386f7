use thiserror::Error;

use super::graph::GraphError;

/// Run-level errors. Only these stop a run before every reachable unit
/// finishes; per-unit failures are recorded in the unit's report instead.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("compaction snapshot is {size} bytes, above the {limit} byte limit")]
    StateTooLarge { size: usize, limit: usize },

    #[error("config error: {0}")]
    Config(String),

    #[error("control channel closed")]
    ChannelClosed,
}

impl OrchestratorError {
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::Graph(e) if e.is_cycle())
    }
}

impl From<serde_json::Error> for OrchestratorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Snapshot(err.to_string())
    }
}
