use thiserror::Error;

/// Error returned by an external collaborator call (build, test, quality,
/// fixer, publisher, report store).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// Transient failure: network, timeout, process spawn. Retried with
    /// bounded backoff by the configured retry strategy.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),

    /// The collaborator refused the request. Never retried.
    #[error("rejected: {0}")]
    Rejected(String),
}

impl CollaboratorError {
    pub fn infrastructure(msg: impl Into<String>) -> Self {
        Self::Infrastructure(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Infrastructure(_))
    }
}

impl From<std::io::Error> for CollaboratorError {
    fn from(err: std::io::Error) -> Self {
        Self::Infrastructure(err.to_string())
    }
}
