use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A build unit as declared by the catalog: identity, dependencies and the
/// few attributes collaborators need to locate and publish it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSpec {
    pub id: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Reference specification or plan handed to fixers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_spec: Option<String>,
}

impl UnitSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            dependencies: Vec::new(),
            path: None,
            version: None,
            reference_spec: None,
        }
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Where collaborators should run; falls back to the unit id.
    pub fn location(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.id))
    }

    pub fn version_or_default(&self) -> &str {
        self.version.as_deref().unwrap_or("0.0.0")
    }
}

/// Common unit interface for graph handling.
pub trait UnitLike: Clone + Send + Sync {
    fn id(&self) -> &str;
    fn dependencies(&self) -> &[String];
}

impl UnitLike for UnitSpec {
    fn id(&self) -> &str {
        &self.id
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}

/// Unit lifecycle states.
///
/// ```text
/// Pending → Building → Testing → QualityCheck → {Remediating ⇄ QualityCheck}* → Publishing → Done
///            any non-terminal state → Failed | Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Pending,
    Building,
    Testing,
    QualityCheck,
    Remediating,
    Publishing,
    Done,
    Failed,
    Cancelled,
}

impl UnitStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Building => "building",
            Self::Testing => "testing",
            Self::QualityCheck => "quality_check",
            Self::Remediating => "remediating",
            Self::Publishing => "publishing",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The phase a unit was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedPhase {
    /// Reserved for units that never started a phase (lost reconnection).
    Dispatch,
    Build,
    Test,
    Quality,
    Publish,
}

impl FailedPhase {
    pub fn from_status(status: UnitStatus) -> Self {
        match status {
            UnitStatus::Building => Self::Build,
            UnitStatus::Testing => Self::Test,
            UnitStatus::QualityCheck | UnitStatus::Remediating => Self::Quality,
            UnitStatus::Publishing => Self::Publish,
            _ => Self::Dispatch,
        }
    }
}
