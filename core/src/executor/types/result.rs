use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::unit::{FailedPhase, UnitStatus};
use crate::quality::{QualityCategory, QualityReport};

/// Per-unit failure classification. Data in the report, never propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Build,
    Test,
    Quality,
    Publish,
    Infrastructure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitFailure {
    pub phase: FailedPhase,
    pub kind: FailureKind,
    pub message: String,
}

impl UnitFailure {
    pub fn new(phase: FailedPhase, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            phase,
            kind,
            message: message.into(),
        }
    }
}

/// One entry per state the unit passed through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTiming {
    pub status: UnitStatus,
    pub entered_at: DateTime<Utc>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationOutcome {
    Passed,
    StillFailing,
    FixerError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationAttempt {
    pub attempt_number: u32,
    pub fixer: String,
    pub categories_addressed: Vec<QualityCategory>,
    pub duration_ms: u64,
    /// Score of the re-check, absent if the fixer or the re-check failed.
    pub score_after: Option<f64>,
    pub outcome: RemediationOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Write-once report produced when a unit reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitReport {
    pub unit_id: String,
    pub execution_id: Option<String>,
    pub status: UnitStatus,
    pub failure: Option<UnitFailure>,
    pub phases: Vec<PhaseTiming>,
    pub quality: Option<QualityReport>,
    pub remediation_attempts: Vec<RemediationAttempt>,
    pub coverage_pct: Option<f64>,
    /// Time spent ready but held back by the concurrency bound.
    pub dependency_wait_ms: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Collaborator calls retried after infrastructure errors.
    pub infrastructure_retries: u32,
}

impl UnitReport {
    /// Report for a unit that terminated without running any phase.
    pub fn placeholder(unit_id: impl Into<String>, status: UnitStatus) -> Self {
        let now = Utc::now();
        Self {
            unit_id: unit_id.into(),
            execution_id: None,
            status,
            failure: None,
            phases: Vec::new(),
            quality: None,
            remediation_attempts: Vec::new(),
            coverage_pct: None,
            dependency_wait_ms: 0,
            started_at: now,
            finished_at: now,
            duration_ms: 0,
            infrastructure_retries: 0,
        }
    }

    pub fn with_failure(mut self, failure: UnitFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn is_infrastructure_failure(&self) -> bool {
        self.status == UnitStatus::Failed
            && matches!(
                self.failure,
                Some(UnitFailure {
                    kind: FailureKind::Infrastructure,
                    ..
                })
            )
    }

    pub fn phase_duration_ms(&self, status: UnitStatus) -> u64 {
        self.phases
            .iter()
            .filter(|p| p.status == status)
            .map(|p| p.duration_ms)
            .sum()
    }
}
