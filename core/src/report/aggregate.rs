use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::verify::Verification;
use crate::executor::types::{FailedPhase, FailureKind, UnitReport, UnitStatus};

/// How the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every reachable unit finished.
    Completed,
    /// Stopped dispatching after a drain signal; in-flight units finished.
    Drained,
    /// Aborted; in-flight units were cancelled.
    Aborted,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::Drained => "drained",
            RunStatus::Aborted => "aborted",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTotals {
    pub units: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Never dispatched because a dependency failed or was cancelled.
    pub blocked: usize,
    /// Never dispatched because the run stopped early.
    pub not_started: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedUnit {
    pub unit_id: String,
    pub phase: FailedPhase,
    pub kind: FailureKind,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedUnit {
    pub unit_id: String,
    pub failed_dependencies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTiming {
    pub unit_id: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRemediation {
    pub unit_id: String,
    pub attempts: usize,
}

/// Run-level summary assembled at COMPLETE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub wall_clock_ms: u64,
    pub totals: RunTotals,
    pub total_remediation_attempts: usize,
    pub failures: Vec<FailedUnit>,
    pub cancelled: Vec<String>,
    pub blocked: Vec<BlockedUnit>,
    pub not_started: Vec<String>,
    pub slowest: Vec<UnitTiming>,
    pub most_remediated: Vec<UnitRemediation>,
    /// Finished units whose reports were folded into the totals mid-run and
    /// are absent from `units`.
    #[serde(default)]
    pub archived_units: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verification_issues: Vec<String>,
    pub units: Vec<UnitReport>,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        self.totals.failed > 0 || self.totals.blocked > 0
    }

    pub fn unit(&self, unit_id: &str) -> Option<&UnitReport> {
        self.units.iter().find(|u| u.unit_id == unit_id)
    }
}

/// Tallies of unit reports evicted from a long-lived run.
///
/// Keeps counts plus at most `keep` entries per ranked list, so it stays
/// bounded however many units pass through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportArchive {
    pub units: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub remediation_attempts: usize,
    /// Most recent failures.
    pub failures: Vec<FailedUnit>,
    pub slowest: Vec<UnitTiming>,
    pub most_remediated: Vec<UnitRemediation>,
}

impl ReportArchive {
    pub fn absorb(&mut self, report: &UnitReport, keep: usize) {
        self.units += 1;
        self.remediation_attempts += report.remediation_attempts.len();
        match report.status {
            UnitStatus::Done => self.succeeded += 1,
            UnitStatus::Failed => {
                self.failed += 1;
                self.failures.push(failed_unit(report));
                let excess = self.failures.len().saturating_sub(keep);
                self.failures.drain(..excess);
            }
            UnitStatus::Cancelled => self.cancelled += 1,
            _ => {}
        }

        self.slowest.push(UnitTiming {
            unit_id: report.unit_id.clone(),
            duration_ms: report.duration_ms,
        });
        self.slowest.sort_by(|a, b| b.duration_ms.cmp(&a.duration_ms));
        self.slowest.truncate(keep);

        if !report.remediation_attempts.is_empty() {
            self.most_remediated.push(UnitRemediation {
                unit_id: report.unit_id.clone(),
                attempts: report.remediation_attempts.len(),
            });
            self.most_remediated.sort_by(|a, b| b.attempts.cmp(&a.attempts));
            self.most_remediated.truncate(keep);
        }
    }
}

fn failed_unit(report: &UnitReport) -> FailedUnit {
    let (phase, kind, reason) = match &report.failure {
        Some(f) => (f.phase, f.kind, f.message.clone()),
        None => (
            FailedPhase::Dispatch,
            FailureKind::Infrastructure,
            "no failure recorded".to_string(),
        ),
    };
    FailedUnit {
        unit_id: report.unit_id.clone(),
        phase,
        kind,
        reason,
    }
}

/// Everything the aggregator reads. Borrowed so aggregation stays pure.
#[derive(Debug, Clone, Copy)]
pub struct AggregateInput<'a> {
    pub run_id: &'a str,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Unit ids in declaration order; fixes the order of every list.
    pub unit_order: &'a [String],
    pub reports: &'a BTreeMap<String, UnitReport>,
    /// Reports already evicted from `reports`.
    pub archive: &'a ReportArchive,
    pub verification: &'a Verification,
    pub top_n: usize,
}

pub fn aggregate(input: AggregateInput<'_>) -> RunReport {
    let units: Vec<UnitReport> = input
        .unit_order
        .iter()
        .filter_map(|id| input.reports.get(id).cloned())
        .collect();

    let archive = input.archive;
    let mut totals = RunTotals {
        units: input.unit_order.len() + archive.units,
        succeeded: archive.succeeded,
        failed: archive.failed,
        cancelled: archive.cancelled,
        blocked: input.verification.blocked.len(),
        not_started: input.verification.not_started.len(),
    };
    let mut failures = archive.failures.clone();
    let mut cancelled = Vec::new();
    let mut total_remediation_attempts = archive.remediation_attempts;

    for report in &units {
        total_remediation_attempts += report.remediation_attempts.len();
        match report.status {
            UnitStatus::Done => totals.succeeded += 1,
            UnitStatus::Failed => {
                totals.failed += 1;
                failures.push(failed_unit(report));
            }
            UnitStatus::Cancelled => {
                totals.cancelled += 1;
                cancelled.push(report.unit_id.clone());
            }
            _ => {}
        }
    }

    // Stable sorts keep declaration order among equal values.
    let mut slowest: Vec<UnitTiming> = archive
        .slowest
        .iter()
        .cloned()
        .chain(units.iter().map(|r| UnitTiming {
            unit_id: r.unit_id.clone(),
            duration_ms: r.duration_ms,
        }))
        .collect();
    slowest.sort_by(|a, b| b.duration_ms.cmp(&a.duration_ms));
    slowest.truncate(input.top_n);

    let mut most_remediated: Vec<UnitRemediation> = archive
        .most_remediated
        .iter()
        .cloned()
        .chain(
            units
                .iter()
                .filter(|r| !r.remediation_attempts.is_empty())
                .map(|r| UnitRemediation {
                    unit_id: r.unit_id.clone(),
                    attempts: r.remediation_attempts.len(),
                }),
        )
        .collect();
    most_remediated.sort_by(|a, b| b.attempts.cmp(&a.attempts));
    most_remediated.truncate(input.top_n);

    let blocked = input
        .verification
        .blocked
        .iter()
        .map(|(unit_id, deps)| BlockedUnit {
            unit_id: unit_id.clone(),
            failed_dependencies: deps.clone(),
        })
        .collect();

    let wall_clock_ms = (input.finished_at - input.started_at)
        .num_milliseconds()
        .max(0) as u64;

    RunReport {
        run_id: input.run_id.to_string(),
        status: input.status,
        started_at: input.started_at,
        finished_at: input.finished_at,
        wall_clock_ms,
        totals,
        total_remediation_attempts,
        failures,
        cancelled,
        blocked,
        not_started: input.verification.not_started.clone(),
        slowest,
        most_remediated,
        archived_units: archive.units,
        verification_issues: input.verification.issues.clone(),
        units,
    }
}
