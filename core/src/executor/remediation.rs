use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use super::retry::{call_with_retry, CallResult, CancelSignal};
use super::traits::{FixerPlugin, QualityChecker, RemediationRequest, RetryStrategyPlugin};
use super::types::{RemediationAttempt, RemediationOutcome, UnitSpec, UnitStatus};
use super::unit::{PhaseTimeouts, UnitRun};
use crate::error::CollaboratorError;
use crate::quality::{QualityCategory, QualityReport, QualityScoring};

/// Capability-tagged fixers, highest priority first. Equal priorities keep
/// registration order.
#[derive(Clone, Default)]
pub struct FixerRegistry {
    fixers: Vec<Arc<dyn FixerPlugin>>,
}

impl FixerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, fixer: Arc<dyn FixerPlugin>) {
        self.fixers.push(fixer);
        self.fixers.sort_by_key(|f| Reverse(f.priority()));
    }

    pub fn with(mut self, fixer: Arc<dyn FixerPlugin>) -> Self {
        self.register(fixer);
        self
    }

    pub fn len(&self) -> usize {
        self.fixers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.fixers.iter().map(|f| f.name()).collect()
    }

    /// Highest priority fixer covering at least one failing category, and the
    /// categories it will address (the intersection).
    pub fn select(
        &self,
        failing: &[QualityCategory],
    ) -> Option<(Arc<dyn FixerPlugin>, Vec<QualityCategory>)> {
        self.fixers.iter().find_map(|fixer| {
            let addressed: Vec<QualityCategory> = failing
                .iter()
                .copied()
                .filter(|c| fixer.categories().contains(c))
                .collect();
            (!addressed.is_empty()).then(|| (fixer.clone(), addressed))
        })
    }
}

#[derive(Debug)]
pub(crate) enum RemediationResult {
    Passed(QualityReport),
    /// Every attempt ran and the score is still below threshold.
    Exhausted(QualityReport),
    /// No registered fixer covers any failing category.
    NoFixer(QualityReport),
    /// The re-check itself failed.
    CheckFailed {
        error: CollaboratorError,
        report: QualityReport,
    },
    Cancelled,
}

/// Bounded fix-and-reverify loop entered from `QualityCheck` with a failing
/// report. Each attempt moves the unit to `Remediating`, asks the selected
/// fixer for a fix, moves back to `QualityCheck` and re-checks. A fixer that
/// reports failure still gets its re-check.
pub(crate) async fn remediate(
    unit: &UnitSpec,
    initial: QualityReport,
    fixers: &FixerRegistry,
    checker: &dyn QualityChecker,
    scoring: &QualityScoring,
    max_attempts: u32,
    timeouts: &PhaseTimeouts,
    retry: &dyn RetryStrategyPlugin,
    cancel: &mut CancelSignal,
    run: &mut UnitRun<'_>,
) -> RemediationResult {
    let mut report = initial;

    for attempt_number in 1..=max_attempts {
        let failing = report.failing_categories();
        let Some((fixer, addressed)) = fixers.select(&failing) else {
            warn!(
                unit = %run.unit_id(),
                failing = ?failing,
                "no fixer covers the failing quality categories"
            );
            return RemediationResult::NoFixer(report);
        };

        run.transition(UnitStatus::Remediating);
        let request = RemediationRequest {
            unit_id: unit.id.clone(),
            location: unit.location(),
            failures: report.failures_in(&addressed),
            categories: addressed.clone(),
            reference_spec: unit.reference_spec.clone(),
            attempt: attempt_number,
        };

        let started = Instant::now();
        let fix = call_with_retry("fix", timeouts.fix, retry, cancel, || fixer.fix(&request)).await;
        let (fix_ok, mut detail) = match fix {
            CallResult::Ok { value, retries } => {
                run.add_retries(retries);
                (value.success, value.detail)
            }
            CallResult::Err { error, retries } => {
                run.add_retries(retries);
                (false, Some(error.to_string()))
            }
            CallResult::Cancelled { retries } => {
                run.add_retries(retries);
                return RemediationResult::Cancelled;
            }
        };

        run.transition(UnitStatus::QualityCheck);
        let check = call_with_retry("quality", timeouts.quality, retry, cancel, || {
            checker.check(unit)
        })
        .await;

        let mut next = match check {
            CallResult::Ok { value, retries } => {
                run.add_retries(retries);
                value
            }
            CallResult::Err { error, retries } => {
                run.add_retries(retries);
                run.record_attempt(RemediationAttempt {
                    attempt_number,
                    fixer: fixer.name().to_string(),
                    categories_addressed: addressed,
                    duration_ms: started.elapsed().as_millis() as u64,
                    score_after: None,
                    outcome: RemediationOutcome::FixerError,
                    detail: Some(error.to_string()),
                });
                return RemediationResult::CheckFailed { error, report };
            }
            CallResult::Cancelled { retries } => {
                run.add_retries(retries);
                return RemediationResult::Cancelled;
            }
        };

        let passed = scoring.apply(&mut next);
        let outcome = if passed {
            RemediationOutcome::Passed
        } else if !fix_ok {
            RemediationOutcome::FixerError
        } else {
            RemediationOutcome::StillFailing
        };
        if detail.is_none() && !passed {
            detail = Some(format!("score {:.1}", next.score));
        }

        info!(
            unit = %unit.id,
            attempt = attempt_number,
            fixer = %fixer.name(),
            score = next.score,
            passed,
            "remediation attempt finished"
        );
        run.record_attempt(RemediationAttempt {
            attempt_number,
            fixer: fixer.name().to_string(),
            categories_addressed: addressed,
            duration_ms: started.elapsed().as_millis() as u64,
            score_after: Some(next.score),
            outcome,
            detail,
        });
        report = next;

        if passed {
            return RemediationResult::Passed(report);
        }
    }

    RemediationResult::Exhausted(report)
}
