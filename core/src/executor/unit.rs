use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, error};

use super::output::EventSink;
use super::remediation::{remediate, RemediationResult};
use super::retry::{call_with_retry, CallResult, CancelSignal};
use super::traits::{NoRetry, RetryStrategyPlugin, RunEvent};
use super::types::{
    FailedPhase, FailureKind, PhaseTiming, RemediationAttempt, UnitFailure, UnitReport, UnitSpec,
    UnitStatus,
};
use crate::config::{QualityConfig, TimeoutConfig};
use crate::context::Collaborators;
use crate::quality::{QualityReport, QualityScoring};
use crate::state::StateTransition;

const OUTPUT_TAIL_CHARS: usize = 2_000;

#[derive(Debug, Clone, Copy)]
pub struct PhaseTimeouts {
    pub build: Duration,
    pub test: Duration,
    pub quality: Duration,
    pub fix: Duration,
    pub publish: Duration,
}

impl From<&TimeoutConfig> for PhaseTimeouts {
    fn from(cfg: &TimeoutConfig) -> Self {
        Self {
            build: Duration::from_millis(cfg.build_ms),
            test: Duration::from_millis(cfg.test_ms),
            quality: Duration::from_millis(cfg.quality_ms),
            fix: Duration::from_millis(cfg.fix_ms),
            publish: Duration::from_millis(cfg.publish_ms),
        }
    }
}

impl Default for PhaseTimeouts {
    fn default() -> Self {
        Self::from(&TimeoutConfig::default())
    }
}

/// Drives one unit through build → test → quality gate → (remediate)* → publish.
pub struct UnitExecutor {
    run_id: String,
    collaborators: Collaborators,
    scoring: QualityScoring,
    max_remediation_attempts: u32,
    timeouts: PhaseTimeouts,
    retry: Arc<dyn RetryStrategyPlugin>,
    events: EventSink,
}

pub(crate) enum Stop {
    Failed(UnitFailure),
    Cancelled,
}

impl UnitExecutor {
    pub fn new(run_id: impl Into<String>, collaborators: Collaborators) -> Self {
        let quality = QualityConfig::default();
        Self {
            run_id: run_id.into(),
            collaborators,
            scoring: QualityScoring::from_config(&quality),
            max_remediation_attempts: quality.max_remediation_attempts,
            timeouts: PhaseTimeouts::default(),
            retry: Arc::new(NoRetry),
            events: EventSink::default(),
        }
    }

    pub fn with_quality(mut self, cfg: &QualityConfig) -> Self {
        self.scoring = QualityScoring::from_config(cfg);
        self.max_remediation_attempts = cfg.max_remediation_attempts;
        self
    }

    pub fn with_timeouts(mut self, timeouts: PhaseTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_retry(mut self, retry: Arc<dyn RetryStrategyPlugin>) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Run the unit to a terminal state. Never fails: every outcome,
    /// including cancellation, is described by the returned report.
    pub async fn execute(
        &self,
        unit: Arc<UnitSpec>,
        execution_id: String,
        wait_ms: u64,
        mut cancel: CancelSignal,
    ) -> UnitReport {
        let mut run = UnitRun::new(&self.run_id, &unit.id, &self.events);
        let mut outputs = Outputs::default();

        let outcome = if cancel.is_cancelled() {
            Err(Stop::Cancelled)
        } else {
            self.drive(&unit, &mut run, &mut cancel, &mut outputs).await
        };

        let failure = match outcome {
            Ok(()) => {
                run.transition(UnitStatus::Done);
                None
            }
            Err(Stop::Failed(failure)) => {
                run.transition(UnitStatus::Failed);
                Some(failure)
            }
            Err(Stop::Cancelled) => {
                run.transition(UnitStatus::Cancelled);
                None
            }
        };

        debug!(unit = %unit.id, execution_id = %execution_id, status = %run.status, "unit finished");
        run.into_report(execution_id, failure, outputs, wait_ms)
    }

    async fn drive(
        &self,
        unit: &UnitSpec,
        run: &mut UnitRun<'_>,
        cancel: &mut CancelSignal,
        outputs: &mut Outputs,
    ) -> Result<(), Stop> {
        let retry = self.retry.as_ref();
        let c = &self.collaborators;

        run.transition(UnitStatus::Building);
        let build = call_with_retry("build", self.timeouts.build, retry, cancel, || {
            c.build.run(unit)
        })
        .await;
        let build = run.settle(build, FailureKind::Build)?;
        if !build.success {
            return Err(run.fail(
                FailureKind::Build,
                describe_failure("build", &build.stderr, &build.stdout),
            ));
        }

        run.transition(UnitStatus::Testing);
        let test = call_with_retry("test", self.timeouts.test, retry, cancel, || {
            c.test.run(unit)
        })
        .await;
        let test = run.settle(test, FailureKind::Test)?;
        outputs.coverage_pct = test.coverage_pct;
        if !test.success {
            return Err(run.fail(
                FailureKind::Test,
                describe_failure("tests", &test.stderr, &test.stdout),
            ));
        }

        run.transition(UnitStatus::QualityCheck);
        let check = call_with_retry("quality", self.timeouts.quality, retry, cancel, || {
            c.quality.check(unit)
        })
        .await;
        let mut report = run.settle(check, FailureKind::Quality)?;
        let passed = self.scoring.apply(&mut report);
        outputs.quality = Some(report.clone());

        if !passed {
            let result = remediate(
                unit,
                report,
                &c.fixers,
                c.quality.as_ref(),
                &self.scoring,
                self.max_remediation_attempts,
                &self.timeouts,
                retry,
                cancel,
                run,
            )
            .await;
            match result {
                RemediationResult::Passed(report) => outputs.quality = Some(report),
                RemediationResult::Exhausted(report) => {
                    let msg = format!(
                        "quality score {:.1} below threshold {:.1} after {} remediation attempt(s)",
                        report.score,
                        self.scoring.passing_threshold(),
                        run.attempts.len()
                    );
                    outputs.quality = Some(report);
                    return Err(run.fail(FailureKind::Quality, msg));
                }
                RemediationResult::NoFixer(report) => {
                    let failing: Vec<String> = report
                        .failing_categories()
                        .iter()
                        .map(|c| c.to_string())
                        .collect();
                    let msg = format!(
                        "quality score {:.1} below threshold {:.1}; no fixer covers [{}]",
                        report.score,
                        self.scoring.passing_threshold(),
                        failing.join(", ")
                    );
                    outputs.quality = Some(report);
                    return Err(run.fail(FailureKind::Quality, msg));
                }
                RemediationResult::CheckFailed { error, report } => {
                    outputs.quality = Some(report);
                    let kind = if error.is_transient() {
                        FailureKind::Infrastructure
                    } else {
                        FailureKind::Quality
                    };
                    return Err(run.fail(kind, error.to_string()));
                }
                RemediationResult::Cancelled => return Err(Stop::Cancelled),
            }
        }

        run.transition(UnitStatus::Publishing);
        let version = unit.version_or_default();
        let publish = call_with_retry("publish", self.timeouts.publish, retry, cancel, || {
            c.publisher.publish(unit, version)
        })
        .await;
        let publish = run.settle(publish, FailureKind::Publish)?;
        if !publish.success {
            let msg = publish
                .detail
                .unwrap_or_else(|| "publisher reported failure".to_string());
            return Err(run.fail(FailureKind::Publish, msg));
        }

        Ok(())
    }
}

#[derive(Default)]
struct Outputs {
    quality: Option<QualityReport>,
    coverage_pct: Option<f64>,
}

/// Mutable per-execution record: current state, phase timings, attempts.
pub(crate) struct UnitRun<'a> {
    run_id: &'a str,
    unit_id: &'a str,
    events: &'a EventSink,
    pub(crate) status: UnitStatus,
    entered: Instant,
    entered_at: DateTime<Utc>,
    started: Instant,
    started_at: DateTime<Utc>,
    phases: Vec<PhaseTiming>,
    pub(crate) attempts: Vec<RemediationAttempt>,
    retries: u32,
}

impl<'a> UnitRun<'a> {
    fn new(run_id: &'a str, unit_id: &'a str, events: &'a EventSink) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            unit_id,
            events,
            status: UnitStatus::Pending,
            entered: Instant::now(),
            entered_at: now,
            started: Instant::now(),
            started_at: now,
            phases: Vec::new(),
            attempts: Vec::new(),
            retries: 0,
        }
    }

    pub(crate) fn unit_id(&self) -> &str {
        self.unit_id
    }

    pub(crate) fn transition(&mut self, to: UnitStatus) {
        if let Err(e) = StateTransition::validate(self.status, to) {
            error!(unit = %self.unit_id, error = %e, "unit state machine violation");
            return;
        }

        let now = Utc::now();
        if self.status != UnitStatus::Pending {
            self.phases.push(PhaseTiming {
                status: self.status,
                entered_at: self.entered_at,
                duration_ms: self.entered.elapsed().as_millis() as u64,
            });
        }

        self.events.emit(RunEvent::UnitTransition {
            run_id: self.run_id.to_string(),
            unit_id: self.unit_id.to_string(),
            from: self.status,
            to,
            at: now,
        });

        self.status = to;
        self.entered = Instant::now();
        self.entered_at = now;
    }

    pub(crate) fn add_retries(&mut self, retries: u32) {
        self.retries = self.retries.saturating_add(retries);
    }

    pub(crate) fn record_attempt(&mut self, attempt: RemediationAttempt) {
        self.events.emit(RunEvent::RemediationAttempt {
            run_id: self.run_id.to_string(),
            unit_id: self.unit_id.to_string(),
            attempt: attempt.clone(),
        });
        self.attempts.push(attempt);
    }

    pub(crate) fn fail(&self, kind: FailureKind, message: impl Into<String>) -> Stop {
        Stop::Failed(UnitFailure::new(
            FailedPhase::from_status(self.status),
            kind,
            message,
        ))
    }

    /// Unwrap a collaborator call result, classifying errors for the
    /// current phase. Infrastructure errors that survived retry keep their
    /// own kind.
    pub(crate) fn settle<T>(&mut self, res: CallResult<T>, kind: FailureKind) -> Result<T, Stop> {
        match res {
            CallResult::Ok { value, retries } => {
                self.add_retries(retries);
                Ok(value)
            }
            CallResult::Err { error, retries } => {
                self.add_retries(retries);
                let kind = if error.is_transient() {
                    FailureKind::Infrastructure
                } else {
                    kind
                };
                Err(self.fail(kind, error.to_string()))
            }
            CallResult::Cancelled { retries } => {
                self.add_retries(retries);
                Err(Stop::Cancelled)
            }
        }
    }

    fn into_report(
        self,
        execution_id: String,
        failure: Option<UnitFailure>,
        outputs: Outputs,
        wait_ms: u64,
    ) -> UnitReport {
        UnitReport {
            unit_id: self.unit_id.to_string(),
            execution_id: Some(execution_id),
            status: self.status,
            failure,
            phases: self.phases,
            quality: outputs.quality,
            remediation_attempts: self.attempts,
            coverage_pct: outputs.coverage_pct,
            dependency_wait_ms: wait_ms,
            started_at: self.started_at,
            finished_at: Utc::now(),
            duration_ms: self.started.elapsed().as_millis() as u64,
            infrastructure_retries: self.retries,
        }
    }
}

fn describe_failure(label: &str, stderr: &str, stdout: &str) -> String {
    let source = if stderr.trim().is_empty() { stdout } else { stderr };
    let tail = tail_chars(source.trim(), OUTPUT_TAIL_CHARS);
    if tail.is_empty() {
        format!("{label} failed")
    } else {
        format!("{label} failed: {tail}")
    }
}

fn tail_chars(s: &str, max: usize) -> &str {
    let count = s.chars().count();
    if count <= max {
        return s;
    }
    let skip = count - max;
    match s.char_indices().nth(skip) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}
