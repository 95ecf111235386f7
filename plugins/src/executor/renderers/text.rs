use suiteflow_core::executor::traits::{EventRenderer, RunEvent};
use suiteflow_core::UnitStatus;

/// Human-readable event lines on stdout.
pub struct TextRendererPlugin {
    ascii_only: bool,
    verbose: bool,
}

impl TextRendererPlugin {
    pub fn new(ascii_only: bool) -> Self {
        Self {
            ascii_only,
            verbose: false,
        }
    }

    /// Also print per-unit phase transitions.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn format_event(&self, event: &RunEvent) -> Option<String> {
        let line = match event {
            RunEvent::RunStart {
                run_id,
                total_units,
                resumed,
            } => {
                let kind = if *resumed { "RUN RESUME" } else { "RUN START" };
                format!("{} {} (units: {})", kind, run_id, total_units)
            }
            RunEvent::Plan {
                run_id,
                layers,
                concurrency_limit,
            } => {
                let mut out = format!("PLAN {} (concurrency {}):", run_id, concurrency_limit);
                for (idx, layer) in layers.iter().enumerate() {
                    out.push_str(&format!("\n  layer {}: {}", idx, layer.join(", ")));
                }
                out
            }
            RunEvent::PhaseChange { run_id, phase } => format!("PHASE {} {}", run_id, phase),
            RunEvent::UnitDispatched {
                unit_id,
                layer,
                wait_ms,
                ..
            } => format!("UNIT START {} (layer {}, waited {}ms)", unit_id, layer, wait_ms),
            RunEvent::UnitTransition {
                unit_id, from, to, ..
            } => {
                if !self.verbose {
                    return None;
                }
                format!("UNIT {} {} -> {}", unit_id, from, to)
            }
            RunEvent::RemediationAttempt {
                unit_id, attempt, ..
            } => {
                let mut line = format!(
                    "REMEDIATION {} (attempt {}, fixer {}, {:?})",
                    unit_id, attempt.attempt_number, attempt.fixer, attempt.outcome
                );
                if let Some(score) = attempt.score_after {
                    line.push_str(&format!(", score {:.1}", score));
                }
                line
            }
            RunEvent::UnitRequeued {
                unit_id,
                attempt,
                reason,
                ..
            } => format!("UNIT REQUEUE {} (attempt {}): {}", unit_id, attempt, reason),
            RunEvent::UnitFinished { report, .. } => {
                let status = match (report.status, self.ascii_only) {
                    (UnitStatus::Done, true) => "OK",
                    (UnitStatus::Done, false) => "✅ DONE",
                    (UnitStatus::Cancelled, true) => "CANCELLED",
                    (UnitStatus::Cancelled, false) => "⏹ CANCELLED",
                    (_, true) => "FAIL",
                    (_, false) => "❌ FAILED",
                };
                let mut line = format!(
                    "UNIT END {} (status {}, duration {}ms, remediation {})",
                    report.unit_id,
                    status,
                    report.duration_ms,
                    report.remediation_attempts.len()
                );
                if let Some(failure) = &report.failure {
                    line.push_str(&format!(": {}", failure.message));
                }
                line
            }
            RunEvent::ControlApplied {
                signal,
                control,
                concurrency_limit,
                ..
            } => format!(
                "CONTROL {} (state {}, concurrency {})",
                signal, control, concurrency_limit
            ),
            RunEvent::Compacted {
                generation,
                snapshot_bytes,
                pending,
                active,
                ..
            } => format!(
                "COMPACTED generation {} ({} bytes, pending {}, active {})",
                generation, snapshot_bytes, pending, active
            ),
            RunEvent::Escalation { run_id, message } => {
                format!("ESCALATION {}: {} (send resume, drain or abort)", run_id, message)
            }
            RunEvent::RunEnd { run_id, report } => format!(
                "RUN END {} (status {}, succeeded {}, failed {}, blocked {}, duration {}ms)",
                run_id,
                report.status.as_str(),
                report.totals.succeeded,
                report.totals.failed,
                report.totals.blocked,
                report.wall_clock_ms
            ),
        };
        Some(line)
    }
}

impl EventRenderer for TextRendererPlugin {
    fn name(&self) -> &str {
        "text-renderer"
    }

    fn format(&self) -> &str {
        "text"
    }

    fn render(&self, event: &RunEvent) {
        if let Some(line) = self.format_event(event) {
            println!("{}", line);
        }
    }
}
