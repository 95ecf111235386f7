use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::traits::{EventRenderer, RunEvent};
use crate::executor::types::UnitStatus;

/// Routes run events to the configured renderer, or to `tracing` when none
/// is set.
#[derive(Clone, Default)]
pub struct EventSink {
    renderer: Option<Arc<dyn EventRenderer>>,
}

impl EventSink {
    pub fn new(renderer: Option<Arc<dyn EventRenderer>>) -> Self {
        Self { renderer }
    }

    pub fn emit(&self, event: RunEvent) {
        match &self.renderer {
            Some(renderer) => renderer.render(&event),
            None => log_event(&event),
        }
    }
}

fn log_event(event: &RunEvent) {
    match event {
        RunEvent::RunStart {
            run_id,
            total_units,
            resumed,
        } => info!(run_id = %run_id, total_units, resumed, "run started"),
        RunEvent::Plan {
            run_id,
            layers,
            concurrency_limit,
        } => {
            info!(run_id = %run_id, layers = layers.len(), concurrency_limit, "execution plan");
            for (i, layer) in layers.iter().enumerate() {
                debug!(run_id = %run_id, layer = i, units = %layer.join(", "), "plan layer");
            }
        }
        RunEvent::PhaseChange { run_id, phase } => {
            info!(run_id = %run_id, phase = %phase, "run phase")
        }
        RunEvent::UnitDispatched {
            run_id,
            unit_id,
            execution_id,
            layer,
            wait_ms,
        } => debug!(
            run_id = %run_id,
            unit = %unit_id,
            execution_id = %execution_id,
            layer,
            wait_ms,
            "unit dispatched"
        ),
        RunEvent::UnitTransition {
            run_id,
            unit_id,
            from,
            to,
            ..
        } => debug!(run_id = %run_id, unit = %unit_id, from = %from, to = %to, "unit transition"),
        RunEvent::RemediationAttempt {
            run_id,
            unit_id,
            attempt,
        } => info!(
            run_id = %run_id,
            unit = %unit_id,
            attempt = attempt.attempt_number,
            fixer = %attempt.fixer,
            outcome = ?attempt.outcome,
            score_after = ?attempt.score_after,
            "remediation attempt"
        ),
        RunEvent::UnitRequeued {
            run_id,
            unit_id,
            attempt,
            reason,
        } => warn!(run_id = %run_id, unit = %unit_id, attempt, reason = %reason, "unit requeued"),
        RunEvent::UnitFinished { run_id, report } => match report.status {
            UnitStatus::Done => info!(
                run_id = %run_id,
                unit = %report.unit_id,
                duration_ms = report.duration_ms,
                "unit done"
            ),
            status => warn!(
                run_id = %run_id,
                unit = %report.unit_id,
                status = %status,
                failure = ?report.failure,
                "unit did not complete"
            ),
        },
        RunEvent::ControlApplied {
            run_id,
            signal,
            control,
            concurrency_limit,
        } => info!(
            run_id = %run_id,
            signal = %signal,
            control = %control,
            concurrency_limit,
            "control signal applied"
        ),
        RunEvent::Compacted {
            run_id,
            generation,
            snapshot_bytes,
            pending,
            active,
        } => info!(
            run_id = %run_id,
            generation,
            snapshot_bytes,
            pending,
            active,
            "state compacted"
        ),
        RunEvent::Escalation { run_id, message } => {
            error!(run_id = %run_id, message = %message, "operator escalation")
        }
        RunEvent::RunEnd { run_id, report } => info!(
            run_id = %run_id,
            status = ?report.status,
            succeeded = report.totals.succeeded,
            failed = report.totals.failed,
            blocked = report.totals.blocked,
            wall_clock_ms = report.wall_clock_ms,
            "run finished"
        ),
    }
}
