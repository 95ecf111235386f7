use chrono::{DateTime, Utc};

use crate::executor::types::{RemediationAttempt, UnitReport, UnitStatus};
use crate::report::RunReport;
use crate::state::{ControlFlag, RunPhase};

/// Output renderer plugin for run events.
pub trait EventRenderer: Send + Sync {
    fn name(&self) -> &str;
    fn format(&self) -> &str;
    fn supports_streaming(&self) -> bool {
        false
    }
    fn render(&self, event: &RunEvent);
}

#[derive(Debug, Clone)]
pub enum RunEvent {
    RunStart {
        run_id: String,
        total_units: usize,
        resumed: bool,
    },
    Plan {
        run_id: String,
        layers: Vec<Vec<String>>,
        concurrency_limit: usize,
    },
    PhaseChange {
        run_id: String,
        phase: RunPhase,
    },
    UnitDispatched {
        run_id: String,
        unit_id: String,
        execution_id: String,
        layer: usize,
        wait_ms: u64,
    },
    UnitTransition {
        run_id: String,
        unit_id: String,
        from: UnitStatus,
        to: UnitStatus,
        at: DateTime<Utc>,
    },
    RemediationAttempt {
        run_id: String,
        unit_id: String,
        attempt: RemediationAttempt,
    },
    UnitRequeued {
        run_id: String,
        unit_id: String,
        attempt: u32,
        reason: String,
    },
    UnitFinished {
        run_id: String,
        report: UnitReport,
    },
    ControlApplied {
        run_id: String,
        signal: String,
        control: ControlFlag,
        concurrency_limit: usize,
    },
    Compacted {
        run_id: String,
        generation: u64,
        snapshot_bytes: usize,
        pending: usize,
        active: usize,
    },
    Escalation {
        run_id: String,
        message: String,
    },
    RunEnd {
        run_id: String,
        report: RunReport,
    },
}

impl RunEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunStart { .. } => "run.start",
            Self::Plan { .. } => "run.plan",
            Self::PhaseChange { .. } => "run.phase",
            Self::UnitDispatched { .. } => "unit.dispatched",
            Self::UnitTransition { .. } => "unit.transition",
            Self::RemediationAttempt { .. } => "unit.remediation",
            Self::UnitRequeued { .. } => "unit.requeued",
            Self::UnitFinished { .. } => "unit.finished",
            Self::ControlApplied { .. } => "control.applied",
            Self::Compacted { .. } => "state.compacted",
            Self::Escalation { .. } => "run.escalation",
            Self::RunEnd { .. } => "run.end",
        }
    }

    pub fn run_id(&self) -> &str {
        match self {
            Self::RunStart { run_id, .. }
            | Self::Plan { run_id, .. }
            | Self::PhaseChange { run_id, .. }
            | Self::UnitDispatched { run_id, .. }
            | Self::UnitTransition { run_id, .. }
            | Self::RemediationAttempt { run_id, .. }
            | Self::UnitRequeued { run_id, .. }
            | Self::UnitFinished { run_id, .. }
            | Self::ControlApplied { run_id, .. }
            | Self::Compacted { run_id, .. }
            | Self::Escalation { run_id, .. }
            | Self::RunEnd { run_id, .. } => run_id,
        }
    }
}
