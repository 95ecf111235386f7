use chrono::Local;
use serde_json::{json, Value};
use suiteflow_core::executor::traits::{EventRenderer, RunEvent};

/// One JSON object per event on stdout.
pub struct JsonlRendererPlugin {
    pretty_print: bool,
}

impl JsonlRendererPlugin {
    pub fn new(pretty_print: bool) -> Self {
        Self { pretty_print }
    }

    fn event_to_json(&self, event: &RunEvent) -> Value {
        let ts = Local::now().to_rfc3339();
        let (unit_id, metadata) = match event {
            RunEvent::RunStart {
                total_units,
                resumed,
                ..
            } => (
                None,
                json!({
                    "total_units": total_units,
                    "resumed": resumed,
                }),
            ),
            RunEvent::Plan {
                layers,
                concurrency_limit,
                ..
            } => (
                None,
                json!({
                    "layers": layers,
                    "concurrency_limit": concurrency_limit,
                }),
            ),
            RunEvent::PhaseChange { phase, .. } => (None, json!({ "phase": phase.to_string() })),
            RunEvent::UnitDispatched {
                unit_id,
                execution_id,
                layer,
                wait_ms,
                ..
            } => (
                Some(unit_id),
                json!({
                    "execution_id": execution_id,
                    "layer": layer,
                    "wait_ms": wait_ms,
                }),
            ),
            RunEvent::UnitTransition {
                unit_id, from, to, at, ..
            } => (
                Some(unit_id),
                json!({
                    "from": from,
                    "to": to,
                    "at": at.to_rfc3339(),
                }),
            ),
            RunEvent::RemediationAttempt {
                unit_id, attempt, ..
            } => (Some(unit_id), to_value(attempt)),
            RunEvent::UnitRequeued {
                unit_id,
                attempt,
                reason,
                ..
            } => (
                Some(unit_id),
                json!({
                    "attempt": attempt,
                    "reason": reason,
                }),
            ),
            RunEvent::UnitFinished { report, .. } => (Some(&report.unit_id), to_value(report)),
            RunEvent::ControlApplied {
                signal,
                control,
                concurrency_limit,
                ..
            } => (
                None,
                json!({
                    "signal": signal,
                    "control": control,
                    "concurrency_limit": concurrency_limit,
                }),
            ),
            RunEvent::Compacted {
                generation,
                snapshot_bytes,
                pending,
                active,
                ..
            } => (
                None,
                json!({
                    "generation": generation,
                    "snapshot_bytes": snapshot_bytes,
                    "pending": pending,
                    "active": active,
                }),
            ),
            RunEvent::Escalation { message, .. } => (None, json!({ "message": message })),
            RunEvent::RunEnd { report, .. } => (
                None,
                json!({
                    "status": report.status,
                    "totals": report.totals,
                    "wall_clock_ms": report.wall_clock_ms,
                    "total_remediation_attempts": report.total_remediation_attempts,
                    "failures": report.failures,
                    "blocked": report.blocked,
                }),
            ),
        };

        let mut value = json!({
            "v": 1,
            "event_type": event.event_type(),
            "ts": ts,
            "run_id": event.run_id(),
            "metadata": metadata,
        });
        if let Some(unit_id) = unit_id {
            value["unit_id"] = json!(unit_id);
        }
        value
    }
}

fn to_value<T: serde::Serialize>(v: &T) -> Value {
    serde_json::to_value(v).unwrap_or(Value::Null)
}

impl EventRenderer for JsonlRendererPlugin {
    fn name(&self) -> &str {
        "jsonl-renderer"
    }

    fn format(&self) -> &str {
        "jsonl"
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    fn render(&self, event: &RunEvent) {
        let value = self.event_to_json(event);
        if self.pretty_print {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".into()));
        } else {
            println!("{}", serde_json::to_string(&value).unwrap_or_else(|_| "{}".into()));
        }
    }
}
