use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ControlFlag {
    #[default]
    Running,
    Paused,
    Draining,
    Aborting,
}

impl fmt::Display for ControlFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Draining => "draining",
            Self::Aborting => "aborting",
        };
        f.write_str(s)
    }
}

/// Top-level run phases, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    #[default]
    Initialize,
    Plan,
    Build,
    Verify,
    Complete,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initialize => "INITIALIZE",
            Self::Plan => "PLAN",
            Self::Build => "BUILD",
            Self::Verify => "VERIFY",
            Self::Complete => "COMPLETE",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub dispatched: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub requeued: u64,
    pub remediation_attempts: u64,
    pub signals_processed: u64,
    pub compactions: u64,
}

/// Reference to an in-flight unit. The execution id addresses the unit's
/// task in the execution host; nothing heavier is kept here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveUnit {
    pub execution_id: String,
    pub dispatched_at: DateTime<Utc>,
    pub wait_ms: u64,
}

/// The one piece of mutable run state. Only the control loop writes to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorState {
    pub pending_queue: Vec<String>,
    pub active_set: BTreeMap<String, ActiveUnit>,
    pub retry_counters: BTreeMap<String, u32>,
    pub concurrency_limit: usize,
    pub control: ControlFlag,
    pub statistics: RunStatistics,
}

impl OrchestratorState {
    pub fn new(concurrency_limit: usize) -> Self {
        Self {
            pending_queue: Vec::new(),
            active_set: BTreeMap::new(),
            retry_counters: BTreeMap::new(),
            concurrency_limit: concurrency_limit.max(1),
            control: ControlFlag::Running,
            statistics: RunStatistics::default(),
        }
    }

    /// Append to the pending queue unless the id is already queued or active.
    pub fn enqueue(&mut self, unit_id: &str) -> bool {
        if self.is_known(unit_id) {
            return false;
        }
        self.pending_queue.push(unit_id.to_string());
        true
    }

    /// Put a unit back at the head of the queue.
    pub fn enqueue_front(&mut self, unit_id: &str) -> bool {
        if self.is_known(unit_id) {
            return false;
        }
        self.pending_queue.insert(0, unit_id.to_string());
        true
    }

    pub fn remove_pending(&mut self, unit_id: &str) -> bool {
        let before = self.pending_queue.len();
        self.pending_queue.retain(|id| id != unit_id);
        before != self.pending_queue.len()
    }

    pub fn is_known(&self, unit_id: &str) -> bool {
        self.active_set.contains_key(unit_id) || self.pending_queue.iter().any(|id| id == unit_id)
    }

    pub fn bump_retry(&mut self, unit_id: &str) -> u32 {
        let counter = self.retry_counters.entry(unit_id.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    pub fn retries(&self, unit_id: &str) -> u32 {
        self.retry_counters.get(unit_id).copied().unwrap_or(0)
    }

    pub fn free_slots(&self) -> usize {
        self.concurrency_limit.saturating_sub(self.active_set.len())
    }
}

/// Read-only view published by the control loop after every turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSummary {
    pub run_id: String,
    pub phase: RunPhase,
    pub control: ControlFlag,
    pub pending: usize,
    pub pending_ids: Vec<String>,
    pub active: Vec<String>,
    pub concurrency_limit: usize,
    pub statistics: RunStatistics,
    pub events_since_compaction: u64,
    pub generation: u64,
    /// Set while an escalation waits for the operator.
    pub escalation: Option<String>,
}

impl StateSummary {
    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active() -> ActiveUnit {
        ActiveUnit {
            execution_id: "exec-1".into(),
            dispatched_at: Utc::now(),
            wait_ms: 0,
        }
    }

    #[test]
    fn enqueue_dedupes_against_pending_and_active() {
        let mut state = OrchestratorState::new(2);
        assert!(state.enqueue("a"));
        assert!(!state.enqueue("a"));

        state.active_set.insert("b".into(), active());
        assert!(!state.enqueue("b"));
        assert_eq!(state.pending_queue, vec!["a".to_string()]);
    }

    #[test]
    fn enqueue_front_goes_to_head() {
        let mut state = OrchestratorState::new(1);
        state.enqueue("a");
        state.enqueue("b");
        state.enqueue_front("c");
        assert_eq!(state.pending_queue, vec!["c", "a", "b"]);
    }

    #[test]
    fn free_slots_saturates_after_limit_drop() {
        let mut state = OrchestratorState::new(2);
        state.active_set.insert("a".into(), active());
        state.active_set.insert("b".into(), active());
        state.concurrency_limit = 1;
        assert_eq!(state.free_slots(), 0);
    }

    #[test]
    fn concurrency_limit_at_least_one() {
        assert_eq!(OrchestratorState::new(0).concurrency_limit, 1);
    }
}
