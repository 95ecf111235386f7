use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, warn};

use super::graph::DependencyGraph;
use super::host::{Completion, ExecutionHost};
use super::types::{UnitReport, UnitSpec, UnitStatus};
use crate::error::GraphError;
use crate::state::{
    ActiveUnit, CompactionSnapshot, ControlFlag, OrchestratorState, RunPhase,
};

/// A unit handed to the execution host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub unit_id: String,
    pub execution_id: String,
    pub layer: usize,
    pub wait_ms: u64,
}

/// Finished merged units remembered after compaction drops them.
pub const RETIRED_WINDOW: usize = 128;

#[derive(Debug)]
pub enum CompletionOutcome {
    /// Terminal status recorded; dependents re-evaluate on the next dispatch.
    Recorded(UnitReport),
    /// Infrastructure failure within the requeue budget: back at the head of
    /// the pending queue.
    Requeued { report: UnitReport, attempt: u32 },
    /// Completion for an execution the scheduler does not track.
    Stale,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RestoreOutcome {
    /// Active units whose execution is still live in the host.
    pub reconnected: Vec<String>,
    /// Active units whose execution is gone, put back at the head of the queue.
    pub requeued: Vec<String>,
    /// Active units whose execution is gone and whose requeue budget is spent.
    pub lost: Vec<String>,
}

/// Ready queue, active set and concurrency bound over a [`DependencyGraph`].
///
/// Owns the [`OrchestratorState`]. Dispatch readiness is always computed from
/// current graph statuses at the moment of the check.
pub struct Scheduler {
    graph: DependencyGraph,
    specs: HashMap<String, Arc<UnitSpec>>,
    state: OrchestratorState,
    host: ExecutionHost,
    ready_since: HashMap<String, Instant>,
    max_requeues: u32,
    merged: Vec<UnitSpec>,
    retired: VecDeque<(String, UnitStatus)>,
}

impl Scheduler {
    /// Fresh scheduler: every unit pending, in declaration order.
    pub fn new(
        graph: DependencyGraph,
        units: &[UnitSpec],
        host: ExecutionHost,
        concurrency_limit: usize,
        max_requeues: u32,
    ) -> Self {
        let mut state = OrchestratorState::new(concurrency_limit);
        for id in graph.ids() {
            state.enqueue(id);
        }
        Self {
            graph,
            specs: index_specs(units),
            state,
            host,
            ready_since: HashMap::new(),
            max_requeues,
            merged: Vec::new(),
            retired: VecDeque::new(),
        }
    }

    /// Rebuild the scheduler from a compaction snapshot over a graph re-derived
    /// from the same declarative input.
    ///
    /// Units absent from the pending queue, the active set and the failed or
    /// cancelled lists are finished and marked `Done`. Active entries reconnect
    /// by execution id when the host still knows them.
    pub fn restore(
        mut graph: DependencyGraph,
        units: &[UnitSpec],
        snapshot: &CompactionSnapshot,
        host: ExecutionHost,
        max_requeues: u32,
    ) -> Result<(Self, RestoreOutcome), GraphError> {
        graph.extend(&snapshot.merged_units)?;

        let mut specs = index_specs(units);
        for unit in &snapshot.merged_units {
            specs
                .entry(unit.id.clone())
                .or_insert_with(|| Arc::new(unit.clone()));
        }

        let mut state = OrchestratorState::new(snapshot.concurrency_limit);
        state.control = snapshot.control;
        state.retry_counters = snapshot.retry_counters.clone();
        state.statistics = snapshot.statistics.clone();

        let ids: Vec<String> = graph.ids().map(str::to_string).collect();
        for id in &ids {
            graph.set_status(id, UnitStatus::Done);
        }
        for id in &snapshot.failed_units {
            graph.set_status(id, UnitStatus::Failed);
        }
        for id in &snapshot.cancelled_units {
            graph.set_status(id, UnitStatus::Cancelled);
        }
        for id in &snapshot.pending_queue {
            if graph.contains(id) {
                graph.set_status(id, UnitStatus::Pending);
                state.enqueue(id);
            } else {
                warn!(unit = %id, "snapshot references unknown pending unit, skipping");
            }
        }

        let mut outcome = RestoreOutcome::default();
        let mut lost_refs = Vec::new();
        for active in &snapshot.active {
            if !graph.contains(&active.unit_id) {
                warn!(unit = %active.unit_id, "snapshot references unknown active unit, skipping");
                continue;
            }
            if host.is_live(&active.execution_id) {
                graph.set_status(&active.unit_id, UnitStatus::Building);
                state.active_set.insert(
                    active.unit_id.clone(),
                    ActiveUnit {
                        execution_id: active.execution_id.clone(),
                        dispatched_at: active.dispatched_at,
                        wait_ms: active.wait_ms,
                    },
                );
                outcome.reconnected.push(active.unit_id.clone());
            } else {
                lost_refs.push(active.unit_id.clone());
            }
        }

        // Lost executions go back to the head of the queue in snapshot order.
        for unit_id in lost_refs.iter().rev() {
            if state.retries(unit_id) < max_requeues {
                state.bump_retry(unit_id);
                state.statistics.requeued += 1;
                graph.set_status(unit_id, UnitStatus::Pending);
                state.enqueue_front(unit_id);
                outcome.requeued.insert(0, unit_id.clone());
            } else {
                graph.set_status(unit_id, UnitStatus::Failed);
                state.statistics.failed += 1;
                outcome.lost.insert(0, unit_id.clone());
            }
        }

        Ok((
            Self {
                graph,
                specs,
                state,
                host,
                ready_since: HashMap::new(),
                max_requeues,
                merged: snapshot.merged_units.clone(),
                retired: snapshot.retired_units.iter().cloned().collect(),
            },
            outcome,
        ))
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn state(&self) -> &OrchestratorState {
        &self.state
    }

    pub fn host(&self) -> &ExecutionHost {
        &self.host
    }

    pub fn control(&self) -> ControlFlag {
        self.state.control
    }

    pub fn set_control(&mut self, control: ControlFlag) {
        self.state.control = control;
    }

    pub fn concurrency_limit(&self) -> usize {
        self.state.concurrency_limit
    }

    /// Takes effect on the next dispatch; never preempts running units.
    pub fn set_concurrency_limit(&mut self, limit: usize) -> usize {
        self.state.concurrency_limit = limit.max(1);
        self.state.concurrency_limit
    }

    pub fn statistics_mut(&mut self) -> &mut crate::state::RunStatistics {
        &mut self.state.statistics
    }

    pub fn has_active(&self) -> bool {
        !self.state.active_set.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.state.pending_queue.len()
    }

    pub fn active_ids(&self) -> Vec<String> {
        self.state.active_set.keys().cloned().collect()
    }

    /// Pending units whose dependencies are all `Done`, in queue order.
    pub fn ready_units(&self) -> Vec<String> {
        self.state
            .pending_queue
            .iter()
            .filter(|id| self.graph.dependencies_done(id))
            .cloned()
            .collect()
    }

    /// Nothing running and nothing that could start.
    pub fn is_stalled(&self) -> bool {
        self.state.active_set.is_empty() && self.ready_units().is_empty()
    }

    /// Start as many ready units as free slots allow. No-op unless running.
    pub fn dispatch_ready(&mut self) -> Vec<Dispatched> {
        if self.state.control != ControlFlag::Running {
            return Vec::new();
        }

        let ready = self.ready_units();
        let now = Instant::now();
        for id in &ready {
            self.ready_since.entry(id.clone()).or_insert(now);
        }

        let slots = self.state.free_slots();
        let mut dispatched = Vec::new();
        for unit_id in ready.into_iter().take(slots) {
            let Some(spec) = self.specs.get(&unit_id).cloned() else {
                warn!(unit = %unit_id, "no spec for ready unit, dropping it from the queue");
                self.state.remove_pending(&unit_id);
                continue;
            };

            self.state.remove_pending(&unit_id);
            let wait_ms = self
                .ready_since
                .remove(&unit_id)
                .map(|t| t.elapsed().as_millis() as u64)
                .unwrap_or(0);

            let execution_id = self.host.launch(spec, wait_ms);
            self.graph.set_status(&unit_id, UnitStatus::Building);
            self.state.active_set.insert(
                unit_id.clone(),
                ActiveUnit {
                    execution_id: execution_id.clone(),
                    dispatched_at: Utc::now(),
                    wait_ms,
                },
            );
            self.state.statistics.dispatched += 1;
            debug!(unit = %unit_id, execution_id = %execution_id, wait_ms, "dispatched");

            dispatched.push(Dispatched {
                layer: self.graph.layer_of(&unit_id).unwrap_or_default(),
                unit_id,
                execution_id,
                wait_ms,
            });
        }
        dispatched
    }

    /// Route a completion: leave the active set, record the terminal status.
    pub fn complete(&mut self, completion: Completion) -> CompletionOutcome {
        let Completion {
            execution_id,
            report,
        } = completion;
        self.host.acknowledge(&execution_id);

        let unit_id = self
            .state
            .active_set
            .iter()
            .find(|(_, a)| a.execution_id == execution_id)
            .map(|(id, _)| id.clone());
        let Some(unit_id) = unit_id else {
            debug!(execution_id = %execution_id, "completion for untracked execution");
            return CompletionOutcome::Stale;
        };
        self.state.active_set.remove(&unit_id);

        let may_requeue = matches!(self.state.control, ControlFlag::Running | ControlFlag::Paused);
        if may_requeue
            && report.is_infrastructure_failure()
            && self.state.retries(&unit_id) < self.max_requeues
        {
            let attempt = self.state.bump_retry(&unit_id);
            self.state.statistics.requeued += 1;
            self.graph.set_status(&unit_id, UnitStatus::Pending);
            self.state.enqueue_front(&unit_id);
            return CompletionOutcome::Requeued { report, attempt };
        }

        self.graph.set_status(&unit_id, report.status);
        let stats = &mut self.state.statistics;
        match report.status {
            UnitStatus::Done => stats.completed += 1,
            UnitStatus::Failed => stats.failed += 1,
            UnitStatus::Cancelled => stats.cancelled += 1,
            other => warn!(unit = %unit_id, status = %other, "non-terminal completion"),
        }
        stats.remediation_attempts += report.remediation_attempts.len() as u64;
        CompletionOutcome::Recorded(report)
    }

    /// Add previously unknown units to the graph and the tail of the queue.
    ///
    /// Ids already in the graph or retired are skipped. A dependency on a
    /// retired `Done` unit is satisfied; one on a retired failure is rejected.
    pub fn merge_units(&mut self, units: Vec<UnitSpec>) -> Result<Vec<String>, GraphError> {
        let mut fresh = Vec::with_capacity(units.len());
        for mut unit in units {
            if self.retired_status(&unit.id).is_some() {
                continue;
            }
            let mut deps = Vec::with_capacity(unit.dependencies.len());
            for dep in std::mem::take(&mut unit.dependencies) {
                if self.graph.contains(&dep) {
                    deps.push(dep);
                    continue;
                }
                match self.retired_status(&dep) {
                    Some(UnitStatus::Done) => {}
                    Some(status) => {
                        return Err(GraphError::RetiredDependency {
                            unit: unit.id,
                            dependency: dep,
                            status: status.to_string(),
                        })
                    }
                    None => deps.push(dep),
                }
            }
            unit.dependencies = deps;
            fresh.push(unit);
        }

        let added = self.graph.extend(&fresh)?;
        for unit in fresh {
            if added.contains(&unit.id) && !self.specs.contains_key(&unit.id) {
                self.state.enqueue(&unit.id);
                self.specs.insert(unit.id.clone(), Arc::new(unit.clone()));
                self.merged.push(unit);
            }
        }
        Ok(added)
    }

    fn retired_status(&self, id: &str) -> Option<UnitStatus> {
        self.retired
            .iter()
            .rev()
            .find(|(retired, _)| retired == id)
            .map(|(_, status)| *status)
    }

    /// Drop every pending unit. They stay `Pending` in the graph.
    pub fn discard_pending(&mut self) -> Vec<String> {
        self.ready_since.clear();
        std::mem::take(&mut self.state.pending_queue)
    }

    /// Units still pending, split into blocked (with their failed or cancelled
    /// ancestors) and not started.
    pub fn unfinished(&self) -> Vec<(String, Vec<String>)> {
        self.graph
            .nodes()
            .iter()
            .filter(|n| !n.status.is_terminal())
            .map(|n| (n.id.clone(), self.graph.failed_ancestors(&n.id)))
            .collect()
    }

    /// Capture the loop state.
    ///
    /// Merged units that are finished and no longer needed to block an
    /// unfinished unit are retired: they leave `merged_units`, the failed and
    /// cancelled lists and the retry counters, and kept units drop edges to
    /// them. Declared units always stay, since the graph is re-derived from
    /// them.
    pub fn snapshot(&self, run_id: &str, generation: u64, phase: RunPhase) -> CompactionSnapshot {
        let merged_ids: HashSet<&str> = self.merged.iter().map(|u| u.id.as_str()).collect();
        let mut kept: HashSet<String> = HashSet::new();
        for unit in &self.merged {
            let open = self
                .graph
                .status(&unit.id)
                .is_some_and(|status| !status.is_terminal());
            if open {
                kept.insert(unit.id.clone());
                kept.extend(
                    self.graph
                        .failed_ancestors(&unit.id)
                        .into_iter()
                        .filter(|id| merged_ids.contains(id.as_str())),
                );
            }
        }
        let survives = |id: &str| !merged_ids.contains(id) || kept.contains(id);

        let mut retired = self.retired.clone();
        let mut merged_units = Vec::new();
        for unit in &self.merged {
            if kept.contains(&unit.id) {
                let mut unit = unit.clone();
                unit.dependencies.retain(|dep| survives(dep.as_str()));
                merged_units.push(unit);
            } else if let Some(status) = self.graph.status(&unit.id) {
                retired.push_back((unit.id.clone(), status));
            }
        }
        let excess = retired.len().saturating_sub(RETIRED_WINDOW);
        retired.drain(..excess);

        let with_status = |status: UnitStatus| {
            self.graph
                .nodes()
                .iter()
                .filter(|n| n.status == status && survives(n.id.as_str()))
                .map(|n| n.id.clone())
                .collect::<Vec<_>>()
        };
        let mut snapshot = CompactionSnapshot::capture(
            run_id,
            generation,
            phase,
            &self.state,
            with_status(UnitStatus::Failed),
            with_status(UnitStatus::Cancelled),
            merged_units,
        );
        snapshot.retry_counters.retain(|id, _| survives(id.as_str()));
        snapshot.retired_units = retired.into_iter().collect();
        snapshot
    }
}

fn index_specs(units: &[UnitSpec]) -> HashMap<String, Arc<UnitSpec>> {
    units
        .iter()
        .map(|u| (u.id.clone(), Arc::new(u.clone())))
        .collect()
}
