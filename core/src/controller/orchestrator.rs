use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::compaction::CompactionPolicy;
use super::signals::{ControlHandle, ControlSignal};
use super::system::sample_concurrency_context;
use crate::config::AppConfig;
use crate::context::Collaborators;
use crate::error::OrchestratorError;
use crate::executor::traits::{
    ConcurrencyStrategyPlugin, EventRenderer, NoRetry, RetryStrategyPlugin, RunEvent,
};
use crate::executor::types::{FailedPhase, FailureKind, UnitFailure};
use crate::executor::{
    Completion, CompletionOutcome, DependencyGraph, EventSink, ExecutionHost, PhaseTimeouts,
    ProgressMonitor, Scheduler, UnitExecutor, UnitReport, UnitSpec, UnitStatus,
};
use crate::report::{
    aggregate, run_report_key, unit_report_key, verify, AggregateInput, ReportArchive,
    ReportStore, RunReport, RunStatus,
};
use crate::state::{CompactionSnapshot, ControlFlag, RunPhase, SnapshotManager, StateSummary};

/// Assembles an [`Orchestrator`] and the [`ControlHandle`] that drives it.
pub struct OrchestratorBuilder {
    config: AppConfig,
    collaborators: Collaborators,
    renderer: Option<Arc<dyn EventRenderer>>,
    retry: Option<Arc<dyn RetryStrategyPlugin>>,
    concurrency: Option<Arc<dyn ConcurrencyStrategyPlugin>>,
    snapshots: Option<SnapshotManager>,
    progress: bool,
    run_id: Option<String>,
}

impl OrchestratorBuilder {
    pub fn new(config: AppConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            collaborators,
            renderer: None,
            retry: None,
            concurrency: None,
            snapshots: None,
            progress: false,
            run_id: None,
        }
    }

    pub fn renderer(mut self, renderer: Arc<dyn EventRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn retry_strategy(mut self, retry: Arc<dyn RetryStrategyPlugin>) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn concurrency_strategy(mut self, strategy: Arc<dyn ConcurrencyStrategyPlugin>) -> Self {
        self.concurrency = Some(strategy);
        self
    }

    /// Persist every compaction snapshot through `manager`.
    pub fn snapshot_manager(mut self, manager: SnapshotManager) -> Self {
        self.snapshots = Some(manager);
        self
    }

    pub fn progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }

    pub fn run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn build(self) -> Result<(Orchestrator, ControlHandle), OrchestratorError> {
        validate(&self.config)?;

        let run_id = self
            .run_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let (signal_tx, signal_rx) = mpsc::channel(self.config.scheduler.channel_capacity);
        let (summary_tx, summary_rx) = watch::channel(StateSummary {
            run_id: run_id.clone(),
            concurrency_limit: self.config.scheduler.max_parallel,
            ..StateSummary::default()
        });

        let orchestrator = Orchestrator {
            policy: CompactionPolicy::from_config(&self.config.compaction),
            run_id,
            config: self.config,
            collaborators: self.collaborators,
            events: EventSink::new(self.renderer),
            retry: self.retry.unwrap_or_else(|| Arc::new(NoRetry)),
            concurrency: self.concurrency,
            snapshots: self.snapshots,
            progress: self.progress,
            signals: signal_rx,
            summary: summary_tx,
        };
        Ok((orchestrator, ControlHandle::new(signal_tx, summary_rx)))
    }
}

fn validate(cfg: &AppConfig) -> Result<(), OrchestratorError> {
    if cfg.scheduler.max_parallel == 0 {
        return Err(OrchestratorError::Config(
            "scheduler.max_parallel must be at least 1".into(),
        ));
    }
    if cfg.scheduler.channel_capacity == 0 {
        return Err(OrchestratorError::Config(
            "scheduler.channel_capacity must be at least 1".into(),
        ));
    }
    if !(0.0..=100.0).contains(&cfg.quality.passing_threshold) {
        return Err(OrchestratorError::Config(format!(
            "quality.passing_threshold must be within 0..=100, got {}",
            cfg.quality.passing_threshold
        )));
    }
    if cfg.compaction.max_snapshot_bytes == 0 {
        return Err(OrchestratorError::Config(
            "compaction.max_snapshot_bytes must be positive".into(),
        ));
    }
    Ok(())
}

/// Sole owner of the run state and sole consumer of control signals.
///
/// Phases run in order: INITIALIZE (graph) → PLAN (initial concurrency) →
/// BUILD (control loop) → VERIFY → COMPLETE (report).
pub struct Orchestrator {
    run_id: String,
    config: AppConfig,
    collaborators: Collaborators,
    events: EventSink,
    retry: Arc<dyn RetryStrategyPlugin>,
    concurrency: Option<Arc<dyn ConcurrencyStrategyPlugin>>,
    snapshots: Option<SnapshotManager>,
    policy: CompactionPolicy,
    progress: bool,
    signals: mpsc::Receiver<ControlSignal>,
    summary: watch::Sender<StateSummary>,
}

/// Everything the control loop mutates. Rebuilt in place on compaction.
struct RunLoop {
    scheduler: Scheduler,
    completions: mpsc::Receiver<Completion>,
    base_units: Vec<UnitSpec>,
    reports: BTreeMap<String, UnitReport>,
    /// Reports of units retired from the graph by compaction.
    archive: ReportArchive,
    store_writes: Vec<JoinHandle<()>>,
    generation: u64,
    events_since_compaction: u64,
    escalation: Option<String>,
    compaction_suspended: bool,
    signals_open: bool,
    progress: ProgressMonitor,
}

enum Turn {
    Completion(Option<Completion>),
    Signal(Option<ControlSignal>),
}

impl Orchestrator {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Run `units` to completion, drain or abort.
    ///
    /// Fails before any dispatch when the graph is invalid; every other
    /// failure is recorded in the returned report.
    pub async fn run(self, units: Vec<UnitSpec>) -> Result<RunReport, OrchestratorError> {
        self.drive(units, None).await
    }

    /// Continue a run from a persisted compaction snapshot over the same
    /// declarative unit list.
    ///
    /// Resuming is an operator decision: a snapshot saved while paused or
    /// draining starts running again.
    pub async fn resume(
        mut self,
        units: Vec<UnitSpec>,
        mut snapshot: CompactionSnapshot,
    ) -> Result<RunReport, OrchestratorError> {
        self.run_id = snapshot.run_id.clone();
        if matches!(snapshot.control, ControlFlag::Paused | ControlFlag::Draining) {
            info!(run_id = %self.run_id, control = %snapshot.control, "resuming stopped run");
            snapshot.control = ControlFlag::Running;
        }
        self.drive(units, Some(snapshot)).await
    }

    async fn drive(
        mut self,
        units: Vec<UnitSpec>,
        resume: Option<CompactionSnapshot>,
    ) -> Result<RunReport, OrchestratorError> {
        let started_at = Utc::now();

        self.enter(RunPhase::Initialize);
        let graph = DependencyGraph::build(&units)?;
        self.events.emit(RunEvent::RunStart {
            run_id: self.run_id.clone(),
            total_units: graph.len(),
            resumed: resume.is_some(),
        });

        self.enter(RunPhase::Plan);
        let executor = UnitExecutor::new(self.run_id.clone(), self.collaborators.clone())
            .with_quality(&self.config.quality)
            .with_timeouts(PhaseTimeouts::from(&self.config.timeouts))
            .with_retry(self.retry.clone())
            .with_events(self.events.clone());
        let (host, completions) =
            ExecutionHost::new(Arc::new(executor), self.config.scheduler.channel_capacity);
        let max_requeues = self.config.scheduler.max_requeues;

        let mut reports = BTreeMap::new();
        let (scheduler, generation) = match &resume {
            None => {
                let limit = self.initial_concurrency(&graph);
                (
                    Scheduler::new(graph, &units, host, limit, max_requeues),
                    0,
                )
            }
            Some(snapshot) => {
                let (scheduler, outcome) =
                    Scheduler::restore(graph, &units, snapshot, host, max_requeues)?;
                if !outcome.requeued.is_empty() {
                    warn!(run_id = %self.run_id, units = ?outcome.requeued, "requeued units lost across restart");
                }
                for unit_id in &outcome.lost {
                    reports.insert(unit_id.clone(), lost_report(unit_id));
                }
                self.reload_reports(&scheduler, &mut reports).await;
                (scheduler, snapshot.generation)
            }
        };

        self.events.emit(RunEvent::Plan {
            run_id: self.run_id.clone(),
            layers: scheduler.graph().layer_ids(),
            concurrency_limit: scheduler.concurrency_limit(),
        });
        info!(
            run_id = %self.run_id,
            units = scheduler.graph().len(),
            layers = scheduler.graph().layer_count(),
            concurrency_limit = scheduler.concurrency_limit(),
            "plan ready"
        );

        let mut progress = ProgressMonitor::new(scheduler.graph().len(), self.progress);
        for report in reports.values() {
            progress.complete_unit(&report.unit_id, report.status, report.duration_ms);
        }

        let mut run = RunLoop {
            scheduler,
            completions,
            base_units: units,
            reports,
            archive: ReportArchive::default(),
            store_writes: Vec::new(),
            generation,
            events_since_compaction: 0,
            escalation: None,
            compaction_suspended: false,
            signals_open: true,
            progress,
        };

        self.enter(RunPhase::Build);
        self.control_loop(&mut run).await;

        self.enter(RunPhase::Verify);
        let verification = verify(run.scheduler.graph());
        for issue in &verification.issues {
            error!(run_id = %self.run_id, issue = %issue, "verification failed");
        }

        self.enter(RunPhase::Complete);
        let status = match run.scheduler.control() {
            ControlFlag::Aborting => RunStatus::Aborted,
            ControlFlag::Draining => RunStatus::Drained,
            _ => RunStatus::Completed,
        };
        let unit_order: Vec<String> = run.scheduler.graph().ids().map(str::to_string).collect();
        let report = aggregate(AggregateInput {
            run_id: &self.run_id,
            status,
            started_at,
            finished_at: Utc::now(),
            unit_order: &unit_order,
            reports: &run.reports,
            archive: &run.archive,
            verification: &verification,
            top_n: self.config.report.top_n,
        });

        futures::future::join_all(std::mem::take(&mut run.store_writes)).await;
        self.store_run_report(&report).await;

        run.progress.finish(!report.has_failures());
        self.publish_summary(&run, RunPhase::Complete);
        self.events.emit(RunEvent::RunEnd {
            run_id: self.run_id.clone(),
            report: report.clone(),
        });
        Ok(report)
    }

    fn enter(&self, phase: RunPhase) {
        debug!(run_id = %self.run_id, phase = %phase, "entering phase");
        self.events.emit(RunEvent::PhaseChange {
            run_id: self.run_id.clone(),
            phase,
        });
    }

    fn initial_concurrency(&self, graph: &DependencyGraph) -> usize {
        let base = self.config.scheduler.max_parallel;
        let limit = match &self.concurrency {
            Some(strategy) => {
                let widest_layer = (!self.config.scheduler.keep_alive).then(|| {
                    graph
                        .layer_ids()
                        .iter()
                        .map(Vec::len)
                        .max()
                        .unwrap_or(0)
                });
                let ctx = sample_concurrency_context(base, graph.len(), widest_layer);
                let limit = strategy.calculate_concurrency(&ctx);
                debug!(
                    strategy = strategy.name(),
                    cpu_usage = ctx.cpu_usage,
                    available_cpus = ctx.available_cpus,
                    pending = ctx.pending_units,
                    widest_layer = ?ctx.widest_layer,
                    limit,
                    "initial concurrency"
                );
                limit
            }
            None => base,
        };
        limit.max(1)
    }

    async fn control_loop(&mut self, run: &mut RunLoop) {
        loop {
            for d in run.scheduler.dispatch_ready() {
                run.events_since_compaction += 1;
                run.progress.add_unit(&d.unit_id);
                self.events.emit(RunEvent::UnitDispatched {
                    run_id: self.run_id.clone(),
                    unit_id: d.unit_id,
                    execution_id: d.execution_id,
                    layer: d.layer,
                    wait_ms: d.wait_ms,
                });
            }
            self.publish_summary(run, RunPhase::Build);

            match run.scheduler.control() {
                ControlFlag::Aborting if !run.scheduler.has_active() => break,
                ControlFlag::Draining if !run.scheduler.has_active() => {
                    self.persist_snapshot(run, "drained");
                    break;
                }
                ControlFlag::Running
                    if run.scheduler.is_stalled()
                        && (!self.config.scheduler.keep_alive || !run.signals_open) =>
                {
                    break
                }
                _ => {}
            }

            if self.policy.should_compact(run.events_since_compaction)
                && !run.compaction_suspended
                && run.scheduler.control() != ControlFlag::Aborting
            {
                self.compact(run);
                continue;
            }

            let turn = tokio::select! {
                biased;
                done = run.completions.recv() => Turn::Completion(done),
                signal = self.signals.recv(), if run.signals_open => Turn::Signal(signal),
            };

            match turn {
                Turn::Completion(Some(completion)) => self.on_completion(run, completion),
                Turn::Completion(None) => {
                    error!(run_id = %self.run_id, "completion channel closed");
                    break;
                }
                Turn::Signal(Some(signal)) => self.on_signal(run, signal),
                Turn::Signal(None) => {
                    debug!(run_id = %self.run_id, "control channel closed");
                    run.signals_open = false;
                    if run.scheduler.control() == ControlFlag::Paused {
                        warn!(run_id = %self.run_id, "paused with no control handle left, draining");
                        run.scheduler.set_control(ControlFlag::Draining);
                    }
                }
            }
        }
    }

    fn on_completion(&self, run: &mut RunLoop, completion: Completion) {
        run.events_since_compaction += 1;
        match run.scheduler.complete(completion) {
            CompletionOutcome::Recorded(report) => {
                run.progress
                    .complete_unit(&report.unit_id, report.status, report.duration_ms);
                self.events.emit(RunEvent::UnitFinished {
                    run_id: self.run_id.clone(),
                    report: report.clone(),
                });
                run.store_writes.retain(|handle| !handle.is_finished());
                if let Some(handle) = self.spawn_unit_report_write(&report) {
                    run.store_writes.push(handle);
                }
                run.reports.insert(report.unit_id.clone(), report);
            }
            CompletionOutcome::Requeued { report, attempt } => {
                run.progress.release_unit(&report.unit_id);
                let reason = report
                    .failure
                    .as_ref()
                    .map(|f| f.message.clone())
                    .unwrap_or_default();
                warn!(run_id = %self.run_id, unit = %report.unit_id, attempt, reason = %reason, "requeueing after infrastructure failure");
                self.events.emit(RunEvent::UnitRequeued {
                    run_id: self.run_id.clone(),
                    unit_id: report.unit_id,
                    attempt,
                    reason,
                });
            }
            CompletionOutcome::Stale => {
                debug!(run_id = %self.run_id, "ignoring completion for an untracked execution");
            }
        }
    }

    fn on_signal(&self, run: &mut RunLoop, signal: ControlSignal) {
        run.events_since_compaction += 1;
        run.scheduler.statistics_mut().signals_processed += 1;
        let name = signal.name();
        let control = run.scheduler.control();

        match signal {
            ControlSignal::Pause => {
                if control == ControlFlag::Running {
                    run.scheduler.set_control(ControlFlag::Paused);
                    run.progress.set_message("paused");
                }
            }
            ControlSignal::Resume => {
                if matches!(control, ControlFlag::Paused | ControlFlag::Draining) {
                    run.scheduler.set_control(ControlFlag::Running);
                    run.escalation = None;
                    run.progress.set_message("running");
                }
            }
            ControlSignal::Drain => {
                if control != ControlFlag::Aborting {
                    run.scheduler.set_control(ControlFlag::Draining);
                    run.progress.set_message("draining");
                }
            }
            ControlSignal::Abort => {
                run.scheduler.set_control(ControlFlag::Aborting);
                let discarded = run.scheduler.discard_pending();
                run.scheduler.host().cancel_all();
                run.progress.set_message("aborting");
                warn!(run_id = %self.run_id, discarded = discarded.len(), active = run.scheduler.active_ids().len(), "aborting run");
            }
            ControlSignal::AdjustConcurrency(limit) => {
                let applied = run.scheduler.set_concurrency_limit(limit);
                info!(run_id = %self.run_id, requested = limit, applied, "concurrency limit adjusted");
            }
            ControlSignal::MergeUnits(units) => {
                if control == ControlFlag::Aborting {
                    warn!(run_id = %self.run_id, "ignoring merge while aborting");
                } else {
                    match run.scheduler.merge_units(units) {
                        Ok(added) => {
                            run.progress.grow(added.len());
                            info!(run_id = %self.run_id, added = ?added, "units merged");
                        }
                        Err(e) => {
                            warn!(run_id = %self.run_id, error = %e, "rejected unit merge");
                        }
                    }
                }
            }
        }

        self.events.emit(RunEvent::ControlApplied {
            run_id: self.run_id.clone(),
            signal: name.to_string(),
            control: run.scheduler.control(),
            concurrency_limit: run.scheduler.concurrency_limit(),
        });
    }

    /// Shrink the loop state to a snapshot and restart the loop from it.
    ///
    /// The graph is re-derived from the declarative input, finished reports
    /// stay where they are, and in-flight units reconnect through the host.
    fn compact(&self, run: &mut RunLoop) {
        let next = run.generation + 1;
        let snapshot = run.scheduler.snapshot(&self.run_id, next, RunPhase::Build);

        let bytes = match self.policy.encode(&snapshot) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.escalate(run, format!("compaction failed: {e}"));
                return;
            }
        };

        self.save_snapshot(&snapshot);

        let restored = DependencyGraph::build(&run.base_units)
            .map_err(OrchestratorError::from)
            .and_then(|graph| {
                Scheduler::restore(
                    graph,
                    &run.base_units,
                    &snapshot,
                    run.scheduler.host().clone(),
                    self.config.scheduler.max_requeues,
                )
                .map_err(OrchestratorError::from)
            });

        match restored {
            Ok((mut scheduler, outcome)) => {
                for unit_id in &outcome.lost {
                    let report = lost_report(unit_id);
                    run.progress.complete_unit(unit_id, report.status, 0);
                    run.reports.insert(unit_id.clone(), report);
                }
                scheduler.statistics_mut().compactions += 1;
                run.scheduler = scheduler;
                run.generation = next;
                run.events_since_compaction = 0;
                self.archive_retired(run);

                let state = run.scheduler.state();
                debug!(
                    run_id = %self.run_id,
                    generation = next,
                    reconnected = outcome.reconnected.len(),
                    requeued = outcome.requeued.len(),
                    lost = outcome.lost.len(),
                    "control loop restarted from snapshot"
                );
                self.events.emit(RunEvent::Compacted {
                    run_id: self.run_id.clone(),
                    generation: next,
                    snapshot_bytes: bytes.len(),
                    pending: state.pending_queue.len(),
                    active: state.active_set.len(),
                });
            }
            Err(e) => self.escalate(run, format!("restart from snapshot failed: {e}")),
        }
    }

    /// Fold reports of units no longer in the graph into the archive.
    fn archive_retired(&self, run: &mut RunLoop) {
        let graph = run.scheduler.graph();
        let retired: Vec<String> = run
            .reports
            .keys()
            .filter(|id| !graph.contains(id.as_str()))
            .cloned()
            .collect();
        for unit_id in &retired {
            if let Some(report) = run.reports.remove(unit_id) {
                run.archive.absorb(&report, self.config.report.top_n);
            }
        }
        if !retired.is_empty() {
            debug!(run_id = %self.run_id, archived = retired.len(), total = run.archive.units, "archived unit reports");
        }
    }

    fn save_snapshot(&self, snapshot: &CompactionSnapshot) {
        if let Some(manager) = &self.snapshots {
            match manager.save_snapshot(snapshot) {
                Ok(path) => debug!(run_id = %self.run_id, path = %path.display(), "snapshot saved"),
                Err(e) => warn!(run_id = %self.run_id, error = %e, "failed to persist snapshot"),
            }
        }
    }

    /// Save the current state so a later `resume` starts from here.
    fn persist_snapshot(&self, run: &mut RunLoop, reason: &str) {
        if self.snapshots.is_none() {
            return;
        }
        run.generation += 1;
        let snapshot = run
            .scheduler
            .snapshot(&self.run_id, run.generation, RunPhase::Build);
        info!(
            run_id = %self.run_id,
            generation = run.generation,
            pending = snapshot.pending_queue.len(),
            reason,
            "persisting snapshot"
        );
        self.save_snapshot(&snapshot);
    }

    /// Pause and wait for the operator. Compaction stays off for the rest of
    /// the run so the loop does not retry it every turn.
    fn escalate(&self, run: &mut RunLoop, message: String) {
        error!(run_id = %self.run_id, message = %message, "escalating to operator");
        if run.scheduler.control() == ControlFlag::Running {
            run.scheduler.set_control(ControlFlag::Paused);
        }
        run.compaction_suspended = true;
        run.escalation = Some(message.clone());
        self.persist_snapshot(run, "escalation");
        self.events.emit(RunEvent::Escalation {
            run_id: self.run_id.clone(),
            message,
        });
    }

    fn publish_summary(&self, run: &RunLoop, phase: RunPhase) {
        let state = run.scheduler.state();
        self.summary.send_replace(StateSummary {
            run_id: self.run_id.clone(),
            phase,
            control: state.control,
            pending: state.pending_queue.len(),
            pending_ids: state.pending_queue.clone(),
            active: run.scheduler.active_ids(),
            concurrency_limit: state.concurrency_limit,
            statistics: state.statistics.clone(),
            events_since_compaction: run.events_since_compaction,
            generation: run.generation,
            escalation: run.escalation.clone(),
        });
    }

    fn store(&self) -> Option<Arc<dyn ReportStore>> {
        self.collaborators.report_store.clone()
    }

    fn spawn_unit_report_write(&self, report: &UnitReport) -> Option<JoinHandle<()>> {
        let store = self.store()?;
        let key = unit_report_key(&self.run_id, &report.unit_id);
        let bytes = match serde_json::to_vec_pretty(report) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(unit = %report.unit_id, error = %e, "failed to encode unit report");
                return None;
            }
        };
        Some(tokio::spawn(async move {
            match store.write(&key, bytes).await {
                Ok(locator) => debug!(key = %key, locator = %locator, "unit report stored"),
                Err(e) => warn!(key = %key, error = %e, "failed to store unit report"),
            }
        }))
    }

    async fn store_run_report(&self, report: &RunReport) {
        let Some(store) = self.store() else {
            return;
        };
        let key = run_report_key(&self.run_id);
        match serde_json::to_vec_pretty(report) {
            Ok(bytes) => match store.write(&key, bytes).await {
                Ok(locator) => info!(run_id = %self.run_id, locator = %locator, "run report stored"),
                Err(e) => warn!(run_id = %self.run_id, error = %e, "failed to store run report"),
            },
            Err(e) => warn!(run_id = %self.run_id, error = %e, "failed to encode run report"),
        }
    }

    /// Finished units of a resumed run: stored reports where available,
    /// placeholders otherwise.
    async fn reload_reports(&self, scheduler: &Scheduler, reports: &mut BTreeMap<String, UnitReport>) {
        let store = self.store();
        for node in scheduler.graph().nodes() {
            if !node.status.is_terminal() || reports.contains_key(&node.id) {
                continue;
            }
            let stored = match &store {
                Some(store) => match store.read(&unit_report_key(&self.run_id, &node.id)).await {
                    Ok(Some(bytes)) => serde_json::from_slice::<UnitReport>(&bytes)
                        .map_err(|e| warn!(unit = %node.id, error = %e, "stored unit report unreadable"))
                        .ok(),
                    Ok(None) => None,
                    Err(e) => {
                        warn!(unit = %node.id, error = %e, "failed to read stored unit report");
                        None
                    }
                },
                None => None,
            };
            let report = stored
                .filter(|r| r.status == node.status)
                .unwrap_or_else(|| UnitReport::placeholder(&node.id, node.status));
            reports.insert(node.id.clone(), report);
        }
    }
}

fn lost_report(unit_id: &str) -> UnitReport {
    UnitReport::placeholder(unit_id, UnitStatus::Failed).with_failure(UnitFailure::new(
        FailedPhase::Dispatch,
        FailureKind::Infrastructure,
        "execution lost and requeue budget spent",
    ))
}
