mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::Utc;
use pretty_assertions::assert_eq;

use common::{config, init_tracing, lint_failing_report, unit, wait_for, Gated, NoopFixer, Step};
use suiteflow_core::executor::types::{FailedPhase, FailureKind};
use suiteflow_core::executor::FixerRegistry;
use suiteflow_core::quality::QualityCategory;
use suiteflow_core::state::{ActiveUnit, CompactionSnapshot, OrchestratorState, SnapshotManager};
use suiteflow_core::{
    ControlFlag, CycleError, GraphError, OrchestratorBuilder, OrchestratorError, RunPhase,
    RunStatus, UnitSpec, UnitStatus,
};

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn position(steps: &[Step], step: &Step) -> usize {
    steps
        .iter()
        .position(|s| s == step)
        .unwrap_or_else(|| panic!("missing step {step:?}"))
}

#[tokio::test]
async fn diamond_runs_middle_layer_concurrently() {
    let fakes = Gated::all_gated();
    let (orchestrator, handle) = OrchestratorBuilder::new(config(4), fakes.collaborators())
        .build()
        .unwrap();
    let run = tokio::spawn(orchestrator.run(vec![
        unit("a", &[]),
        unit("b", &["a"]),
        unit("c", &["a"]),
        unit("d", &["b", "c"]),
    ]));

    wait_for(&handle, |s| s.active == ids(&["a"])).await;
    fakes.release("a");
    wait_for(&handle, |s| s.active == ids(&["b", "c"])).await;

    fakes.release("b");
    let summary = wait_for(&handle, |s| s.statistics.completed == 2).await;
    assert_eq!(summary.active, ids(&["c"]));
    assert_eq!(summary.pending_ids, ids(&["d"]));

    fakes.release("c");
    wait_for(&handle, |s| s.active == ids(&["d"])).await;
    fakes.release("d");

    let report = run.await.unwrap().unwrap();
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.totals.succeeded, 4);

    let steps = fakes.steps();
    let d_started = position(&steps, &Step::BuildStarted("d".into()));
    assert!(d_started > position(&steps, &Step::Published("b".into())));
    assert!(d_started > position(&steps, &Step::Published("c".into())));
}

#[tokio::test]
async fn exhausted_remediation_fails_unit_without_publishing() {
    let fakes = Gated::open();
    fakes.quality_sequence("a", vec![lint_failing_report()]);
    let fixer = NoopFixer::new(&[QualityCategory::Lint]);
    let collaborators = fakes
        .collaborators()
        .with_fixers(FixerRegistry::new().with(fixer.clone()));
    let (orchestrator, _handle) = OrchestratorBuilder::new(config(2), collaborators)
        .build()
        .unwrap();

    let report = orchestrator
        .run(vec![unit("a", &[]), unit("b", &["a"]), unit("x", &[])])
        .await
        .unwrap();

    let a = report.unit("a").unwrap();
    assert_eq!(a.status, UnitStatus::Failed);
    assert_eq!(a.failure.as_ref().unwrap().phase, FailedPhase::Quality);
    assert_eq!(a.remediation_attempts.len(), 3);
    assert_eq!(fixer.calls.load(Ordering::SeqCst), 3);

    // Only the independent unit was published.
    assert_eq!(fakes.publish_calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.totals.blocked, 1);
    assert_eq!(report.blocked[0].unit_id, "b");
    assert_eq!(report.total_remediation_attempts, 3);
    assert_eq!(report.most_remediated[0].unit_id, "a");
}

#[tokio::test]
async fn remediation_that_passes_publishes() {
    let fakes = Gated::open();
    fakes.quality_sequence("a", vec![lint_failing_report(), common::passing_report()]);
    let fixer = NoopFixer::new(&[QualityCategory::Lint]);
    let collaborators = fakes
        .collaborators()
        .with_fixers(FixerRegistry::new().with(fixer.clone()));
    let (orchestrator, _handle) = OrchestratorBuilder::new(config(1), collaborators)
        .build()
        .unwrap();

    let report = orchestrator.run(vec![unit("a", &[])]).await.unwrap();
    let a = report.unit("a").unwrap();
    assert_eq!(a.status, UnitStatus::Done);
    assert_eq!(a.remediation_attempts.len(), 1);
    assert_eq!(fakes.publish_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn pause_holds_dispatch_and_resume_never_redispatches() {
    let fakes = Gated::all_gated();
    let (orchestrator, handle) = OrchestratorBuilder::new(config(2), fakes.collaborators())
        .build()
        .unwrap();
    let units: Vec<UnitSpec> = ["a", "b", "c", "d"].iter().map(|id| unit(id, &[])).collect();
    let run = tokio::spawn(orchestrator.run(units));

    wait_for(&handle, |s| s.active.len() == 2).await;
    handle.pause().await.unwrap();
    wait_for(&handle, |s| s.control == ControlFlag::Paused).await;

    fakes.release("a");
    fakes.release("b");
    let summary = wait_for(&handle, |s| s.statistics.completed == 2).await;
    assert!(summary.active.is_empty());
    assert_eq!(summary.pending, 2);
    assert_eq!(summary.statistics.dispatched, 2);

    handle.resume().await.unwrap();
    fakes.open_all();
    let report = run.await.unwrap().unwrap();

    assert_eq!(report.totals.succeeded, 4);
    for id in ["a", "b", "c", "d"] {
        assert_eq!(fakes.build_calls(id), 1, "unit {id} built more than once");
    }
    assert_eq!(handle.snapshot().statistics.dispatched, 4);
}

#[tokio::test]
async fn lowered_limit_applies_without_preempting() {
    let fakes = Gated::all_gated();
    let (orchestrator, handle) = OrchestratorBuilder::new(config(3), fakes.collaborators())
        .build()
        .unwrap();
    let units: Vec<UnitSpec> = (0..10).map(|i| unit(&format!("u{i}"), &[])).collect();
    let run = tokio::spawn(orchestrator.run(units));

    wait_for(&handle, |s| s.active.len() == 3).await;
    handle.adjust_concurrency(1).await.unwrap();
    wait_for(&handle, |s| s.concurrency_limit == 1).await;

    fakes.release("u0");
    let summary = wait_for(&handle, |s| s.statistics.completed == 1).await;
    assert_eq!(summary.active.len(), 2);

    fakes.release("u1");
    fakes.release("u2");
    let summary = wait_for(&handle, |s| s.statistics.completed == 3).await;
    assert_eq!(summary.active.len(), 1);

    fakes.reset_max_running();
    fakes.open_all();
    let report = run.await.unwrap().unwrap();
    assert_eq!(report.totals.succeeded, 10);
    assert!(fakes.max_running() <= 1);
}

#[tokio::test]
async fn cycle_fails_before_any_dispatch() {
    let fakes = Gated::open();
    let (orchestrator, _handle) = OrchestratorBuilder::new(config(2), fakes.collaborators())
        .build()
        .unwrap();

    let err = orchestrator
        .run(vec![
            unit("a", &[]),
            unit("b", &["c"]),
            unit("c", &["b"]),
            unit("d", &["a"]),
        ])
        .await
        .unwrap_err();

    match err {
        OrchestratorError::Graph(GraphError::Cycle(CycleError { unresolved })) => {
            assert_eq!(unresolved, ids(&["b", "c"]));
        }
        other => panic!("expected a cycle error, got {other:?}"),
    }
    assert_eq!(fakes.total_build_calls(), 0);
}

#[tokio::test]
async fn drain_finishes_in_flight_units_only() {
    let fakes = Gated::all_gated();
    let (orchestrator, handle) = OrchestratorBuilder::new(config(2), fakes.collaborators())
        .build()
        .unwrap();
    let units: Vec<UnitSpec> = ["a", "b", "c", "d"].iter().map(|id| unit(id, &[])).collect();
    let run = tokio::spawn(orchestrator.run(units));

    wait_for(&handle, |s| s.active.len() == 2).await;
    handle.drain().await.unwrap();
    wait_for(&handle, |s| s.control == ControlFlag::Draining).await;
    fakes.open_all();

    let report = run.await.unwrap().unwrap();
    assert_eq!(report.status, RunStatus::Drained);
    assert_eq!(report.totals.succeeded, 2);
    assert_eq!(report.not_started, ids(&["c", "d"]));
}

#[tokio::test]
async fn abort_cancels_in_flight_units() {
    let fakes = Gated::all_gated();
    let (orchestrator, handle) = OrchestratorBuilder::new(config(2), fakes.collaborators())
        .build()
        .unwrap();
    let run = tokio::spawn(orchestrator.run(vec![
        unit("a", &[]),
        unit("b", &[]),
        unit("c", &["a"]),
        unit("d", &[]),
    ]));

    let summary = wait_for(&handle, |s| s.active.len() == 2).await;
    assert_eq!(summary.pending_ids, ids(&["c", "d"]));
    handle.abort().await.unwrap();

    let report = run.await.unwrap().unwrap();
    assert_eq!(report.status, RunStatus::Aborted);
    assert_eq!(report.totals.cancelled, 2);
    assert_eq!(report.cancelled, ids(&["a", "b"]));
    // c waits on a cancelled unit; d was ready but discarded.
    assert_eq!(report.blocked[0].unit_id, "c");
    assert_eq!(report.not_started, ids(&["d"]));
    assert_eq!(fakes.build_calls("d"), 0);
    assert_eq!(fakes.publish_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn keep_alive_accepts_merged_units() {
    let fakes = Gated::open();
    let mut cfg = config(2);
    cfg.scheduler.keep_alive = true;
    let (orchestrator, handle) = OrchestratorBuilder::new(cfg, fakes.collaborators())
        .build()
        .unwrap();
    let run = tokio::spawn(orchestrator.run(vec![unit("a", &[])]));

    wait_for(&handle, |s| s.statistics.completed == 1 && s.active.is_empty()).await;
    handle
        .merge_units(vec![unit("a", &[]), unit("b", &["a"])])
        .await
        .unwrap();
    wait_for(&handle, |s| s.statistics.completed == 2).await;
    handle.drain().await.unwrap();

    let report = run.await.unwrap().unwrap();
    assert_eq!(report.status, RunStatus::Drained);
    assert_eq!(report.totals.units, 2);
    assert_eq!(report.totals.succeeded, 2);
    assert_eq!(fakes.build_calls("a"), 1);
}

#[tokio::test]
async fn infrastructure_failure_is_requeued_once() {
    let fakes = Gated::open();
    fakes.fail_build_with_infrastructure("a", 1);
    let (orchestrator, handle) = OrchestratorBuilder::new(config(2), fakes.collaborators())
        .build()
        .unwrap();

    let report = orchestrator
        .run(vec![unit("a", &[]), unit("b", &["a"])])
        .await
        .unwrap();
    assert_eq!(report.totals.succeeded, 2);
    assert_eq!(fakes.build_calls("a"), 2);
    assert_eq!(handle.snapshot().statistics.requeued, 1);
}

#[tokio::test]
async fn repeated_infrastructure_failure_is_recorded() {
    let fakes = Gated::open();
    fakes.fail_build_with_infrastructure("a", 5);
    let (orchestrator, _handle) = OrchestratorBuilder::new(config(2), fakes.collaborators())
        .build()
        .unwrap();

    let report = orchestrator
        .run(vec![unit("a", &[]), unit("b", &["a"])])
        .await
        .unwrap();
    assert_eq!(report.totals.failed, 1);
    assert_eq!(report.failures[0].kind, FailureKind::Infrastructure);
    assert_eq!(report.failures[0].phase, FailedPhase::Build);
    assert_eq!(report.totals.blocked, 1);
}

#[tokio::test]
async fn compaction_reconnects_in_flight_units() {
    let fakes = Gated::all_gated();
    let mut cfg = config(2);
    cfg.compaction.history_limit = 2;
    cfg.compaction.high_water_ratio = 1.0;
    let (orchestrator, handle) = OrchestratorBuilder::new(cfg, fakes.collaborators())
        .build()
        .unwrap();
    let units: Vec<UnitSpec> = (0..6).map(|i| unit(&format!("u{i}"), &[])).collect();
    let run = tokio::spawn(orchestrator.run(units));

    let summary = wait_for(&handle, |s| s.generation >= 1).await;
    assert_eq!(summary.active.len(), 2);
    fakes.open_all();

    let report = run.await.unwrap().unwrap();
    assert_eq!(report.totals.succeeded, 6);
    assert_eq!(fakes.total_build_calls(), 6);
}

#[tokio::test]
async fn compaction_keeps_dispatch_order_with_one_slot() {
    init_tracing();
    let fakes = Gated::open();
    fakes.gate("a");
    let mut cfg = config(1);
    cfg.compaction.history_limit = 1;
    cfg.compaction.high_water_ratio = 1.0;
    let (orchestrator, handle) = OrchestratorBuilder::new(cfg, fakes.collaborators())
        .build()
        .unwrap();
    let run = tokio::spawn(orchestrator.run(vec![
        unit("a", &[]),
        unit("b", &[]),
        unit("c", &[]),
        unit("d", &[]),
    ]));

    let summary = wait_for(&handle, |s| s.generation >= 1 && s.active == ids(&["a"])).await;
    assert_eq!(summary.pending_ids, ids(&["b", "c", "d"]));
    fakes.release("a");

    let report = run.await.unwrap().unwrap();
    assert_eq!(report.totals.succeeded, 4);
    let started: Vec<Step> = fakes
        .steps()
        .into_iter()
        .filter(|s| matches!(s, Step::BuildStarted(_)))
        .collect();
    assert_eq!(
        started,
        ["a", "b", "c", "d"]
            .iter()
            .map(|id| Step::BuildStarted(id.to_string()))
            .collect::<Vec<_>>()
    );
    assert_eq!(fakes.build_calls("a"), 1);
    assert_eq!(fakes.max_running(), 1);
}

#[tokio::test]
async fn drained_run_resumes_from_its_final_snapshot() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let units = vec![unit("a", &[]), unit("b", &["a"]), unit("c", &["a"])];

    let fakes = Gated::open();
    fakes.gate("a");
    let (orchestrator, handle) = OrchestratorBuilder::new(config(1), fakes.collaborators())
        .run_id("r-drain")
        .snapshot_manager(SnapshotManager::new(dir.path(), 3).unwrap())
        .build()
        .unwrap();
    let run = tokio::spawn(orchestrator.run(units.clone()));

    wait_for(&handle, |s| s.active == ids(&["a"])).await;
    handle.drain().await.unwrap();
    wait_for(&handle, |s| s.control == ControlFlag::Draining).await;
    fakes.release("a");

    let report = run.await.unwrap().unwrap();
    assert_eq!(report.status, RunStatus::Drained);
    assert_eq!(report.not_started, ids(&["b", "c"]));

    let snapshot = SnapshotManager::new(dir.path(), 3)
        .unwrap()
        .load_latest_for_run("r-drain")
        .unwrap()
        .expect("drain leaves a snapshot behind");
    assert_eq!(snapshot.control, ControlFlag::Draining);
    assert_eq!(snapshot.pending_queue, ids(&["b", "c"]));
    assert!(snapshot.active.is_empty());

    let (orchestrator, _handle) = OrchestratorBuilder::new(config(1), fakes.collaborators())
        .build()
        .unwrap();
    let report = orchestrator.resume(units, snapshot).await.unwrap();

    assert_eq!(report.run_id, "r-drain");
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.totals.succeeded, 3);
    assert_eq!(fakes.build_calls("a"), 1);
    assert_eq!(fakes.build_calls("b"), 1);
    assert_eq!(fakes.build_calls("c"), 1);
}

#[tokio::test]
async fn resume_restarts_paused_and_draining_snapshots() {
    for control in [ControlFlag::Draining, ControlFlag::Paused] {
        let mut state = OrchestratorState::new(2);
        state.control = control;
        state.enqueue("b");
        state.enqueue("c");
        let snapshot = CompactionSnapshot::capture(
            "r-stopped",
            2,
            RunPhase::Build,
            &state,
            vec![],
            vec![],
            vec![],
        );

        let fakes = Gated::open();
        let (orchestrator, handle) = OrchestratorBuilder::new(config(2), fakes.collaborators())
            .build()
            .unwrap();
        let report = orchestrator
            .resume(
                vec![unit("a", &[]), unit("b", &["a"]), unit("c", &["a"])],
                snapshot,
            )
            .await
            .unwrap();

        assert_eq!(report.status, RunStatus::Completed, "resumed from {control}");
        assert_eq!(report.totals.succeeded, 3);
        assert_eq!(fakes.build_calls("a"), 0);
        assert_eq!(fakes.total_build_calls(), 2);
        let summary = handle.snapshot();
        assert!(summary.is_idle());
        assert_eq!(summary.escalation, None);
    }
}

#[tokio::test]
async fn escalation_persists_a_snapshot() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let fakes = Gated::all_gated();
    let mut cfg = config(1);
    cfg.compaction.history_limit = 1;
    cfg.compaction.max_snapshot_bytes = 32;
    let (orchestrator, handle) = OrchestratorBuilder::new(cfg, fakes.collaborators())
        .run_id("r-esc")
        .snapshot_manager(SnapshotManager::new(dir.path(), 3).unwrap())
        .build()
        .unwrap();
    let run = tokio::spawn(orchestrator.run(vec![unit("a", &[]), unit("b", &[])]));

    wait_for(&handle, |s| s.escalation.is_some()).await;
    let snapshot = SnapshotManager::new(dir.path(), 3)
        .unwrap()
        .load_latest_for_run("r-esc")
        .unwrap()
        .expect("escalation leaves a snapshot behind");
    assert_eq!(snapshot.control, ControlFlag::Paused);
    assert_eq!(snapshot.pending_queue, ids(&["b"]));
    assert_eq!(snapshot.active[0].unit_id, "a");

    fakes.open_all();
    handle.resume().await.unwrap();
    let report = run.await.unwrap().unwrap();
    assert_eq!(report.totals.succeeded, 2);
}

#[tokio::test]
async fn resume_requeues_units_lost_with_the_process() {
    let dir = tempfile::tempdir().unwrap();
    let manager = SnapshotManager::new(dir.path(), 3).unwrap();

    let mut state = OrchestratorState::new(2);
    state.enqueue("c");
    state.active_set.insert(
        "b".into(),
        ActiveUnit {
            execution_id: "exec-from-previous-process".into(),
            dispatched_at: Utc::now(),
            wait_ms: 0,
        },
    );
    let snapshot =
        CompactionSnapshot::capture("r-old", 4, RunPhase::Build, &state, vec![], vec![], vec![]);
    manager.save_snapshot(&snapshot).unwrap();
    let loaded = manager.load_latest_for_run("r-old").unwrap().unwrap();

    let fakes = Gated::open();
    let (orchestrator, _handle) = OrchestratorBuilder::new(config(2), fakes.collaborators())
        .build()
        .unwrap();
    let report = orchestrator
        .resume(
            vec![unit("a", &[]), unit("b", &["a"]), unit("c", &["b"])],
            loaded,
        )
        .await
        .unwrap();

    assert_eq!(report.run_id, "r-old");
    assert_eq!(report.totals.succeeded, 3);
    assert_eq!(fakes.build_calls("a"), 0);
    assert_eq!(fakes.build_calls("b"), 1);
    assert_eq!(fakes.build_calls("c"), 1);
}

#[tokio::test]
async fn resume_over_budget_marks_lost_unit_failed() {
    let mut state = OrchestratorState::new(2);
    state.enqueue("c");
    state.active_set.insert(
        "b".into(),
        ActiveUnit {
            execution_id: "gone".into(),
            dispatched_at: Utc::now(),
            wait_ms: 0,
        },
    );
    let snapshot =
        CompactionSnapshot::capture("r-lost", 1, RunPhase::Build, &state, vec![], vec![], vec![]);

    let fakes = Gated::open();
    let mut cfg = config(2);
    cfg.scheduler.max_requeues = 0;
    let (orchestrator, _handle) = OrchestratorBuilder::new(cfg, fakes.collaborators())
        .build()
        .unwrap();
    let report = orchestrator
        .resume(
            vec![unit("a", &[]), unit("b", &["a"]), unit("c", &["b"])],
            snapshot,
        )
        .await
        .unwrap();

    let b = report.unit("b").unwrap();
    assert_eq!(b.status, UnitStatus::Failed);
    assert_eq!(b.failure.as_ref().unwrap().kind, FailureKind::Infrastructure);
    assert_eq!(report.blocked[0].unit_id, "c");
    assert_eq!(fakes.total_build_calls(), 0);
}

/// Deterministic pseudo-random DAGs: the concurrency bound and dependency
/// order hold for every limit.
#[tokio::test]
async fn random_graphs_respect_bound_and_order() {
    let mut seed: u64 = 0x5eed_cafe;
    let mut next = move || {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (seed >> 33) as usize
    };

    for limit in [1usize, 3, 8] {
        let units: Vec<UnitSpec> = (0..30)
            .map(|i| {
                let deps: Vec<String> = (0..i)
                    .filter(|_| next() % 7 == 0)
                    .map(|d| format!("u{d}"))
                    .collect();
                UnitSpec::new(format!("u{i}")).with_dependencies(deps)
            })
            .collect();

        let fakes = Gated::open();
        let (orchestrator, _handle) =
            OrchestratorBuilder::new(config(limit), fakes.collaborators())
                .build()
                .unwrap();
        let report = orchestrator.run(units.clone()).await.unwrap();

        assert_eq!(report.totals.succeeded, 30);
        assert!(fakes.max_running() <= limit);

        let steps = fakes.steps();
        for u in &units {
            let started = position(&steps, &Step::BuildStarted(u.id.clone()));
            for dep in &u.dependencies {
                assert!(
                    started > position(&steps, &Step::Published(dep.clone())),
                    "{} started before {} finished",
                    u.id,
                    dep
                );
            }
        }
    }
}

#[tokio::test]
async fn oversized_snapshot_pauses_for_operator() {
    let fakes = Gated::all_gated();
    let mut cfg = config(1);
    cfg.compaction.history_limit = 1;
    cfg.compaction.max_snapshot_bytes = 32;
    let (orchestrator, handle) = OrchestratorBuilder::new(cfg, fakes.collaborators())
        .build()
        .unwrap();
    let run = tokio::spawn(orchestrator.run(vec![unit("a", &[]), unit("b", &[])]));

    let summary = wait_for(&handle, |s| s.escalation.is_some()).await;
    assert_eq!(summary.control, ControlFlag::Paused);
    assert!(summary.escalation.unwrap().contains("32 byte limit"));

    fakes.open_all();
    wait_for(&handle, |s| s.statistics.completed == 1).await;
    // Still paused: b has not been dispatched.
    assert_eq!(handle.snapshot().statistics.dispatched, 1);

    handle.resume().await.unwrap();
    let report = run.await.unwrap().unwrap();
    assert_eq!(report.totals.succeeded, 2);
    assert!(handle.snapshot().escalation.is_none());
}

#[tokio::test]
async fn run_report_is_stored() {
    use suiteflow_core::report::{run_report_key, MemoryReportStore};

    let fakes = Gated::open();
    let store = Arc::new(MemoryReportStore::new());
    let (orchestrator, _handle) = OrchestratorBuilder::new(
        config(2),
        fakes.collaborators().with_report_store(store.clone()),
    )
    .run_id("r-store")
    .build()
    .unwrap();

    orchestrator.run(vec![unit("a", &[])]).await.unwrap();
    let bytes = store.get(&run_report_key("r-store")).unwrap();
    let stored: suiteflow_core::RunReport = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(stored.totals.succeeded, 1);
    assert!(store.get("runs/r-store/units/a.json").is_some());
}
