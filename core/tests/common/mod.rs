#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use suiteflow_core::config::AppConfig;
use suiteflow_core::executor::traits::{
    BuildOutput, BuildRunner, FixOutcome, FixerPlugin, PublishOutput, Publisher, QualityChecker,
    RemediationRequest, TestOutput, TestRunner,
};
use suiteflow_core::quality::{QualityCategory, QualityFailure, QualityReport};
use suiteflow_core::{CollaboratorError, Collaborators, ControlHandle, StateSummary, UnitSpec};

pub fn unit(id: &str, deps: &[&str]) -> UnitSpec {
    UnitSpec::new(id).with_dependencies(deps.iter().copied())
}

pub fn config(max_parallel: usize) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.scheduler.max_parallel = max_parallel;
    cfg
}

pub fn passing_report() -> QualityReport {
    QualityCategory::ALL
        .iter()
        .fold(QualityReport::new(), |r, c| r.with_category(*c, true))
}

pub fn lint_failing_report() -> QualityReport {
    passing_report()
        .with_category(QualityCategory::Tests, false)
        .with_failure(QualityFailure::new(QualityCategory::Lint, "unused import").at("src/main.rs", 3))
}

/// Route orchestrator logs through the test harness. `RUST_LOG` picks the
/// level; the default is `warn`.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Wait for a summary matching `pred`, failing the test after five seconds.
pub async fn wait_for<F>(handle: &ControlHandle, pred: F) -> StateSummary
where
    F: FnMut(&StateSummary) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), handle.wait_until(pred))
        .await
        .expect("timed out waiting for orchestrator state")
        .expect("orchestrator stopped publishing")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    BuildStarted(String),
    Published(String),
}

/// Fake collaborators whose builds block until the test releases them.
#[derive(Default)]
pub struct Gated {
    gate_all: AtomicBool,
    gated: Mutex<HashSet<String>>,
    gates: Mutex<Gates>,
    steps: Mutex<Vec<Step>>,
    running: AtomicUsize,
    max_running: AtomicUsize,
    build_calls: Mutex<HashMap<String, u32>>,
    infra_failures: Mutex<HashMap<String, u32>>,
    quality: Mutex<HashMap<String, Vec<QualityReport>>>,
    pub publish_calls: AtomicU32,
}

#[derive(Default)]
struct Gates {
    open: bool,
    by_unit: HashMap<String, Arc<Notify>>,
}

struct RunningGuard<'a>(&'a AtomicUsize);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Gated {
    /// Every build waits for `release`.
    pub fn all_gated() -> Arc<Self> {
        let fakes = Self::default();
        fakes.gate_all.store(true, Ordering::SeqCst);
        Arc::new(fakes)
    }

    /// Nothing waits.
    pub fn open() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn gate(&self, unit_id: &str) {
        self.gated.lock().unwrap().insert(unit_id.to_string());
    }

    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators::new(self.clone(), self.clone(), self.clone(), self.clone())
    }

    fn notify_for(gates: &mut Gates, unit_id: &str) -> Arc<Notify> {
        gates
            .by_unit
            .entry(unit_id.to_string())
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }

    /// Let one pending or future build of `unit_id` finish.
    pub fn release(&self, unit_id: &str) {
        let mut gates = self.gates.lock().unwrap();
        Self::notify_for(&mut gates, unit_id).notify_one();
    }

    /// Let every current and future build finish.
    pub fn open_all(&self) {
        let mut gates = self.gates.lock().unwrap();
        gates.open = true;
        for notify in gates.by_unit.values() {
            notify.notify_one();
        }
    }

    pub fn fail_build_with_infrastructure(&self, unit_id: &str, times: u32) {
        self.infra_failures
            .lock()
            .unwrap()
            .insert(unit_id.to_string(), times);
    }

    pub fn quality_sequence(&self, unit_id: &str, reports: Vec<QualityReport>) {
        self.quality
            .lock()
            .unwrap()
            .insert(unit_id.to_string(), reports);
    }

    pub fn steps(&self) -> Vec<Step> {
        self.steps.lock().unwrap().clone()
    }

    pub fn build_calls(&self, unit_id: &str) -> u32 {
        self.build_calls
            .lock()
            .unwrap()
            .get(unit_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_build_calls(&self) -> u32 {
        self.build_calls.lock().unwrap().values().sum()
    }

    pub fn max_running(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    /// Restart the high-water mark from the current number of running builds.
    pub fn reset_max_running(&self) {
        self.max_running
            .store(self.running.load(Ordering::SeqCst), Ordering::SeqCst);
    }

    fn is_gated(&self, unit_id: &str) -> bool {
        self.gate_all.load(Ordering::SeqCst) || self.gated.lock().unwrap().contains(unit_id)
    }
}

#[async_trait]
impl BuildRunner for Gated {
    async fn run(&self, unit: &UnitSpec) -> Result<BuildOutput, CollaboratorError> {
        *self
            .build_calls
            .lock()
            .unwrap()
            .entry(unit.id.clone())
            .or_insert(0) += 1;
        self.steps
            .lock()
            .unwrap()
            .push(Step::BuildStarted(unit.id.clone()));

        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);
        let _guard = RunningGuard(&self.running);

        if self.is_gated(&unit.id) {
            let notify = {
                let mut gates = self.gates.lock().unwrap();
                if gates.open {
                    None
                } else {
                    Some(Self::notify_for(&mut gates, &unit.id))
                }
            };
            if let Some(notify) = notify {
                notify.notified().await;
            }
        }

        {
            let mut failures = self.infra_failures.lock().unwrap();
            if let Some(left) = failures.get_mut(&unit.id) {
                if *left > 0 {
                    *left -= 1;
                    return Err(CollaboratorError::infrastructure("runner host unreachable"));
                }
            }
        }

        Ok(BuildOutput {
            success: true,
            duration_ms: 1,
            ..BuildOutput::default()
        })
    }
}

#[async_trait]
impl TestRunner for Gated {
    async fn run(&self, _unit: &UnitSpec) -> Result<TestOutput, CollaboratorError> {
        Ok(TestOutput {
            success: true,
            duration_ms: 1,
            coverage_pct: Some(88.0),
            ..TestOutput::default()
        })
    }
}

#[async_trait]
impl QualityChecker for Gated {
    async fn check(&self, unit: &UnitSpec) -> Result<QualityReport, CollaboratorError> {
        let mut quality = self.quality.lock().unwrap();
        match quality.get_mut(&unit.id) {
            Some(seq) if seq.len() > 1 => Ok(seq.remove(0)),
            Some(seq) if !seq.is_empty() => Ok(seq[0].clone()),
            _ => Ok(passing_report()),
        }
    }
}

#[async_trait]
impl Publisher for Gated {
    async fn publish(&self, unit: &UnitSpec, _version: &str) -> Result<PublishOutput, CollaboratorError> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        self.steps
            .lock()
            .unwrap()
            .push(Step::Published(unit.id.clone()));
        Ok(PublishOutput {
            success: true,
            duration_ms: 1,
            detail: None,
        })
    }
}

/// Fixer that reports success but changes nothing.
pub struct NoopFixer {
    categories: Vec<QualityCategory>,
    pub calls: AtomicU32,
}

impl NoopFixer {
    pub fn new(categories: &[QualityCategory]) -> Arc<Self> {
        Arc::new(Self {
            categories: categories.to_vec(),
            calls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl FixerPlugin for NoopFixer {
    fn name(&self) -> &str {
        "noop"
    }

    fn categories(&self) -> &[QualityCategory] {
        &self.categories
    }

    async fn fix(&self, _request: &RemediationRequest) -> Result<FixOutcome, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(FixOutcome {
            success: true,
            detail: None,
        })
    }
}
