use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{mpsc, watch};
use tracing::{debug, error};
use uuid::Uuid;

use super::retry::CancelSignal;
use super::types::{FailedPhase, FailureKind, UnitFailure, UnitReport, UnitSpec, UnitStatus};
use super::unit::UnitExecutor;

/// A finished execution, addressed by its execution id.
#[derive(Debug, Clone)]
pub struct Completion {
    pub execution_id: String,
    pub report: UnitReport,
}

/// Owns running unit executions outside the control loop's state.
///
/// Each launch gets a stable execution id. An execution stays *live* until the
/// control loop acknowledges its completion, so a loop restarted from a
/// compaction snapshot can reconnect to every unit it had in flight, including
/// ones whose completion is still queued.
#[derive(Clone)]
pub struct ExecutionHost {
    executor: Arc<UnitExecutor>,
    live: Arc<Mutex<HashMap<String, String>>>,
    completion_tx: mpsc::Sender<Completion>,
    cancel_tx: Arc<watch::Sender<bool>>,
}

impl ExecutionHost {
    pub fn new(executor: Arc<UnitExecutor>, capacity: usize) -> (Self, mpsc::Receiver<Completion>) {
        let (completion_tx, completion_rx) = mpsc::channel(capacity.max(1));
        let (cancel_tx, _) = watch::channel(false);
        (
            Self {
                executor,
                live: Arc::new(Mutex::new(HashMap::new())),
                completion_tx,
                cancel_tx: Arc::new(cancel_tx),
            },
            completion_rx,
        )
    }

    fn live(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start a unit execution and return its execution id.
    pub fn launch(&self, unit: Arc<UnitSpec>, wait_ms: u64) -> String {
        let execution_id = Uuid::new_v4().to_string();
        self.live().insert(execution_id.clone(), unit.id.clone());

        let executor = self.executor.clone();
        let tx = self.completion_tx.clone();
        let cancel = CancelSignal::new(self.cancel_tx.subscribe());
        let id = execution_id.clone();

        tokio::spawn(async move {
            let unit_id = unit.id.clone();
            let task = {
                let id = id.clone();
                tokio::spawn(async move { executor.execute(unit, id, wait_ms, cancel).await })
            };
            let report = match task.await {
                Ok(report) => report,
                Err(e) => {
                    error!(unit = %unit_id, execution_id = %id, error = %e, "unit execution task failed");
                    let mut report = UnitReport::placeholder(&unit_id, UnitStatus::Failed)
                        .with_failure(UnitFailure::new(
                            FailedPhase::Dispatch,
                            FailureKind::Infrastructure,
                            format!("execution task failed: {e}"),
                        ));
                    report.execution_id = Some(id.clone());
                    report
                }
            };
            if tx
                .send(Completion {
                    execution_id: id.clone(),
                    report,
                })
                .await
                .is_err()
            {
                debug!(execution_id = %id, "completion receiver dropped");
            }
        });

        execution_id
    }

    pub fn is_live(&self, execution_id: &str) -> bool {
        self.live().contains_key(execution_id)
    }

    /// Forget an execution once its completion has been consumed.
    pub fn acknowledge(&self, execution_id: &str) -> Option<String> {
        self.live().remove(execution_id)
    }

    pub fn live_count(&self) -> usize {
        self.live().len()
    }

    /// Cancel every current and future execution of this host.
    pub fn cancel_all(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    pub fn executor(&self) -> &Arc<UnitExecutor> {
        &self.executor
    }
}
