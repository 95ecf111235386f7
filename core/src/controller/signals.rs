use tokio::sync::{mpsc, watch};

use crate::error::OrchestratorError;
use crate::executor::types::UnitSpec;
use crate::state::StateSummary;

/// Operator or system message, processed serially by the control loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlSignal {
    /// Stop dispatching; in-flight units keep running.
    Pause,
    /// Continue dispatching after a pause, a drain or an escalation.
    Resume,
    /// Stop dispatching and finish once in-flight units complete.
    Drain,
    /// Cancel in-flight units and finish.
    Abort,
    /// New concurrency limit, applied on the next dispatch.
    AdjustConcurrency(usize),
    /// Add previously unknown units to the running graph.
    MergeUnits(Vec<UnitSpec>),
}

impl ControlSignal {
    pub fn name(&self) -> &'static str {
        match self {
            ControlSignal::Pause => "pause",
            ControlSignal::Resume => "resume",
            ControlSignal::Drain => "drain",
            ControlSignal::Abort => "abort",
            ControlSignal::AdjustConcurrency(_) => "adjust_concurrency",
            ControlSignal::MergeUnits(_) => "merge_units",
        }
    }
}

/// Cloneable handle for driving a running orchestrator from outside.
#[derive(Clone)]
pub struct ControlHandle {
    tx: mpsc::Sender<ControlSignal>,
    summary: watch::Receiver<StateSummary>,
}

impl ControlHandle {
    pub(crate) fn new(tx: mpsc::Sender<ControlSignal>, summary: watch::Receiver<StateSummary>) -> Self {
        Self { tx, summary }
    }

    pub async fn send(&self, signal: ControlSignal) -> Result<(), OrchestratorError> {
        self.tx
            .send(signal)
            .await
            .map_err(|_| OrchestratorError::ChannelClosed)
    }

    pub async fn pause(&self) -> Result<(), OrchestratorError> {
        self.send(ControlSignal::Pause).await
    }

    pub async fn resume(&self) -> Result<(), OrchestratorError> {
        self.send(ControlSignal::Resume).await
    }

    pub async fn drain(&self) -> Result<(), OrchestratorError> {
        self.send(ControlSignal::Drain).await
    }

    pub async fn abort(&self) -> Result<(), OrchestratorError> {
        self.send(ControlSignal::Abort).await
    }

    pub async fn adjust_concurrency(&self, limit: usize) -> Result<(), OrchestratorError> {
        self.send(ControlSignal::AdjustConcurrency(limit)).await
    }

    pub async fn merge_units(&self, units: Vec<UnitSpec>) -> Result<(), OrchestratorError> {
        self.send(ControlSignal::MergeUnits(units)).await
    }

    /// Latest summary published by the control loop.
    pub fn snapshot(&self) -> StateSummary {
        self.summary.borrow().clone()
    }

    /// Wait until the published summary satisfies `pred`.
    pub async fn wait_until<F>(&self, mut pred: F) -> Result<StateSummary, OrchestratorError>
    where
        F: FnMut(&StateSummary) -> bool,
    {
        let mut rx = self.summary.clone();
        let summary = rx
            .wait_for(|s| pred(s))
            .await
            .map_err(|_| OrchestratorError::ChannelClosed)?;
        Ok(summary.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closed_channel_is_reported() {
        let (tx, rx) = mpsc::channel(1);
        let (_summary_tx, summary_rx) = watch::channel(StateSummary::default());
        let handle = ControlHandle::new(tx, summary_rx);
        drop(rx);
        assert!(matches!(handle.pause().await, Err(OrchestratorError::ChannelClosed)));
    }

    #[tokio::test]
    async fn wait_until_sees_published_summary() {
        let (tx, _rx) = mpsc::channel(1);
        let (summary_tx, summary_rx) = watch::channel(StateSummary::default());
        let handle = ControlHandle::new(tx, summary_rx);

        let waiter = tokio::spawn({
            let handle = handle.clone();
            async move { handle.wait_until(|s| s.generation == 2).await }
        });
        summary_tx.send_replace(StateSummary {
            generation: 2,
            ..StateSummary::default()
        });

        let summary = waiter.await.unwrap().unwrap();
        assert_eq!(summary.generation, 2);
        assert_eq!(handle.snapshot().generation, 2);
    }

    #[test]
    fn signal_names() {
        assert_eq!(ControlSignal::AdjustConcurrency(3).name(), "adjust_concurrency");
        assert_eq!(ControlSignal::MergeUnits(vec![]).name(), "merge_units");
    }
}
