use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tracing::warn;

use super::traits::RetryStrategyPlugin;
use crate::error::CollaboratorError;

/// Cancellation token shared by every executor of a run.
///
/// Abort flips the watch value to `true`. If the sender goes away without
/// cancelling, [`cancelled`](Self::cancelled) never resolves.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    /// A signal that is never raised.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[derive(Debug)]
pub enum CallResult<T> {
    Ok { value: T, retries: u32 },
    Err { error: CollaboratorError, retries: u32 },
    Cancelled { retries: u32 },
}

/// Invoke a collaborator with a bounded timeout, retrying infrastructure
/// errors per `strategy`, and racing every await against `cancel`.
///
/// A timeout counts as [`CollaboratorError::Infrastructure`].
pub async fn call_with_retry<T, F, Fut>(
    label: &str,
    timeout: Duration,
    strategy: &dyn RetryStrategyPlugin,
    cancel: &mut CancelSignal,
    mut op: F,
) -> CallResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CollaboratorError>>,
{
    let max_attempts = strategy.max_attempts().max(1);
    let mut attempt: u32 = 1;

    loop {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return CallResult::Cancelled { retries: attempt - 1 },
            res = tokio::time::timeout(timeout, op()) => match res {
                Ok(r) => r,
                Err(_) => Err(CollaboratorError::Infrastructure(format!(
                    "{label} timed out after {}ms",
                    timeout.as_millis()
                ))),
            },
        };

        let error = match outcome {
            Ok(value) => {
                return CallResult::Ok {
                    value,
                    retries: attempt - 1,
                }
            }
            Err(error) => error,
        };

        if attempt >= max_attempts || !strategy.should_retry(attempt, &error) {
            return CallResult::Err {
                error,
                retries: attempt - 1,
            };
        }
        let Some(delay) = strategy.next_delay(attempt, &error) else {
            return CallResult::Err {
                error,
                retries: attempt - 1,
            };
        };

        warn!(
            call = label,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "collaborator call failed, retrying"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return CallResult::Cancelled { retries: attempt },
            _ = tokio::time::sleep(delay) => {}
        }
        attempt += 1;
    }
}
