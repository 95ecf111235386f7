use std::time::Duration;

use crate::error::CollaboratorError;

/// Retry policy for collaborator calls that fail with an infrastructure error.
///
/// `attempt` is 1-based: it is the number of calls made so far.
pub trait RetryStrategyPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn next_delay(&self, attempt: u32, error: &CollaboratorError) -> Option<Duration>;
    fn max_attempts(&self) -> u32;
    fn should_retry(&self, attempt: u32, error: &CollaboratorError) -> bool {
        attempt < self.max_attempts() && !self.is_fatal_error(error)
    }
    fn is_fatal_error(&self, error: &CollaboratorError) -> bool {
        !error.is_transient()
    }
}

/// Sizes the initial concurrency limit at PLAN time.
pub trait ConcurrencyStrategyPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn calculate_concurrency(&self, context: &ConcurrencyContext) -> usize;
}

#[derive(Debug, Clone)]
pub struct ConcurrencyContext {
    pub cpu_usage: f32,
    pub available_cpus: usize,
    pub memory_usage: f32,
    /// `scheduler.max_parallel`.
    pub base_concurrency: usize,
    pub pending_units: usize,
    /// Most units that can be ready together. `None` when the unit set is
    /// open and more units may be merged later.
    pub widest_layer: Option<usize>,
}

/// Never retries. Used when no retry strategy is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryStrategyPlugin for NoRetry {
    fn name(&self) -> &str {
        "none"
    }

    fn next_delay(&self, _attempt: u32, _error: &CollaboratorError) -> Option<Duration> {
        None
    }

    fn max_attempts(&self) -> u32 {
        1
    }
}
