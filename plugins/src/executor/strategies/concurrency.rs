use suiteflow_core::executor::traits::{ConcurrencyContext, ConcurrencyStrategyPlugin};
use suiteflow_core::executor::types::ConcurrencyConfig;

/// Memory use, in percent, above which the host counts as busy.
const MEMORY_PRESSURE_PCT: f32 = 90.0;

/// Sizes the slot count from host load and the shape of the plan.
///
/// Starts from `max_parallel`: halved on a busy host, doubled on an idle one.
/// The result stays within the configured bounds and the CPU count, and a
/// closed plan never gets more slots than units that can be ready together.
pub struct LoadAwareConcurrency {
    config: ConcurrencyConfig,
}

/// Always `max_parallel`.
pub struct FixedConcurrency {
    slots: usize,
}

impl LoadAwareConcurrency {
    pub fn new(config: ConcurrencyConfig) -> Self {
        Self { config }
    }

    fn host_busy(&self, ctx: &ConcurrencyContext) -> bool {
        ctx.cpu_usage >= self.config.cpu_threshold_high || ctx.memory_usage >= MEMORY_PRESSURE_PCT
    }

    fn host_idle(&self, ctx: &ConcurrencyContext) -> bool {
        ctx.cpu_usage <= self.config.cpu_threshold_low && ctx.memory_usage < MEMORY_PRESSURE_PCT
    }
}

impl FixedConcurrency {
    pub fn new(slots: usize) -> Self {
        Self { slots }
    }
}

impl ConcurrencyStrategyPlugin for LoadAwareConcurrency {
    fn name(&self) -> &str {
        "adaptive"
    }

    fn calculate_concurrency(&self, ctx: &ConcurrencyContext) -> usize {
        let floor = self.config.min_concurrency.max(1);
        let ceiling = self
            .config
            .max_concurrency
            .max(floor)
            .min(ctx.available_cpus.max(1));

        let scaled = if self.host_busy(ctx) {
            ctx.base_concurrency / 2
        } else if self.host_idle(ctx) {
            ctx.base_concurrency.saturating_mul(2)
        } else {
            ctx.base_concurrency
        };
        let slots = scaled.max(floor).min(ceiling);

        // Slots beyond the widest layer would never fill.
        match ctx.widest_layer {
            Some(width) => slots.min(width.min(ctx.pending_units).max(1)),
            None => slots,
        }
    }
}

impl ConcurrencyStrategyPlugin for FixedConcurrency {
    fn name(&self) -> &str {
        "fixed"
    }

    fn calculate_concurrency(&self, _ctx: &ConcurrencyContext) -> usize {
        self.slots.max(1)
    }
}
