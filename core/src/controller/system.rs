use crate::executor::traits::ConcurrencyContext;

/// Sample CPU and memory load once, for sizing the initial concurrency limit
/// of a plan with `pending_units` units.
pub fn sample_concurrency_context(
    base_concurrency: usize,
    pending_units: usize,
    widest_layer: Option<usize>,
) -> ConcurrencyContext {
    let mut sys = sysinfo::System::new();
    sys.refresh_cpu();
    sys.refresh_memory();

    let cpu_count = match sys.cpus().len() {
        0 => num_cpus::get(),
        n => n,
    }
    .max(1);
    let cpu_usage = if sys.cpus().is_empty() {
        0.0
    } else {
        sys.cpus().iter().map(|c| c.cpu_usage()).sum::<f32>() / sys.cpus().len() as f32
    };
    let total_memory = sys.total_memory().max(1);
    let memory_usage = (sys.used_memory() as f32 / total_memory as f32) * 100.0;

    ConcurrencyContext {
        cpu_usage,
        available_cpus: cpu_count,
        memory_usage,
        base_concurrency,
        pending_units,
        widest_layer,
    }
}
