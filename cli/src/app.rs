//! Assembly layer: config loading and command-line overrides.

use std::path::Path;

use suiteflow_core::config::{self, AppConfig};
use suiteflow_core::error::CliError;

use crate::commands::cli::RunArgs;

pub fn load_config(path: Option<&str>) -> Result<AppConfig, CliError> {
    let loaded = match path.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => config::load_from_path(Path::new(p)),
        None => config::load_default(),
    };
    loaded.map_err(|e| CliError::Config(format!("{e:#}")))
}

/// Flags win over the config file and environment.
pub fn apply_run_overrides(cfg: &mut AppConfig, args: &RunArgs) {
    if let Some(n) = args.max_parallel {
        cfg.scheduler.max_parallel = n;
    }
    if args.keep_alive {
        cfg.scheduler.keep_alive = true;
    }
    if let Some(format) = &args.format {
        cfg.report.format = format.clone();
    }
}
