use std::path::Path;

use suiteflow_core::config::AppConfig;
use suiteflow_core::error::CliError;
use suiteflow_core::report::{format_text, RunReport, RunStatus};
use suiteflow_core::state::{CompactionSnapshot, SnapshotManager};
use suiteflow_core::OrchestratorBuilder;
use suiteflow_plugins::factory;
use tracing::info;

use crate::app::apply_run_overrides;
use crate::catalog::load_catalog;
use crate::commands::cli::RunArgs;
use crate::signals::spawn_ctrl_c_bridge;

/// Exit code for a finished run: 3 aborted, 2 failed or blocked units, else 0.
pub fn exit_code_for(report: &RunReport) -> i32 {
    match report.status {
        RunStatus::Aborted => 3,
        _ if report.has_failures() => 2,
        _ => 0,
    }
}

#[tracing::instrument(name = "cli.run", skip_all, fields(units = %args.units))]
pub async fn run_units(
    mut cfg: AppConfig,
    args: RunArgs,
    snapshot: Option<String>,
) -> Result<i32, CliError> {
    apply_run_overrides(&mut cfg, &args);
    let units = load_catalog(Path::new(&args.units))?;

    let snapshots = match cfg.compaction.snapshot_dir.as_deref().map(str::trim) {
        Some(dir) if !dir.is_empty() => {
            Some(SnapshotManager::new(dir, cfg.compaction.max_snapshots)?)
        }
        _ => None,
    };
    let resume_from = match snapshot.as_deref() {
        Some(which) => Some(load_snapshot(which, snapshots.as_ref())?),
        None => None,
    };

    let collaborators =
        factory::build_collaborators(&cfg).map_err(|e| CliError::Config(format!("{e:#}")))?;
    let text_output = cfg.report.format != "jsonl";
    let ascii_only = !atty::is(atty::Stream::Stdout);
    let show_progress = text_output && !args.no_progress && atty::is(atty::Stream::Stderr);

    let mut builder = OrchestratorBuilder::new(cfg.clone(), collaborators)
        .renderer(factory::build_renderer(
            &cfg.report.format,
            ascii_only,
            args.verbose,
        ))
        .retry_strategy(factory::build_retry(&cfg))
        .concurrency_strategy(factory::build_concurrency(&cfg))
        .progress(show_progress);
    if let Some(manager) = snapshots {
        builder = builder.snapshot_manager(manager);
    }
    if let Some(run_id) = &args.run_id {
        builder = builder.run_id(run_id.clone());
    }
    let (orchestrator, handle) = builder.build()?;
    info!(run_id = %orchestrator.run_id(), units = units.len(), "starting run");

    let bridge = spawn_ctrl_c_bridge(handle);
    let result = match resume_from {
        Some(snapshot) => orchestrator.resume(units, snapshot).await,
        None => orchestrator.run(units).await,
    };
    bridge.abort();
    let report = result?;

    if text_output {
        println!();
        print!("{}", format_text(&report));
    }
    Ok(exit_code_for(&report))
}

fn load_snapshot(
    which: &str,
    manager: Option<&SnapshotManager>,
) -> Result<CompactionSnapshot, CliError> {
    if which != "latest" {
        return Ok(CompactionSnapshot::load_from_file(which)?);
    }
    let manager = manager.ok_or_else(|| {
        CliError::Config("`--snapshot latest` needs compaction.snapshot_dir".to_string())
    })?;
    manager.load_latest_snapshot()?.ok_or_else(|| {
        CliError::Config(format!(
            "no snapshots in {}",
            manager.snapshot_dir().display()
        ))
    })
}
