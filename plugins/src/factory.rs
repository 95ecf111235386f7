use std::sync::Arc;

use anyhow::{bail, Result};

use suiteflow_core::config::AppConfig;
use suiteflow_core::executor::remediation::FixerRegistry;
use suiteflow_core::executor::traits::{
    ConcurrencyStrategyPlugin, EventRenderer, RetryStrategyPlugin,
};
use suiteflow_core::report::ReportStore;
use suiteflow_core::Collaborators;

use crate::collaborators::{
    CommandBuildRunner, CommandFixer, CommandPublisher, CommandQualityChecker, CommandTestRunner,
};
use crate::executor::{
    ExponentialBackoffPlugin, FixedConcurrency, JsonlRendererPlugin, LinearRetryPlugin,
    LoadAwareConcurrency, TextRendererPlugin,
};
use crate::store::FsReportStore;

/// Command collaborators, fixers and the report store from config.
pub fn build_collaborators(cfg: &AppConfig) -> Result<Collaborators> {
    let commands = &cfg.commands;
    if commands.build.trim().is_empty() {
        bail!("commands.build must not be empty");
    }
    if commands.test.trim().is_empty() {
        bail!("commands.test must not be empty");
    }
    if commands.publish.trim().is_empty() {
        bail!("commands.publish must not be empty");
    }

    Ok(Collaborators::new(
        Arc::new(CommandBuildRunner::new(commands.build.clone())),
        Arc::new(CommandTestRunner::new(commands.test.clone())),
        Arc::new(CommandQualityChecker::new(commands.quality.clone())),
        Arc::new(CommandPublisher::new(commands.publish.clone())),
    )
    .with_fixers(build_fixers(cfg)?)
    .with_report_store(build_report_store(cfg)))
}

pub fn build_fixers(cfg: &AppConfig) -> Result<FixerRegistry> {
    let mut registry = FixerRegistry::new();
    for fixer in &cfg.commands.fixers {
        if fixer.categories.is_empty() {
            bail!("fixer `{}` declares no categories", fixer.name);
        }
        registry.register(Arc::new(CommandFixer::from_config(fixer)));
    }
    Ok(registry)
}

pub fn build_report_store(cfg: &AppConfig) -> Arc<dyn ReportStore> {
    Arc::new(FsReportStore::new(cfg.report.directory.clone()))
}

pub fn build_retry(cfg: &AppConfig) -> Arc<dyn RetryStrategyPlugin> {
    match cfg.retry.strategy.as_str() {
        "linear" => Arc::new(LinearRetryPlugin::new(cfg.retry.clone())),
        // Anything else falls back to exponential backoff.
        _ => Arc::new(ExponentialBackoffPlugin::new(cfg.retry.clone())),
    }
}

pub fn build_concurrency(cfg: &AppConfig) -> Arc<dyn ConcurrencyStrategyPlugin> {
    match cfg.concurrency.strategy.as_str() {
        "adaptive" => Arc::new(LoadAwareConcurrency::new(cfg.concurrency.clone())),
        _ => Arc::new(FixedConcurrency::new(cfg.scheduler.max_parallel)),
    }
}

pub fn build_renderer(format: &str, ascii_only: bool, verbose: bool) -> Arc<dyn EventRenderer> {
    match format {
        "jsonl" => Arc::new(JsonlRendererPlugin::new(false)),
        _ => Arc::new(TextRendererPlugin::new(ascii_only).verbose(verbose)),
    }
}
