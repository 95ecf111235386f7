use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::executor::types::{ConcurrencyConfig, RetryConfig};
use crate::quality::QualityCategory;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub quality: QualityConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub concurrency: ConcurrencyConfig,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub compaction: CompactionConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub commands: CommandsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "suiteflow_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    false
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Initial concurrency limit. `AdjustConcurrency` overrides it at runtime.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// Continuous-queue mode: stay alive while idle until drained or aborted.
    #[serde(default)]
    pub keep_alive: bool,

    /// Scheduler-level re-dispatch budget per unit.
    #[serde(default = "default_max_requeues")]
    pub max_requeues: u32,

    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_max_parallel() -> usize {
    4
}

fn default_max_requeues() -> u32 {
    1
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            keep_alive: false,
            max_requeues: default_max_requeues(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    #[serde(default = "default_passing_threshold")]
    pub passing_threshold: f64,

    #[serde(default = "default_max_remediation_attempts")]
    pub max_remediation_attempts: u32,

    #[serde(default = "default_weights")]
    pub weights: BTreeMap<QualityCategory, f64>,

    #[serde(default)]
    pub tiers: TierConfig,
}

fn default_passing_threshold() -> f64 {
    85.0
}

fn default_max_remediation_attempts() -> u32 {
    3
}

pub fn default_weights() -> BTreeMap<QualityCategory, f64> {
    use QualityCategory::*;
    BTreeMap::from([
        (Structure, 10.0),
        (Types, 15.0),
        (Lint, 10.0),
        (Tests, 25.0),
        (Security, 15.0),
        (Docs, 10.0),
        (License, 5.0),
        (Integration, 10.0),
    ])
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            passing_threshold: default_passing_threshold(),
            max_remediation_attempts: default_max_remediation_attempts(),
            weights: default_weights(),
            tiers: TierConfig::default(),
        }
    }
}

/// Informational score bands. Only `passing_threshold` gates publication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierConfig {
    #[serde(default = "default_tier_excellent")]
    pub excellent: f64,
    #[serde(default = "default_tier_good")]
    pub good: f64,
}

fn default_tier_excellent() -> f64 {
    95.0
}

fn default_tier_good() -> f64 {
    90.0
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            excellent: default_tier_excellent(),
            good: default_tier_good(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_build_ms")]
    pub build_ms: u64,
    #[serde(default = "default_test_ms")]
    pub test_ms: u64,
    #[serde(default = "default_quality_ms")]
    pub quality_ms: u64,
    #[serde(default = "default_fix_ms")]
    pub fix_ms: u64,
    #[serde(default = "default_publish_ms")]
    pub publish_ms: u64,
}

fn default_build_ms() -> u64 {
    600_000
}

fn default_test_ms() -> u64 {
    900_000
}

fn default_quality_ms() -> u64 {
    300_000
}

fn default_fix_ms() -> u64 {
    1_800_000
}

fn default_publish_ms() -> u64 {
    120_000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            build_ms: default_build_ms(),
            test_ms: default_test_ms(),
            quality_ms: default_quality_ms(),
            fix_ms: default_fix_ms(),
            publish_ms: default_publish_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactionConfig {
    /// Event history the hosting runtime tolerates before compaction is forced.
    #[serde(default = "default_history_limit")]
    pub history_limit: u64,

    #[serde(default = "default_high_water_ratio")]
    pub high_water_ratio: f64,

    #[serde(default = "default_max_snapshot_bytes")]
    pub max_snapshot_bytes: usize,

    /// When set, every compaction snapshot is persisted here for `resume`.
    #[serde(default)]
    pub snapshot_dir: Option<String>,

    #[serde(default = "default_max_snapshots")]
    pub max_snapshots: usize,
}

fn default_history_limit() -> u64 {
    10_000
}

fn default_high_water_ratio() -> f64 {
    0.75
}

fn default_max_snapshot_bytes() -> usize {
    256 * 1024
}

fn default_max_snapshots() -> usize {
    5
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            high_water_ratio: default_high_water_ratio(),
            max_snapshot_bytes: default_max_snapshot_bytes(),
            snapshot_dir: None,
            max_snapshots: default_max_snapshots(),
        }
    }
}

impl CompactionConfig {
    pub fn high_water_mark(&self) -> u64 {
        let ratio = self.high_water_ratio.clamp(0.0, 1.0);
        ((self.history_limit as f64) * ratio).floor().max(1.0) as u64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_report_directory")]
    pub directory: String,

    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Console renderer: "text" or "jsonl".
    #[serde(default = "default_report_format")]
    pub format: String,
}

fn default_report_directory() -> String {
    "./suiteflow-reports".to_string()
}

fn default_top_n() -> usize {
    5
}

fn default_report_format() -> String {
    "text".to_string()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            directory: default_report_directory(),
            top_n: default_top_n(),
            format: default_report_format(),
        }
    }
}

/// Shell templates for the command collaborators. `{unit}`, `{path}` and
/// `{version}` are substituted before execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    #[serde(default = "default_build_command")]
    pub build: String,

    #[serde(default = "default_test_command")]
    pub test: String,

    #[serde(default)]
    pub quality: BTreeMap<QualityCategory, String>,

    #[serde(default = "default_publish_command")]
    pub publish: String,

    #[serde(default)]
    pub fixers: Vec<FixerConfig>,
}

fn default_build_command() -> String {
    "cargo build --manifest-path {path}/Cargo.toml".to_string()
}

fn default_test_command() -> String {
    "cargo test --manifest-path {path}/Cargo.toml".to_string()
}

fn default_publish_command() -> String {
    "cargo publish --dry-run --manifest-path {path}/Cargo.toml".to_string()
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            build: default_build_command(),
            test: default_test_command(),
            quality: BTreeMap::new(),
            publish: default_publish_command(),
            fixers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixerConfig {
    pub name: String,
    #[serde(default)]
    pub categories: Vec<QualityCategory>,
    #[serde(default)]
    pub priority: i32,
    pub command: String,
}
