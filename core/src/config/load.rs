use std::path::{Path, PathBuf};

use anyhow::Context;

use super::types::AppConfig;

/// Get the default suiteflow data directory: ~/.suiteflow
pub fn get_suiteflow_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".suiteflow"))
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let mut cfg = toml::from_str::<AppConfig>(&s)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    apply_env_overrides(&mut cfg)?;
    Ok(cfg)
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: $SUITEFLOW_CONFIG
    if let Ok(v) = std::env::var("SUITEFLOW_CONFIG") {
        if !v.trim().is_empty() {
            return load_from_path(Path::new(v.trim()));
        }
    }

    // Priority 2: ~/.suiteflow/config.toml
    let data_dir = get_suiteflow_data_dir()?;
    let user_config = data_dir.join("config.toml");

    // Priority 3: ./suiteflow.toml (current directory)
    let local_config = Path::new("suiteflow.toml");

    if user_config.exists() {
        return load_from_path(&user_config);
    }
    if local_config.exists() {
        return load_from_path(local_config);
    }

    let mut cfg = AppConfig::default();
    apply_env_overrides(&mut cfg)?;
    Ok(cfg)
}

/// Environment variable overrides (Priority 0: highest)
fn apply_env_overrides(cfg: &mut AppConfig) -> anyhow::Result<()> {
    if let Some(v) = env_value("SUITEFLOW_MAX_PARALLEL") {
        cfg.scheduler.max_parallel = v
            .parse()
            .with_context(|| format!("SUITEFLOW_MAX_PARALLEL is not an integer: {v}"))?;
    }
    if let Some(v) = env_value("SUITEFLOW_PASSING_THRESHOLD") {
        cfg.quality.passing_threshold = v
            .parse()
            .with_context(|| format!("SUITEFLOW_PASSING_THRESHOLD is not a number: {v}"))?;
    }
    if let Some(v) = env_value("SUITEFLOW_MAX_REMEDIATION_ATTEMPTS") {
        cfg.quality.max_remediation_attempts = v.parse().with_context(|| {
            format!("SUITEFLOW_MAX_REMEDIATION_ATTEMPTS is not an integer: {v}")
        })?;
    }
    Ok(())
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
