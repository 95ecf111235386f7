//! Compaction snapshots and their on-disk retention.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{ControlFlag, OrchestratorState, RunPhase, RunStatistics};
use crate::executor::types::{UnitSpec, UnitStatus};

pub const SNAPSHOT_VERSION: u32 = 1;

/// Stable identifier of a still-active unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveRef {
    pub unit_id: String,
    pub execution_id: String,
    pub dispatched_at: DateTime<Utc>,
    pub wait_ms: u64,
}

/// Minimal serialisable orchestrator state.
///
/// Holds ids and counters only. Unit output, reports and graph structure are
/// not part of it: the graph is re-derived from the declarative unit list and
/// finished reports live in the report store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactionSnapshot {
    pub version: u32,
    pub snapshot_id: String,
    pub run_id: String,
    pub generation: u64,
    pub taken_at: DateTime<Utc>,
    pub phase: RunPhase,
    pub control: ControlFlag,
    pub concurrency_limit: usize,
    pub pending_queue: Vec<String>,
    pub active: Vec<ActiveRef>,
    pub retry_counters: BTreeMap<String, u32>,
    pub statistics: RunStatistics,
    #[serde(default)]
    pub failed_units: Vec<String>,
    #[serde(default)]
    pub cancelled_units: Vec<String>,
    /// Units merged at runtime that are not part of the declarative input.
    #[serde(default)]
    pub merged_units: Vec<UnitSpec>,
    /// Finished merged units dropped from `merged_units`, oldest first.
    /// Later merges resolve dependencies on them from here.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retired_units: Vec<(String, UnitStatus)>,
}

impl CompactionSnapshot {
    pub fn capture(
        run_id: &str,
        generation: u64,
        phase: RunPhase,
        state: &OrchestratorState,
        failed_units: Vec<String>,
        cancelled_units: Vec<String>,
        merged_units: Vec<UnitSpec>,
    ) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            snapshot_id: uuid::Uuid::new_v4().to_string(),
            run_id: run_id.to_string(),
            generation,
            taken_at: Utc::now(),
            phase,
            control: state.control,
            concurrency_limit: state.concurrency_limit,
            pending_queue: state.pending_queue.clone(),
            active: state
                .active_set
                .iter()
                .map(|(unit_id, a)| ActiveRef {
                    unit_id: unit_id.clone(),
                    execution_id: a.execution_id.clone(),
                    dispatched_at: a.dispatched_at,
                    wait_ms: a.wait_ms,
                })
                .collect(),
            retry_counters: state.retry_counters.clone(),
            statistics: state.statistics.clone(),
            failed_units,
            cancelled_units,
            merged_units,
            retired_units: Vec::new(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).context("Failed to serialize snapshot")
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize snapshot")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).context("Failed to deserialize snapshot")?;
        if snapshot.version != SNAPSHOT_VERSION {
            anyhow::bail!(
                "Unsupported snapshot version {} (expected {})",
                snapshot.version,
                SNAPSHOT_VERSION
            );
        }
        Ok(snapshot)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = self.to_json()?;
        fs::write(path.as_ref(), json)
            .with_context(|| format!("Failed to write snapshot to {:?}", path.as_ref()))
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read snapshot from {:?}", path.as_ref()))?;
        Self::from_json(&json)
    }
}

/// Keeps the last `max_snapshots` compaction snapshots in a directory.
pub struct SnapshotManager {
    snapshot_dir: PathBuf,
    max_snapshots: usize,
}

impl SnapshotManager {
    pub fn new<P: Into<PathBuf>>(snapshot_dir: P, max_snapshots: usize) -> Result<Self> {
        let snapshot_dir = snapshot_dir.into();

        if !snapshot_dir.exists() {
            fs::create_dir_all(&snapshot_dir).with_context(|| {
                format!("Failed to create snapshot directory: {:?}", snapshot_dir)
            })?;
        }

        Ok(Self {
            snapshot_dir,
            max_snapshots: max_snapshots.max(1),
        })
    }

    pub fn snapshot_dir(&self) -> &Path {
        &self.snapshot_dir
    }

    pub fn save_snapshot(&self, snapshot: &CompactionSnapshot) -> Result<PathBuf> {
        let filename = format!(
            "snapshot_{}_{:06}.json",
            snapshot.run_id, snapshot.generation
        );
        let path = self.snapshot_dir.join(filename);

        snapshot.save_to_file(&path)?;
        self.cleanup_old_snapshots()?;

        Ok(path)
    }

    pub fn load_latest_snapshot(&self) -> Result<Option<CompactionSnapshot>> {
        let snapshots = self.list_snapshots()?;

        match snapshots.first() {
            Some(latest_path) => Ok(Some(CompactionSnapshot::load_from_file(latest_path)?)),
            None => Ok(None),
        }
    }

    /// Latest snapshot of one run.
    pub fn load_latest_for_run(&self, run_id: &str) -> Result<Option<CompactionSnapshot>> {
        let prefix = format!("snapshot_{run_id}_");
        for path in self.list_snapshots()? {
            let matches = path
                .file_name()
                .and_then(|s| s.to_str())
                .map(|name| name.starts_with(&prefix))
                .unwrap_or(false);
            if matches {
                return Ok(Some(CompactionSnapshot::load_from_file(path)?));
            }
        }
        Ok(None)
    }

    /// All snapshots, newest first (generation order within a run, then mtime).
    pub fn list_snapshots(&self) -> Result<Vec<PathBuf>> {
        let mut snapshots = Vec::new();

        for entry in fs::read_dir(&self.snapshot_dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("json") {
                if let Some(filename) = path.file_name().and_then(|s| s.to_str()) {
                    if filename.starts_with("snapshot_") {
                        snapshots.push(path);
                    }
                }
            }
        }

        snapshots.sort_by(|a, b| {
            let a_time = fs::metadata(a).and_then(|m| m.modified()).ok();
            let b_time = fs::metadata(b).and_then(|m| m.modified()).ok();
            b_time.cmp(&a_time).then_with(|| b.cmp(a))
        });

        Ok(snapshots)
    }

    fn cleanup_old_snapshots(&self) -> Result<()> {
        let snapshots = self.list_snapshots()?;

        for path in snapshots.iter().skip(self.max_snapshots) {
            fs::remove_file(path)
                .with_context(|| format!("Failed to remove old snapshot: {:?}", path))?;
        }

        Ok(())
    }

    pub fn clear_snapshots(&self) -> Result<usize> {
        let snapshots = self.list_snapshots()?;
        let count = snapshots.len();

        for path in snapshots {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove snapshot: {:?}", path))?;
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ActiveUnit;
    use tempfile::TempDir;

    fn sample(run_id: &str, generation: u64) -> CompactionSnapshot {
        sample_at(run_id, generation, Utc::now())
    }

    fn sample_at(run_id: &str, generation: u64, dispatched_at: DateTime<Utc>) -> CompactionSnapshot {
        let mut state = OrchestratorState::new(2);
        state.enqueue("b");
        state.enqueue("c");
        state.active_set.insert(
            "a".into(),
            ActiveUnit {
                execution_id: "exec-a".into(),
                dispatched_at,
                wait_ms: 12,
            },
        );
        state.bump_retry("c");
        CompactionSnapshot::capture(
            run_id,
            generation,
            RunPhase::Build,
            &state,
            vec![],
            vec![],
            vec![],
        )
    }

    #[test]
    fn capture_keeps_ids_only() {
        let dispatched_at = Utc::now();
        let snapshot = sample_at("run-1", 1, dispatched_at);
        assert_eq!(snapshot.pending_queue, vec!["b", "c"]);
        assert_eq!(
            snapshot.active,
            vec![ActiveRef {
                unit_id: "a".into(),
                execution_id: "exec-a".into(),
                dispatched_at,
                wait_ms: 12
            }]
        );
        assert_eq!(snapshot.retry_counters.get("c"), Some(&1));
    }

    #[test]
    fn test_snapshot_serialization() {
        let snapshot = sample("run-1", 1);
        let json = snapshot.to_json().unwrap();
        let restored = CompactionSnapshot::from_json(&json).unwrap();
        assert_eq!(snapshot, restored);
    }

    #[test]
    fn rejects_unknown_version() {
        let mut snapshot = sample("run-1", 1);
        snapshot.version = 99;
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(CompactionSnapshot::from_json(&json).is_err());
    }

    #[test]
    fn test_snapshot_manager() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SnapshotManager::new(temp_dir.path(), 5).unwrap();

        let snapshot = sample("run-1", 1);
        let path = manager.save_snapshot(&snapshot).unwrap();
        assert!(path.exists());

        let loaded = manager.load_latest_snapshot().unwrap().unwrap();
        assert_eq!(snapshot.snapshot_id, loaded.snapshot_id);

        assert!(manager.load_latest_for_run("run-2").unwrap().is_none());
        assert!(manager.load_latest_for_run("run-1").unwrap().is_some());
    }

    #[test]
    fn test_snapshot_cleanup() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SnapshotManager::new(temp_dir.path(), 3).unwrap();

        for generation in 0..5 {
            manager.save_snapshot(&sample("run-1", generation)).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(10));
        }

        let snapshots = manager.list_snapshots().unwrap();
        assert_eq!(snapshots.len(), 3);
        assert_eq!(manager.clear_snapshots().unwrap(), 3);
    }
}
