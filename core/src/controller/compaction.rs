use crate::config::CompactionConfig;
use crate::error::OrchestratorError;
use crate::state::CompactionSnapshot;

/// When to compact and how large a snapshot may get.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionPolicy {
    pub high_water_mark: u64,
    pub max_snapshot_bytes: usize,
}

impl CompactionPolicy {
    pub fn from_config(cfg: &CompactionConfig) -> Self {
        Self {
            high_water_mark: cfg.high_water_mark(),
            max_snapshot_bytes: cfg.max_snapshot_bytes,
        }
    }

    pub fn should_compact(&self, events_since_compaction: u64) -> bool {
        events_since_compaction >= self.high_water_mark
    }

    /// Serialise the snapshot, rejecting it when it exceeds the size limit.
    pub fn encode(&self, snapshot: &CompactionSnapshot) -> Result<Vec<u8>, OrchestratorError> {
        let bytes = snapshot
            .to_bytes()
            .map_err(|e| OrchestratorError::Snapshot(e.to_string()))?;
        if bytes.len() > self.max_snapshot_bytes {
            return Err(OrchestratorError::StateTooLarge {
                size: bytes.len(),
                limit: self.max_snapshot_bytes,
            });
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{OrchestratorState, RunPhase};

    fn snapshot() -> CompactionSnapshot {
        let mut state = OrchestratorState::new(2);
        state.enqueue("a");
        state.enqueue("b");
        CompactionSnapshot::capture("r1", 1, RunPhase::Build, &state, vec![], vec![], vec![])
    }

    #[test]
    fn high_water_mark_from_ratio() {
        let cfg = CompactionConfig {
            history_limit: 100,
            high_water_ratio: 0.75,
            ..CompactionConfig::default()
        };
        let policy = CompactionPolicy::from_config(&cfg);
        assert_eq!(policy.high_water_mark, 75);
        assert!(!policy.should_compact(74));
        assert!(policy.should_compact(75));
    }

    #[test]
    fn oversized_snapshot_is_rejected() {
        let policy = CompactionPolicy {
            high_water_mark: 1,
            max_snapshot_bytes: 16,
        };
        match policy.encode(&snapshot()) {
            Err(OrchestratorError::StateTooLarge { size, limit }) => {
                assert!(size > 16);
                assert_eq!(limit, 16);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn snapshot_within_limit_encodes() {
        let policy = CompactionPolicy {
            high_water_mark: 1,
            max_snapshot_bytes: 64 * 1024,
        };
        let bytes = policy.encode(&snapshot()).unwrap();
        let back: CompactionSnapshot = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back.pending_queue, vec!["a".to_string(), "b".to_string()]);
    }
}
