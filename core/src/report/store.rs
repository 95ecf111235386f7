use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::CollaboratorError;

/// Durable report store. `write` returns a locator for the stored bytes.
#[async_trait]
pub trait ReportStore: Send + Sync {
    fn name(&self) -> &str;

    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<String, CollaboratorError>;

    /// Read back a stored object. Stores that cannot read return `Ok(None)`.
    async fn read(&self, _key: &str) -> Result<Option<Vec<u8>>, CollaboratorError> {
        Ok(None)
    }
}

pub fn unit_report_key(run_id: &str, unit_id: &str) -> String {
    format!("runs/{run_id}/units/{}.json", sanitize(unit_id))
}

pub fn run_report_key(run_id: &str) -> String {
    format!("runs/{run_id}/report.json")
}

fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect()
}

/// In-memory store, mainly for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryReportStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(key)
            .cloned()
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<String, CollaboratorError> {
        self.objects
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(key.to_string(), bytes);
        Ok(format!("memory://{key}"))
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, CollaboratorError> {
        Ok(self.get(key))
    }
}
