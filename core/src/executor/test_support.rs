//! In-crate fakes for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::remediation::FixerRegistry;
use super::traits::{
    BuildOutput, BuildRunner, FixOutcome, FixerPlugin, PublishOutput, Publisher, QualityChecker,
    RemediationRequest, TestOutput, TestRunner,
};
use super::types::UnitSpec;
use crate::context::Collaborators;
use crate::error::CollaboratorError;
use crate::quality::{QualityCategory, QualityFailure, QualityReport};

/// Scripted collaborators: everything passes unless told otherwise.
#[derive(Default)]
pub(crate) struct Scripted {
    pub build_fails: Mutex<HashMap<String, CollaboratorError>>,
    pub build_unsuccessful: Mutex<Vec<String>>,
    /// Quality reports served in order per unit; the last one repeats.
    pub quality: Mutex<HashMap<String, Vec<QualityReport>>>,
    pub publish_calls: AtomicU32,
    pub build_calls: AtomicU32,
}

impl Scripted {
    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators::new(self.clone(), self.clone(), self.clone(), self.clone())
    }

    pub fn failing_quality(&self, unit: &str, reports: Vec<QualityReport>) {
        self.quality
            .lock()
            .unwrap()
            .insert(unit.to_string(), reports);
    }
}

pub(crate) fn passing_report() -> QualityReport {
    QualityCategory::ALL
        .iter()
        .fold(QualityReport::new(), |r, c| r.with_category(*c, true))
}

pub(crate) fn lint_failing_report() -> QualityReport {
    passing_report()
        .with_category(QualityCategory::Tests, false)
        .with_failure(QualityFailure::new(QualityCategory::Lint, "unused variable").at("src/lib.rs", 4))
}

#[async_trait]
impl BuildRunner for Scripted {
    async fn run(&self, unit: &UnitSpec) -> Result<BuildOutput, CollaboratorError> {
        self.build_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.build_fails.lock().unwrap().get(&unit.id) {
            return Err(err.clone());
        }
        let success = !self.build_unsuccessful.lock().unwrap().contains(&unit.id);
        Ok(BuildOutput {
            success,
            duration_ms: 1,
            stdout: String::new(),
            stderr: if success { String::new() } else { "error: boom".into() },
        })
    }
}

#[async_trait]
impl TestRunner for Scripted {
    async fn run(&self, _unit: &UnitSpec) -> Result<TestOutput, CollaboratorError> {
        Ok(TestOutput {
            success: true,
            duration_ms: 1,
            coverage_pct: Some(91.5),
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

#[async_trait]
impl QualityChecker for Scripted {
    async fn check(&self, unit: &UnitSpec) -> Result<QualityReport, CollaboratorError> {
        let mut map = self.quality.lock().unwrap();
        match map.get_mut(&unit.id) {
            Some(queue) if queue.len() > 1 => Ok(queue.remove(0)),
            Some(queue) if !queue.is_empty() => Ok(queue[0].clone()),
            _ => Ok(passing_report()),
        }
    }
}

#[async_trait]
impl Publisher for Scripted {
    async fn publish(&self, _unit: &UnitSpec, _version: &str) -> Result<PublishOutput, CollaboratorError> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        Ok(PublishOutput {
            success: true,
            duration_ms: 1,
            detail: None,
        })
    }
}

pub(crate) struct CountingFixer {
    pub categories: Vec<QualityCategory>,
    pub calls: AtomicU32,
}

impl CountingFixer {
    pub fn new(categories: &[QualityCategory]) -> Arc<Self> {
        Arc::new(Self {
            categories: categories.to_vec(),
            calls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl FixerPlugin for CountingFixer {
    fn name(&self) -> &str {
        "counting-fixer"
    }

    fn categories(&self) -> &[QualityCategory] {
        &self.categories
    }

    async fn fix(&self, _request: &RemediationRequest) -> Result<FixOutcome, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(FixOutcome {
            success: true,
            detail: None,
        })
    }
}

pub(crate) fn registry_with(fixer: Arc<CountingFixer>) -> FixerRegistry {
    FixerRegistry::new().with(fixer)
}
