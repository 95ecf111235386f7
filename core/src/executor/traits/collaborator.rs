//! Contracts for the external collaborators a unit executor drives.
//!
//! Implementations return `Err(CollaboratorError::Infrastructure)` for transient
//! problems (retried with backoff) and `Ok` with `success: false` or
//! `Err(CollaboratorError::Rejected)` when the unit itself is at fault.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;
use crate::executor::types::UnitSpec;
use crate::quality::{QualityCategory, QualityFailure, QualityReport};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildOutput {
    pub success: bool,
    pub duration_ms: u64,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestOutput {
    pub success: bool,
    pub duration_ms: u64,
    pub coverage_pct: Option<f64>,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishOutput {
    pub success: bool,
    pub duration_ms: u64,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixOutcome {
    pub success: bool,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationRequest {
    pub unit_id: String,
    pub location: PathBuf,
    pub failures: Vec<QualityFailure>,
    pub categories: Vec<QualityCategory>,
    pub reference_spec: Option<String>,
    pub attempt: u32,
}

#[async_trait]
pub trait BuildRunner: Send + Sync {
    async fn run(&self, unit: &UnitSpec) -> Result<BuildOutput, CollaboratorError>;
}

#[async_trait]
pub trait TestRunner: Send + Sync {
    async fn run(&self, unit: &UnitSpec) -> Result<TestOutput, CollaboratorError>;
}

#[async_trait]
pub trait QualityChecker: Send + Sync {
    async fn check(&self, unit: &UnitSpec) -> Result<QualityReport, CollaboratorError>;
}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(
        &self,
        unit: &UnitSpec,
        version: &str,
    ) -> Result<PublishOutput, CollaboratorError>;
}

/// Capability-tagged fixer. The registry picks the highest priority fixer
/// whose categories cover at least one failing category.
#[async_trait]
pub trait FixerPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn categories(&self) -> &[QualityCategory];
    fn priority(&self) -> i32 {
        0
    }
    async fn fix(&self, request: &RemediationRequest) -> Result<FixOutcome, CollaboratorError>;
}
